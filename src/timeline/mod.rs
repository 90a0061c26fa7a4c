pub mod clip;
pub mod overlays;
pub mod segments;
