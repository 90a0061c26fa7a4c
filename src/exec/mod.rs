pub mod ffmpeg;
pub mod probe;
