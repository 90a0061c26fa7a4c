use std::path::PathBuf;

use crate::foundation::error::{ComposeError, ComposeResult};
use crate::timeline::segments::TransitionStyle;

/// Immutable configuration for one [`Composer`](crate::compose::Composer).
///
/// Every knob is explicit; nothing is read from the environment. Defaults
/// are the canonical short-form social settings: 1280x720 output, a 400x300
/// picture-in-picture inset, 3.5 s full-frame cutaway cap, and 50 % audio
/// ducking while a cutaway is visible.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// Brand name used to synthesize a default header ("{brand} Video").
    pub brand_name: String,
    /// Output frame width in pixels. Must be even (yuv420p output).
    pub width: u32,
    /// Output frame height in pixels. Must be even.
    pub height: u32,
    /// Picture-in-picture inset width in pixels.
    pub pip_width: u32,
    /// Picture-in-picture inset height in pixels.
    pub pip_height: u32,
    /// Padding between the inset and the frame edge, pixels.
    pub pip_padding: u32,
    /// Maximum duration of a full-frame cutaway; longer clips are trimmed
    /// from the end, anchored at their start.
    pub max_fullframe_secs: f64,
    /// Main-audio gain multiplier while a cutaway is visible.
    pub ducking_gain: f64,
    /// The header overlay is visible for `[0, header_visible_secs)`.
    pub header_visible_secs: f64,
    /// Optional font file for the header drawtext node.
    pub header_font: Option<PathBuf>,
    /// Join segments with cross-fade transitions instead of compositing
    /// cutaways as time-windowed overlays.
    pub transitions: bool,
    /// Cross-fade duration per segment boundary, seconds.
    pub transition_secs: f64,
    /// Cyclic transition style pattern, indexed by segment emission order.
    pub transition_styles: Vec<TransitionStyle>,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            brand_name: "Reelweave".to_string(),
            width: 1280,
            height: 720,
            pip_width: 400,
            pip_height: 300,
            pip_padding: 10,
            max_fullframe_secs: 3.5,
            ducking_gain: 0.5,
            header_visible_secs: 7.0,
            header_font: None,
            transitions: false,
            transition_secs: 0.5,
            transition_styles: vec![
                TransitionStyle::SlideRight,
                TransitionStyle::Fade,
                TransitionStyle::Dissolve,
                TransitionStyle::CircleOpen,
                TransitionStyle::SlideRight,
                TransitionStyle::ZoomIn,
            ],
        }
    }
}

impl ComposerConfig {
    pub fn validate(&self) -> ComposeResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ComposeError::validation("output width/height must be > 0"));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            return Err(ComposeError::validation(
                "output width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        if self.pip_width + 2 * self.pip_padding > self.width
            || self.pip_height + 2 * self.pip_padding > self.height
        {
            return Err(ComposeError::validation(format!(
                "pip inset {}x{} with {} px padding does not fit inside {}x{}",
                self.pip_width, self.pip_height, self.pip_padding, self.width, self.height
            )));
        }
        if !(0.0..=1.0).contains(&self.ducking_gain) {
            return Err(ComposeError::validation(format!(
                "ducking_gain must be in [0, 1], got {}",
                self.ducking_gain
            )));
        }
        if self.max_fullframe_secs <= 0.0 || !self.max_fullframe_secs.is_finite() {
            return Err(ComposeError::validation(
                "max_fullframe_secs must be > 0 and finite",
            ));
        }
        if self.transition_secs <= 0.0 || !self.transition_secs.is_finite() {
            return Err(ComposeError::validation(
                "transition_secs must be > 0 and finite",
            ));
        }
        if self.header_visible_secs < 0.0 || !self.header_visible_secs.is_finite() {
            return Err(ComposeError::validation(
                "header_visible_secs must be >= 0 and finite",
            ));
        }
        if self.transition_styles.is_empty() {
            return Err(ComposeError::validation(
                "transition_styles must name at least one style",
            ));
        }
        Ok(())
    }
}
