use std::path::PathBuf;

use crate::foundation::error::ComposeResult;
use crate::foundation::time::Interval;

/// Where a b-roll clip lands on screen.
///
/// Closed enum on purpose: the compiler matches exhaustively, so adding a
/// placement mode is a compile-time-checked extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// Small inset over the main video, anchored bottom-right.
    Pip,
    /// Replaces the main visual content for its window.
    FullFrame,
}

impl std::fmt::Display for Placement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Placement::Pip => f.write_str("pip"),
            Placement::FullFrame => f.write_str("fullframe"),
        }
    }
}

/// One externally supplied b-roll clip, as it appears in a plan file.
///
/// Field names match the upstream plan format verbatim.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct BrollClip {
    /// Absolute or plan-relative path to the downloaded clip file.
    pub path: PathBuf,
    /// Timeline position at which the clip becomes visible, seconds.
    pub start_sec: f64,
    /// Timeline position at which the clip disappears, seconds.
    pub end_sec: f64,
    pub placement: Placement,
    #[serde(default = "default_fade")]
    pub fade_in_sec: f64,
    #[serde(default = "default_fade")]
    pub fade_out_sec: f64,
}

fn default_fade() -> f64 {
    0.3
}

impl BrollClip {
    /// The clip's timeline window as a validated [`Interval`].
    pub fn interval(&self) -> ComposeResult<Interval> {
        Interval::new(self.start_sec, self.end_sec)
    }
}

/// A b-roll plan file: the JSON artifact the footage-sourcing stage emits.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct BrollPlan {
    #[serde(default)]
    pub clips: Vec<BrollClip>,
}
