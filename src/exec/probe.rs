use std::path::Path;
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};

use crate::foundation::error::{ComposeError, ComposeResult};

/// Metadata probed from a media file.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MediaInfo {
    /// Container duration, seconds.
    pub duration_secs: f64,
    /// Dimensions of the first video stream, when one exists.
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

/// Probe `path` with `ffprobe` and return its duration and dimensions.
pub fn probe_media(path: &Path) -> ComposeResult<MediaInfo> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| {
            ComposeError::execution(format!(
                "failed to spawn ffprobe (is it installed and on PATH?): {e}"
            ))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ComposeError::execution(format!(
            "ffprobe exited with status {} for '{}': {}",
            output.status,
            path.display(),
            stderr.trim()
        )));
    }

    let parsed: ProbeOutput = serde_json::from_slice(&output.stdout)
        .map_err(|e| ComposeError::serde(format!("unreadable ffprobe output: {e}")))?;

    let duration_secs = parsed
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| {
            ComposeError::execution(format!(
                "'{}' has no parseable container duration",
                path.display()
            ))
        })?;
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return Err(ComposeError::execution(format!(
            "'{}' reports a non-positive duration ({duration_secs})",
            path.display()
        )));
    }

    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));

    Ok(MediaInfo {
        duration_secs,
        width: video.and_then(|s| s.width),
        height: video.and_then(|s| s.height),
    })
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_engine_available() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
