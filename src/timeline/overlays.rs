use std::path::{Path, PathBuf};

use crate::config::ComposerConfig;
use crate::foundation::error::ComposeResult;
use crate::foundation::time::Interval;
use crate::timeline::clip::{BrollClip, Placement};

/// One timeline-anchored overlay, resolved from request configuration.
#[derive(Clone, Debug)]
pub enum Overlay {
    /// Header text shown for a leading window of the timeline.
    HeaderText { text: String, visible: Interval },
    /// ASS captions burned over the whole timeline.
    BurnedCaptions { path: PathBuf },
    /// One b-roll cutaway with its capped effective window.
    Broll { clip: BrollClip, effective: Interval },
}

/// Main-audio gain reduction while a cutaway is visible.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DuckingInterval {
    pub start: f64,
    pub end: f64,
    pub gain: f64,
}

impl DuckingInterval {
    pub fn contains(self, t: f64) -> bool {
        self.start <= t && t < self.end
    }
}

/// Effective main-audio gain at time `t`: the product of every interval's
/// conditional gain.
///
/// Exact for non-overlapping intervals; overlapping intervals multiply
/// toward `gain^k`, which is the declared degradation, not a guarantee.
pub fn gain_at(t: f64, intervals: &[DuckingInterval]) -> f64 {
    intervals
        .iter()
        .map(|iv| if iv.contains(t) { iv.gain } else { 1.0 })
        .product()
}

/// Translate request configuration into timeline-anchored overlays.
///
/// Independent of segment structure: the header window and caption span are
/// absolute, and each clip's effective window depends only on its own
/// interval and the full-frame cap.
pub fn resolve_overlays(
    cfg: &ComposerConfig,
    duration: f64,
    header_text: Option<&str>,
    captions: Option<&Path>,
    clips: &[BrollClip],
) -> ComposeResult<Vec<Overlay>> {
    let mut overlays = Vec::with_capacity(clips.len() + 2);

    if let Some(text) = header_text {
        let text = text.trim();
        if !text.is_empty() && cfg.header_visible_secs > 0.0 {
            let visible = Interval::new(0.0, cfg.header_visible_secs.min(duration))?;
            overlays.push(Overlay::HeaderText {
                text: text.to_string(),
                visible,
            });
        }
    }

    for clip in clips {
        let interval = clip.interval()?;
        let effective = match clip.placement {
            Placement::Pip => interval,
            Placement::FullFrame => Interval::new(
                interval.start,
                interval
                    .end
                    .min(interval.start + cfg.max_fullframe_secs),
            )?,
        };
        overlays.push(Overlay::Broll {
            clip: clip.clone(),
            effective,
        });
    }

    if let Some(path) = captions {
        overlays.push(Overlay::BurnedCaptions {
            path: path.to_path_buf(),
        });
    }

    Ok(overlays)
}

/// Derive one ducking interval per cutaway effective window.
pub fn ducking_intervals(overlays: &[Overlay], gain: f64) -> Vec<DuckingInterval> {
    overlays
        .iter()
        .filter_map(|ov| match ov {
            Overlay::Broll { effective, .. } => Some(DuckingInterval {
                start: effective.start,
                end: effective.end,
                gain,
            }),
            Overlay::HeaderText { .. } | Overlay::BurnedCaptions { .. } => None,
        })
        .collect()
}

/// Collect every input problem with a composition request.
///
/// Returns the full list instead of failing on the first finding, so a
/// caller is told about everything wrong before any engine process runs.
/// `require_gaps` tightens the overlap rule to also reject back-to-back
/// clips, which transition assembly cannot join.
pub fn collect_validation_errors(
    main_video: &Path,
    captions: Option<&Path>,
    clips: &[BrollClip],
    duration: f64,
    require_gaps: bool,
) -> Vec<String> {
    let mut errors = Vec::new();

    match std::fs::metadata(main_video) {
        Err(_) => errors.push(format!("main video not found: {}", main_video.display())),
        Ok(meta) if meta.len() == 0 => {
            errors.push(format!("main video is empty: {}", main_video.display()))
        }
        Ok(_) => {}
    }

    if let Some(path) = captions {
        match std::fs::metadata(path) {
            Err(_) => errors.push(format!("captions file not found: {}", path.display())),
            Ok(meta) if meta.len() == 0 => {
                errors.push(format!("captions file is empty: {}", path.display()))
            }
            Ok(_) => {}
        }
        let is_ass = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("ass"));
        if !is_ass {
            errors.push(format!(
                "captions must be an .ass file, got: {}",
                path.display()
            ));
        }
    }

    let mut prev_end: Option<f64> = None;
    for (i, clip) in clips.iter().enumerate() {
        match std::fs::metadata(&clip.path) {
            Err(_) => errors.push(format!(
                "b-roll clip {i} not found: {}",
                clip.path.display()
            )),
            Ok(meta) if meta.len() == 0 => errors.push(format!(
                "b-roll clip {i} is empty: {}",
                clip.path.display()
            )),
            Ok(_) => {}
        }

        let interval = match clip.interval() {
            Ok(iv) => iv,
            Err(e) => {
                errors.push(format!("b-roll clip {i}: {e}"));
                continue;
            }
        };
        if interval.end > duration {
            errors.push(format!(
                "b-roll clip {i} window ({}, {}) extends past the main timeline end {duration}",
                interval.start, interval.end
            ));
        }
        if let Some(prev) = prev_end {
            let collides = if require_gaps {
                interval.start <= prev
            } else {
                interval.start < prev
            };
            if collides {
                errors.push(format!(
                    "b-roll clip {i} window ({}, {}) overlaps the previous clip ending at {prev}",
                    interval.start, interval.end
                ));
            }
        }
        prev_end = Some(prev_end.unwrap_or(f64::MIN).max(interval.end));
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(start: f64, end: f64, placement: Placement) -> BrollClip {
        BrollClip {
            path: PathBuf::from("/nonexistent/clip.mp4"),
            start_sec: start,
            end_sec: end,
            placement,
            fade_in_sec: 0.5,
            fade_out_sec: 0.5,
        }
    }

    fn cfg() -> ComposerConfig {
        ComposerConfig::default()
    }

    #[test]
    fn fullframe_effective_window_is_capped() {
        let clips = [clip(5.0, 20.0, Placement::FullFrame)];
        let overlays = resolve_overlays(&cfg(), 30.0, None, None, &clips).unwrap();
        let Overlay::Broll { effective, .. } = &overlays[0] else {
            panic!("expected a broll overlay");
        };
        assert_eq!(*effective, Interval::new(5.0, 8.5).unwrap());
    }

    #[test]
    fn pip_effective_window_is_unchanged() {
        let clips = [clip(5.0, 20.0, Placement::Pip)];
        let overlays = resolve_overlays(&cfg(), 30.0, None, None, &clips).unwrap();
        let Overlay::Broll { effective, .. } = &overlays[0] else {
            panic!("expected a broll overlay");
        };
        assert_eq!(*effective, Interval::new(5.0, 20.0).unwrap());
    }

    #[test]
    fn header_window_is_clamped_to_short_videos() {
        let overlays = resolve_overlays(&cfg(), 4.0, Some("Hello"), None, &[]).unwrap();
        let Overlay::HeaderText { visible, .. } = &overlays[0] else {
            panic!("expected a header overlay");
        };
        assert_eq!(*visible, Interval::new(0.0, 4.0).unwrap());
    }

    #[test]
    fn blank_header_text_is_dropped() {
        let overlays = resolve_overlays(&cfg(), 30.0, Some("   "), None, &[]).unwrap();
        assert!(overlays.is_empty());
    }

    #[test]
    fn captions_come_last_in_resolution_order() {
        let clips = [clip(5.0, 8.0, Placement::Pip)];
        let overlays = resolve_overlays(
            &cfg(),
            30.0,
            Some("Title"),
            Some(Path::new("styled.ass")),
            &clips,
        )
        .unwrap();
        assert!(matches!(overlays[0], Overlay::HeaderText { .. }));
        assert!(matches!(overlays[1], Overlay::Broll { .. }));
        assert!(matches!(overlays[2], Overlay::BurnedCaptions { .. }));
    }

    #[test]
    fn ducking_derives_one_interval_per_cutaway() {
        let clips = [
            clip(5.0, 10.0, Placement::Pip),
            clip(20.0, 25.0, Placement::Pip),
        ];
        let overlays = resolve_overlays(&cfg(), 30.0, Some("T"), None, &clips).unwrap();
        let ducks = ducking_intervals(&overlays, 0.5);
        assert_eq!(ducks.len(), 2);
        assert_eq!(ducks[0].start, 5.0);
        assert_eq!(ducks[1].end, 25.0);
        assert_eq!(ducks[0].gain, 0.5);
    }

    #[test]
    fn gain_is_ducked_inside_and_unity_outside() {
        let ducks = vec![
            DuckingInterval { start: 5.0, end: 10.0, gain: 0.5 },
            DuckingInterval { start: 20.0, end: 25.0, gain: 0.5 },
        ];
        assert_eq!(gain_at(7.0, &ducks), 0.5);
        assert_eq!(gain_at(22.0, &ducks), 0.5);
        assert_eq!(gain_at(15.0, &ducks), 1.0);
        assert_eq!(gain_at(4.999, &ducks), 1.0);
    }

    #[test]
    fn overlapping_ducking_intervals_multiply() {
        let ducks = vec![
            DuckingInterval { start: 5.0, end: 12.0, gain: 0.5 },
            DuckingInterval { start: 10.0, end: 15.0, gain: 0.5 },
        ];
        assert_eq!(gain_at(11.0, &ducks), 0.25);
    }

    #[test]
    fn validation_collects_every_problem_at_once() {
        let clips = [
            clip(8.0, 15.0, Placement::Pip),
            clip(10.0, 18.0, Placement::Pip),
            clip(28.0, 40.0, Placement::Pip),
        ];
        let errors = collect_validation_errors(
            Path::new("/nonexistent/main.mp4"),
            Some(Path::new("/nonexistent/captions.srt")),
            &clips,
            30.0,
            false,
        );
        assert!(errors.iter().any(|e| e.contains("main video not found")));
        assert!(errors.iter().any(|e| e.contains("captions file not found")));
        assert!(errors.iter().any(|e| e.contains("must be an .ass file")));
        assert!(errors.iter().any(|e| e.contains("overlaps the previous clip")));
        assert!(errors.iter().any(|e| e.contains("past the main timeline end")));
        assert!(errors.len() >= 7, "every clip file missing too: {errors:?}");
    }

    #[test]
    fn adjacent_clips_only_rejected_when_gaps_required() {
        let clips = [
            clip(5.0, 8.0, Placement::Pip),
            clip(8.0, 11.0, Placement::Pip),
        ];
        let loose =
            collect_validation_errors(Path::new("/nonexistent/m.mp4"), None, &clips, 30.0, false);
        assert!(!loose.iter().any(|e| e.contains("overlaps")));
        let strict =
            collect_validation_errors(Path::new("/nonexistent/m.mp4"), None, &clips, 30.0, true);
        assert!(strict.iter().any(|e| e.contains("overlaps")));
    }
}
