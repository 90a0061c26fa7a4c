use std::path::{Path, PathBuf};

use crate::config::ComposerConfig;
use crate::foundation::error::{ComposeError, ComposeResult};
use crate::foundation::time::Interval;
use crate::timeline::clip::{BrollClip, Placement};

/// Contiguity slack for coverage checks; timeline arithmetic is pure f64
/// addition so anything beyond rounding noise is a real gap.
const COVERAGE_EPSILON: f64 = 1e-6;

/// Cross-fade style applied when entering a segment.
///
/// Names map one-to-one onto the engine's `xfade` transition set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionStyle {
    Fade,
    Dissolve,
    FadeBlack,
    FadeWhite,
    CircleOpen,
    CircleClose,
    ZoomIn,
    Radial,
    SlideRight,
    SlideLeft,
    SlideUp,
    SlideDown,
    WipeLeft,
    WipeRight,
    WipeUp,
    WipeDown,
}

impl TransitionStyle {
    /// The engine-side `xfade` transition name.
    pub fn as_xfade(self) -> &'static str {
        match self {
            TransitionStyle::Fade => "fade",
            TransitionStyle::Dissolve => "dissolve",
            TransitionStyle::FadeBlack => "fadeblack",
            TransitionStyle::FadeWhite => "fadewhite",
            TransitionStyle::CircleOpen => "circleopen",
            TransitionStyle::CircleClose => "circleclose",
            TransitionStyle::ZoomIn => "zoomin",
            TransitionStyle::Radial => "radial",
            TransitionStyle::SlideRight => "slideright",
            TransitionStyle::SlideLeft => "slideleft",
            TransitionStyle::SlideUp => "slideup",
            TransitionStyle::SlideDown => "slidedown",
            TransitionStyle::WipeLeft => "wipeleft",
            TransitionStyle::WipeRight => "wiperight",
            TransitionStyle::WipeUp => "wipeup",
            TransitionStyle::WipeDown => "wipedown",
        }
    }
}

/// What a segment shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentKind {
    /// The main talking-head video.
    Avatar,
    /// One b-roll cutaway clip.
    Broll,
}

/// One contiguous slice of the output timeline.
#[derive(Clone, Debug)]
pub struct Segment {
    pub kind: SegmentKind,
    /// Source file this slice is read from.
    pub source: PathBuf,
    /// Window within the source file, seconds.
    pub source_window: Interval,
    /// Placement on the output timeline, seconds.
    pub timeline: Interval,
    /// `None` only for the first segment.
    pub transition_in: Option<TransitionStyle>,
    pub transition_secs: f64,
}

impl Segment {
    pub fn duration(&self) -> f64 {
        self.timeline.duration()
    }
}

/// Convert a sparse, sorted b-roll plan into a gap-free segment timeline.
///
/// Walks the clip list with a cursor, emitting alternating avatar and b-roll
/// segments so that the union of all timeline windows is exactly
/// `[0, duration)`. Full-frame clips longer than `max_fullframe_secs` are
/// trimmed from the end, anchored at their start; the avatar resumes at the
/// trimmed boundary.
///
/// Clips that begin at or before the cursor (overlap), or end past the main
/// timeline, are rejected.
pub fn build_segments(
    main_video: &Path,
    duration: f64,
    clips: &[BrollClip],
    cfg: &ComposerConfig,
) -> ComposeResult<Vec<Segment>> {
    if duration <= 0.0 || !duration.is_finite() {
        return Err(ComposeError::validation(format!(
            "main video duration must be > 0 and finite, got {duration}"
        )));
    }

    let mut segments: Vec<Segment> = Vec::with_capacity(clips.len() * 2 + 1);
    let mut cursor = 0.0_f64;

    let style_for = |index: usize| -> Option<TransitionStyle> {
        if index == 0 {
            None
        } else {
            Some(cfg.transition_styles[index % cfg.transition_styles.len()])
        }
    };

    for clip in clips {
        let interval = clip.interval()?;
        if interval.end > duration {
            return Err(ComposeError::validation(format!(
                "b-roll window ({}, {}) extends past the main timeline end {duration}",
                interval.start, interval.end
            )));
        }
        if interval.start <= cursor && !segments.is_empty() {
            return Err(ComposeError::validation(format!(
                "b-roll window ({}, {}) overlaps the segment ending at {cursor}",
                interval.start, interval.end
            )));
        }
        if cursor < interval.start {
            let window = Interval::new(cursor, interval.start)?;
            segments.push(Segment {
                kind: SegmentKind::Avatar,
                source: main_video.to_path_buf(),
                source_window: window,
                timeline: window,
                transition_in: style_for(segments.len()),
                transition_secs: cfg.transition_secs,
            });
        }

        let mut end = interval.end;
        if clip.placement == Placement::FullFrame
            && interval.duration() > cfg.max_fullframe_secs
        {
            end = interval.start + cfg.max_fullframe_secs;
        }
        let timeline = Interval::new(interval.start, end)?;
        segments.push(Segment {
            kind: SegmentKind::Broll,
            source: clip.path.clone(),
            source_window: Interval::new(0.0, timeline.duration())?,
            timeline,
            transition_in: style_for(segments.len()),
            transition_secs: cfg.transition_secs,
        });
        cursor = end;
    }

    if cursor < duration {
        let window = Interval::new(cursor, duration)?;
        segments.push(Segment {
            kind: SegmentKind::Avatar,
            source: main_video.to_path_buf(),
            source_window: window,
            timeline: window,
            transition_in: style_for(segments.len()),
            transition_secs: cfg.transition_secs,
        });
    }

    verify_coverage(&segments, duration)?;
    Ok(segments)
}

/// Check the coverage invariant: segments tile `[0, duration)` in order,
/// contiguously, with no gaps and no overlaps.
///
/// A failure here is a defect in timeline construction, not bad user input.
pub fn verify_coverage(segments: &[Segment], duration: f64) -> ComposeResult<()> {
    let Some(first) = segments.first() else {
        return Err(ComposeError::compile("segment timeline is empty"));
    };
    if first.timeline.start.abs() > COVERAGE_EPSILON {
        return Err(ComposeError::compile(format!(
            "first segment starts at {} instead of 0",
            first.timeline.start
        )));
    }
    if first.transition_in.is_some() {
        return Err(ComposeError::compile(
            "first segment must not carry a transition_in",
        ));
    }
    for pair in segments.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if (b.timeline.start - a.timeline.end).abs() > COVERAGE_EPSILON {
            return Err(ComposeError::compile(format!(
                "segment windows are not contiguous: ({}, {}) then ({}, {})",
                a.timeline.start, a.timeline.end, b.timeline.start, b.timeline.end
            )));
        }
        if b.transition_in.is_none() {
            return Err(ComposeError::compile(
                "non-initial segment is missing transition_in",
            ));
        }
    }
    if let Some(last) = segments.last()
        && (last.timeline.end - duration).abs() > COVERAGE_EPSILON
    {
        return Err(ComposeError::compile(format!(
            "last segment ends at {} instead of {duration}",
            last.timeline.end
        )));
    }
    Ok(())
}
