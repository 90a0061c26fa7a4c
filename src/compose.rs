use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::ComposerConfig;
use crate::exec::ffmpeg::render;
use crate::exec::probe::probe_media;
use crate::foundation::error::{ComposeError, ComposeResult};
use crate::graph::compile::{compile, expected_duration, CompositionMode, CompositionPlan};
use crate::timeline::clip::BrollClip;
use crate::timeline::overlays::{collect_validation_errors, resolve_overlays};
use crate::timeline::segments::build_segments;

/// One composition request: the main video plus every auxiliary asset.
#[derive(Clone, Debug)]
pub struct CompositionRequest {
    pub main_video: PathBuf,
    pub output: PathBuf,
    /// ASS caption file to burn over the whole timeline.
    pub captions: Option<PathBuf>,
    /// Sorted b-roll plan; windows are absolute main-timeline seconds.
    pub broll: Vec<BrollClip>,
    /// Header text shown for the leading window of the output.
    pub header_text: Option<String>,
}

/// What a successful composition produced.
#[derive(Clone, Debug, Serialize)]
pub struct CompositionReport {
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub duration_secs: f64,
    pub captions_enabled: bool,
    pub broll_count: usize,
    pub mode: &'static str,
    pub processing_secs: f64,
}

fn mode_name(mode: CompositionMode) -> &'static str {
    match mode {
        CompositionMode::Transitions => "transitions",
        CompositionMode::Overlays => "overlays",
    }
}

/// Orchestrates one composition end to end: probe, validate, plan, compile,
/// execute. Holds only validated configuration; every call is independent.
pub struct Composer {
    cfg: ComposerConfig,
}

impl Composer {
    pub fn new(cfg: ComposerConfig) -> ComposeResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.cfg
    }

    /// Validate the request and translate it into a composition plan.
    ///
    /// Collects every input problem before failing, so the caller sees the
    /// full list at once. No external process is involved; `duration` is the
    /// probed main-video duration.
    pub fn plan(
        &self,
        request: &CompositionRequest,
        duration: f64,
    ) -> ComposeResult<CompositionPlan> {
        let transitions = self.cfg.transitions && !request.broll.is_empty();
        let errors = collect_validation_errors(
            &request.main_video,
            request.captions.as_deref(),
            &request.broll,
            duration,
            transitions,
        );
        if !errors.is_empty() {
            return Err(ComposeError::validation_all(errors));
        }

        let overlays = resolve_overlays(
            &self.cfg,
            duration,
            request.header_text.as_deref(),
            request.captions.as_deref(),
            &request.broll,
        )?;

        let (mode, segments) = if transitions {
            let segments = build_segments(&request.main_video, duration, &request.broll, &self.cfg)?;
            if segments.len() >= 2 {
                (CompositionMode::Transitions, segments)
            } else {
                (CompositionMode::Overlays, Vec::new())
            }
        } else {
            (CompositionMode::Overlays, Vec::new())
        };

        Ok(CompositionPlan {
            main_video: request.main_video.clone(),
            duration,
            mode,
            segments,
            overlays,
        })
    }

    /// Run one full composition. Full success or full failure: on any error
    /// no output file is left behind.
    pub fn compose(&self, request: &CompositionRequest) -> ComposeResult<CompositionReport> {
        let started = Instant::now();

        // A missing main video must surface as a validation finding next to
        // every other input problem, not as a probe failure. Window checks
        // are skipped (no duration yet); the file errors dominate.
        if std::fs::metadata(&request.main_video).is_err() {
            let errors = collect_validation_errors(
                &request.main_video,
                request.captions.as_deref(),
                &request.broll,
                f64::INFINITY,
                self.cfg.transitions && !request.broll.is_empty(),
            );
            return Err(ComposeError::validation_all(errors));
        }

        let probed = probe_media(&request.main_video)?;
        let duration = probed.duration_secs;
        info!(
            main = %request.main_video.display(),
            duration,
            "probed main video"
        );

        let plan = self.plan(request, duration)?;
        let mode = plan.mode;
        let graph = compile(&self.cfg, &plan)?;
        debug!(
            inputs = graph.inputs().len(),
            nodes = graph.nodes().len(),
            mode = mode_name(mode),
            "render graph compiled"
        );

        let expected = expected_duration(&plan);
        render(&graph, &request.output, expected)?;

        let report = CompositionReport {
            output: request.output.clone(),
            width: self.cfg.width,
            height: self.cfg.height,
            duration_secs: expected,
            captions_enabled: request.captions.is_some(),
            broll_count: request.broll.len(),
            mode: mode_name(mode),
            processing_secs: started.elapsed().as_secs_f64(),
        };
        info!(
            out = %report.output.display(),
            secs = report.processing_secs,
            "composition complete"
        );
        Ok(report)
    }
}
