use std::path::PathBuf;

use crate::config::ComposerConfig;
use crate::foundation::error::{ComposeError, ComposeResult};
use crate::graph::model::{FilterArg, FilterValue, InputSpec, RenderGraph};
use crate::timeline::clip::Placement;
use crate::timeline::overlays::{ducking_intervals, DuckingInterval, Overlay};
use crate::timeline::segments::{verify_coverage, Segment};

// Header styling, tuned for short-form portrait/landscape social output.
const HEADER_FONT_SIZE: i64 = 52;
const HEADER_FONT_COLOR: &str = "#C8A2C8";
const HEADER_BOX_COLOR: &str = "#0066FF@0.25";
const HEADER_BOX_BORDER: i64 = 15;
const HEADER_Y: i64 = 40;

/// How the composition is assembled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompositionMode {
    /// Segments joined pairwise with cross-fade blends; cutaways become
    /// timeline segments of their own.
    Transitions,
    /// One continuous main stream with cutaways composited as
    /// time-windowed overlays.
    Overlays,
}

/// Everything the compiler needs for one composition.
#[derive(Clone, Debug)]
pub struct CompositionPlan {
    pub main_video: PathBuf,
    pub duration: f64,
    pub mode: CompositionMode,
    /// Gap-free segment timeline; only consulted in transition mode.
    pub segments: Vec<Segment>,
    pub overlays: Vec<Overlay>,
}

/// Expected duration of the composed output, seconds.
///
/// Each cross-fade overlaps its segment boundary instead of inserting
/// screen time, so transition mode shortens the output by one transition
/// duration per join.
pub fn expected_duration(plan: &CompositionPlan) -> f64 {
    match plan.mode {
        CompositionMode::Overlays => plan.duration,
        CompositionMode::Transitions => {
            let overlap: f64 = plan
                .segments
                .iter()
                .skip(1)
                .map(|s| s.transition_secs)
                .sum();
            plan.duration - overlap
        }
    }
}

/// Audio gain expression: the product of one conditional term per ducking
/// interval, `1.0` outside all of them.
pub fn ducking_expression(intervals: &[DuckingInterval]) -> String {
    intervals
        .iter()
        .map(|iv| {
            format!(
                "if(between(t,{},{}),{},1.0)",
                iv.start, iv.end, iv.gain
            )
        })
        .collect::<Vec<_>>()
        .join("*")
}

/// Compile a composition plan into a render graph.
///
/// Pure graph construction: no file I/O, no process. The returned graph is
/// structurally validated and immutable.
pub fn compile(cfg: &ComposerConfig, plan: &CompositionPlan) -> ComposeResult<RenderGraph> {
    let mut g = RenderGraph::new();
    match plan.mode {
        CompositionMode::Transitions => compile_transitions(cfg, plan, &mut g)?,
        CompositionMode::Overlays => compile_overlays(cfg, plan, &mut g)?,
    }
    g.validate()?;
    Ok(g)
}

fn compile_transitions(
    cfg: &ComposerConfig,
    plan: &CompositionPlan,
    g: &mut RenderGraph,
) -> ComposeResult<()> {
    verify_coverage(&plan.segments, plan.duration)?;
    if plan.segments.len() < 2 {
        return Err(ComposeError::compile(
            "transition assembly requires at least two segments",
        ));
    }

    // One trimmed input per segment; normalize every source to the output
    // resolution and square pixels before blending.
    let mut scaled = Vec::with_capacity(plan.segments.len());
    for seg in &plan.segments {
        let input = g.add_input(InputSpec::windowed(
            seg.source.clone(),
            seg.source_window.start,
            seg.source_window.duration(),
        ));
        let s = g.add_filter(
            vec![RenderGraph::video_pad(input)],
            "scale",
            vec![
                FilterArg::pos(FilterValue::int(i64::from(cfg.width))),
                FilterArg::pos(FilterValue::int(i64::from(cfg.height))),
            ],
            "s",
        );
        let v = g.add_filter(
            vec![s],
            "setsar",
            vec![FilterArg::pos(FilterValue::int(1))],
            "v",
        );
        scaled.push((input, v));
    }

    // Pairwise cross-fades. The blend for segment i starts one transition
    // duration before its boundary, so offsets never move backwards.
    let mut video = scaled[0].1.clone();
    let mut audio = RenderGraph::audio_pad(scaled[0].0);
    let mut elapsed = plan.segments[0].duration();
    let mut last_offset = f64::MIN;

    for (i, seg) in plan.segments.iter().enumerate().skip(1) {
        let style = seg
            .transition_in
            .ok_or_else(|| ComposeError::compile("non-initial segment without transition_in"))?;
        let offset = elapsed - seg.transition_secs;
        if offset < 0.0 {
            return Err(ComposeError::validation(format!(
                "transition duration {} does not fit before segment {i} (blend would start at {offset})",
                seg.transition_secs
            )));
        }
        if offset < last_offset {
            return Err(ComposeError::compile(format!(
                "transition offsets are not monotone: {offset} after {last_offset}"
            )));
        }
        last_offset = offset;

        video = g.add_filter(
            vec![video, scaled[i].1.clone()],
            "xfade",
            vec![
                FilterArg::kv("transition", FilterValue::Literal(style.as_xfade().into())),
                FilterArg::kv("duration", FilterValue::num(seg.transition_secs)),
                FilterArg::kv("offset", FilterValue::num(offset)),
            ],
            "x",
        );
        audio = g.add_filter(
            vec![audio, RenderGraph::audio_pad(scaled[i].0)],
            "acrossfade",
            vec![
                FilterArg::kv("d", FilterValue::num(seg.transition_secs)),
                FilterArg::kv("c1", FilterValue::Literal("tri".into())),
                FilterArg::kv("c2", FilterValue::Literal("tri".into())),
            ],
            "a",
        );
        elapsed += seg.duration();
    }

    // Cutaways are already segments here; only the header and the caption
    // burn-in apply on top of the assembled timeline.
    for overlay in &plan.overlays {
        match overlay {
            Overlay::HeaderText { text, visible } => {
                video = draw_header(g, cfg, video, text, visible.end);
            }
            Overlay::Broll { .. } => {}
            Overlay::BurnedCaptions { path } => {
                video = burn_captions(g, video, path.clone());
            }
        }
    }

    g.set_video_output(video);
    g.set_audio_output(audio);
    Ok(())
}

fn compile_overlays(
    cfg: &ComposerConfig,
    plan: &CompositionPlan,
    g: &mut RenderGraph,
) -> ComposeResult<()> {
    let main = g.add_input(InputSpec::whole(plan.main_video.clone()));
    let mut video = g.add_filter(
        vec![RenderGraph::video_pad(main)],
        "scale",
        vec![
            FilterArg::pos(FilterValue::int(i64::from(cfg.width))),
            FilterArg::pos(FilterValue::int(i64::from(cfg.height))),
        ],
        "v",
    );

    // Resolution order is already header, cutaways, captions; walking it in
    // order gives captions the topmost layer.
    for overlay in &plan.overlays {
        match overlay {
            Overlay::HeaderText { text, visible } => {
                video = draw_header(g, cfg, video, text, visible.end);
            }
            Overlay::Broll { clip, effective } => {
                video = match clip.placement {
                    Placement::Pip => {
                        let input = g.add_input(InputSpec::whole(clip.path.clone()));
                        let scaled = g.add_filter(
                            vec![RenderGraph::video_pad(input)],
                            "scale",
                            vec![
                                FilterArg::pos(FilterValue::int(i64::from(cfg.pip_width))),
                                FilterArg::pos(FilterValue::int(i64::from(cfg.pip_height))),
                            ],
                            "b",
                        );
                        let faded = fade_pair(
                            g,
                            scaled,
                            effective.start,
                            clip.fade_in_sec,
                            effective.end - clip.fade_out_sec,
                            clip.fade_out_sec,
                        );
                        g.add_filter(
                            vec![video, faded],
                            "overlay",
                            vec![
                                FilterArg::kv(
                                    "x",
                                    FilterValue::Literal(format!(
                                        "main_w-{}",
                                        cfg.pip_width + cfg.pip_padding
                                    )),
                                ),
                                FilterArg::kv(
                                    "y",
                                    FilterValue::Literal(format!(
                                        "main_h-{}",
                                        cfg.pip_height + cfg.pip_padding
                                    )),
                                ),
                                FilterArg::kv("enable", between(effective.start, effective.end)),
                            ],
                            "o",
                        )
                    }
                    Placement::FullFrame => {
                        let dur = effective.duration();
                        let input = g.add_input(InputSpec {
                            path: clip.path.clone(),
                            seek: None,
                            limit: Some(dur),
                        });
                        let scaled = g.add_filter(
                            vec![RenderGraph::video_pad(input)],
                            "scale",
                            vec![
                                FilterArg::pos(FilterValue::int(i64::from(cfg.width))),
                                FilterArg::pos(FilterValue::int(i64::from(cfg.height))),
                            ],
                            "b",
                        );
                        let faded = fade_pair(
                            g,
                            scaled,
                            0.0,
                            clip.fade_in_sec,
                            dur - clip.fade_out_sec,
                            clip.fade_out_sec,
                        );
                        let shifted = g.add_filter(
                            vec![faded],
                            "setpts",
                            vec![FilterArg::pos(FilterValue::Expr(format!(
                                "PTS+{}/TB",
                                effective.start
                            )))],
                            "b",
                        );
                        g.add_filter(
                            vec![video, shifted],
                            "overlay",
                            vec![FilterArg::kv(
                                "enable",
                                between(effective.start, effective.end),
                            )],
                            "o",
                        )
                    }
                };
            }
            Overlay::BurnedCaptions { path } => {
                video = burn_captions(g, video, path.clone());
            }
        }
    }

    let ducks = ducking_intervals(&plan.overlays, cfg.ducking_gain);
    let audio = if ducks.is_empty() {
        g.add_filter(vec![RenderGraph::audio_pad(main)], "anull", vec![], "a")
    } else {
        g.add_filter(
            vec![RenderGraph::audio_pad(main)],
            "volume",
            vec![FilterArg::pos(FilterValue::Expr(ducking_expression(
                &ducks,
            )))],
            "a",
        )
    };

    g.set_video_output(video);
    g.set_audio_output(audio);
    Ok(())
}

fn between(start: f64, end: f64) -> FilterValue {
    FilterValue::Expr(format!("between(t,{start},{end})"))
}

fn fade_pair(
    g: &mut RenderGraph,
    input: String,
    in_start: f64,
    in_secs: f64,
    out_start: f64,
    out_secs: f64,
) -> String {
    let faded_in = g.add_filter(
        vec![input],
        "fade",
        vec![
            FilterArg::kv("t", FilterValue::Literal("in".into())),
            FilterArg::kv("st", FilterValue::num(in_start)),
            FilterArg::kv("d", FilterValue::num(in_secs)),
        ],
        "f",
    );
    g.add_filter(
        vec![faded_in],
        "fade",
        vec![
            FilterArg::kv("t", FilterValue::Literal("out".into())),
            FilterArg::kv("st", FilterValue::num(out_start)),
            FilterArg::kv("d", FilterValue::num(out_secs)),
        ],
        "f",
    )
}

fn draw_header(
    g: &mut RenderGraph,
    cfg: &ComposerConfig,
    video: String,
    text: &str,
    visible_end: f64,
) -> String {
    let mut args = vec![FilterArg::kv("text", FilterValue::Text(text.to_string()))];
    if let Some(font) = &cfg.header_font {
        args.push(FilterArg::kv("fontfile", FilterValue::FilePath(font.clone())));
    }
    args.extend([
        FilterArg::kv("fontsize", FilterValue::int(HEADER_FONT_SIZE)),
        FilterArg::kv("fontcolor", FilterValue::Literal(HEADER_FONT_COLOR.into())),
        FilterArg::kv("x", FilterValue::Expr("(w-text_w)/2".into())),
        FilterArg::kv("y", FilterValue::int(HEADER_Y)),
        FilterArg::kv("box", FilterValue::int(1)),
        FilterArg::kv("boxcolor", FilterValue::Literal(HEADER_BOX_COLOR.into())),
        FilterArg::kv("boxborderw", FilterValue::int(HEADER_BOX_BORDER)),
        FilterArg::kv("enable", FilterValue::Expr(format!("lt(t,{visible_end})"))),
    ]);
    g.add_filter(vec![video], "drawtext", args, "h")
}

fn burn_captions(g: &mut RenderGraph, video: String, path: PathBuf) -> String {
    g.add_filter(
        vec![video],
        "subtitles",
        vec![FilterArg::kv("filename", FilterValue::FilePath(path))],
        "c",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::clip::BrollClip;
    use crate::timeline::overlays::resolve_overlays;
    use crate::timeline::segments::build_segments;
    use std::path::Path;

    fn clip(start: f64, end: f64, placement: Placement) -> BrollClip {
        BrollClip {
            path: PathBuf::from("broll.mp4"),
            start_sec: start,
            end_sec: end,
            placement,
            fade_in_sec: 0.5,
            fade_out_sec: 0.5,
        }
    }

    fn overlay_plan(
        cfg: &ComposerConfig,
        duration: f64,
        header: Option<&str>,
        captions: Option<&Path>,
        clips: &[BrollClip],
    ) -> CompositionPlan {
        CompositionPlan {
            main_video: PathBuf::from("main.mp4"),
            duration,
            mode: CompositionMode::Overlays,
            segments: Vec::new(),
            overlays: resolve_overlays(cfg, duration, header, captions, clips).unwrap(),
        }
    }

    fn arg<'a>(g: &'a RenderGraph, filter: &str, key: &str) -> &'a FilterValue {
        let node = g
            .nodes()
            .iter()
            .find(|n| n.name == filter)
            .unwrap_or_else(|| panic!("no {filter} node"));
        &node
            .args
            .iter()
            .find(|a| {
                if key.is_empty() {
                    a.key.is_none()
                } else {
                    a.key.as_deref() == Some(key)
                }
            })
            .unwrap_or_else(|| panic!("no {key:?} arg on {filter}"))
            .value
    }

    #[test]
    fn bare_video_compiles_to_scale_and_anull_only() {
        let cfg = ComposerConfig::default();
        let plan = overlay_plan(&cfg, 30.0, None, None, &[]);
        let g = compile(&cfg, &plan).unwrap();
        assert_eq!(g.inputs().len(), 1);
        let names: Vec<_> = g.nodes().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["scale", "anull"]);
        assert_eq!(expected_duration(&plan), 30.0);
    }

    #[test]
    fn pip_overlay_is_gated_to_its_window() {
        let cfg = ComposerConfig::default();
        let plan = overlay_plan(&cfg, 30.0, None, None, &[clip(5.0, 12.0, Placement::Pip)]);
        let g = compile(&cfg, &plan).unwrap();

        assert_eq!(
            *arg(&g, "overlay", "enable"),
            FilterValue::Expr("between(t,5,12)".into())
        );
        assert_eq!(
            *arg(&g, "overlay", "x"),
            FilterValue::Literal("main_w-410".into())
        );
        assert_eq!(
            *arg(&g, "overlay", "y"),
            FilterValue::Literal("main_h-310".into())
        );

        let fades: Vec<_> = g.nodes().iter().filter(|n| n.name == "fade").collect();
        assert_eq!(fades.len(), 2);
        assert_eq!(
            fades[0].args[1].value,
            FilterValue::Literal("5".into()),
            "fade-in starts at the overlay window start"
        );
        assert_eq!(fades[1].args[1].value, FilterValue::Literal("11.5".into()));
    }

    #[test]
    fn fullframe_overlay_is_trimmed_shifted_and_capped() {
        let cfg = ComposerConfig::default();
        let plan = overlay_plan(
            &cfg,
            30.0,
            None,
            None,
            &[clip(5.0, 20.0, Placement::FullFrame)],
        );
        let g = compile(&cfg, &plan).unwrap();

        assert_eq!(g.inputs()[1].limit, Some(3.5));
        assert_eq!(g.inputs()[1].seek, None);
        assert_eq!(
            *arg(&g, "setpts", ""),
            FilterValue::Expr("PTS+5/TB".into())
        );
        assert_eq!(
            *arg(&g, "overlay", "enable"),
            FilterValue::Expr("between(t,5,8.5)".into())
        );
    }

    #[test]
    fn header_and_captions_sandwich_the_cutaways() {
        let cfg = ComposerConfig::default();
        let plan = overlay_plan(
            &cfg,
            30.0,
            Some("Acme Video"),
            Some(Path::new("styled.ass")),
            &[clip(5.0, 12.0, Placement::Pip)],
        );
        let g = compile(&cfg, &plan).unwrap();

        let names: Vec<_> = g.nodes().iter().map(|n| n.name.as_str()).collect();
        let drawtext = names.iter().position(|n| *n == "drawtext").unwrap();
        let overlay = names.iter().position(|n| *n == "overlay").unwrap();
        let subtitles = names.iter().position(|n| *n == "subtitles").unwrap();
        assert!(drawtext < overlay && overlay < subtitles);

        assert_eq!(
            *arg(&g, "drawtext", "enable"),
            FilterValue::Expr("lt(t,7)".into())
        );
    }

    #[test]
    fn ducking_expression_matches_interval_list() {
        let ducks = vec![
            DuckingInterval { start: 5.0, end: 10.0, gain: 0.5 },
            DuckingInterval { start: 20.0, end: 25.0, gain: 0.5 },
        ];
        assert_eq!(
            ducking_expression(&ducks),
            "if(between(t,5,10),0.5,1.0)*if(between(t,20,25),0.5,1.0)"
        );
    }

    #[test]
    fn overlay_mode_audio_ducks_during_cutaways() {
        let cfg = ComposerConfig::default();
        let plan = overlay_plan(&cfg, 30.0, None, None, &[clip(5.0, 12.0, Placement::Pip)]);
        let g = compile(&cfg, &plan).unwrap();
        assert_eq!(
            *arg(&g, "volume", ""),
            FilterValue::Expr("if(between(t,5,12),0.5,1.0)".into())
        );
    }

    fn transition_plan(cfg: &ComposerConfig, clips: &[BrollClip]) -> CompositionPlan {
        let segments = build_segments(Path::new("main.mp4"), 30.0, clips, cfg).unwrap();
        CompositionPlan {
            main_video: PathBuf::from("main.mp4"),
            duration: 30.0,
            mode: CompositionMode::Transitions,
            segments,
            overlays: resolve_overlays(cfg, 30.0, None, None, clips).unwrap(),
        }
    }

    #[test]
    fn transition_mode_chains_xfades_with_monotone_offsets() {
        let cfg = ComposerConfig {
            transitions: true,
            ..Default::default()
        };
        let plan = transition_plan(&cfg, &[clip(5.0, 12.0, Placement::Pip)]);
        let g = compile(&cfg, &plan).unwrap();

        assert_eq!(g.inputs().len(), 3);
        assert_eq!(g.inputs()[0].seek, Some(0.0));
        assert_eq!(g.inputs()[0].limit, Some(5.0));
        assert_eq!(g.inputs()[1].seek, Some(0.0));
        assert_eq!(g.inputs()[2].seek, Some(12.0));
        assert_eq!(g.inputs()[2].limit, Some(18.0));

        let offsets: Vec<&FilterValue> = g
            .nodes()
            .iter()
            .filter(|n| n.name == "xfade")
            .map(|n| {
                &n.args
                    .iter()
                    .find(|a| a.key.as_deref() == Some("offset"))
                    .unwrap()
                    .value
            })
            .collect();
        assert_eq!(
            offsets,
            vec![
                &FilterValue::Literal("4.5".into()),
                &FilterValue::Literal("11.5".into())
            ]
        );

        let acrossfades = g.nodes().iter().filter(|n| n.name == "acrossfade").count();
        assert_eq!(acrossfades, 2);
        assert_eq!(expected_duration(&plan), 29.0);
    }

    #[test]
    fn transition_mode_skips_cutaway_overlays_but_keeps_captions() {
        let cfg = ComposerConfig {
            transitions: true,
            ..Default::default()
        };
        let mut plan = transition_plan(&cfg, &[clip(5.0, 12.0, Placement::Pip)]);
        plan.overlays = resolve_overlays(
            &cfg,
            30.0,
            Some("Title"),
            Some(Path::new("styled.ass")),
            &[clip(5.0, 12.0, Placement::Pip)],
        )
        .unwrap();
        let g = compile(&cfg, &plan).unwrap();

        assert!(!g.nodes().iter().any(|n| n.name == "overlay"));
        assert!(g.nodes().iter().any(|n| n.name == "drawtext"));
        assert!(g.nodes().iter().any(|n| n.name == "subtitles"));
    }

    #[test]
    fn transition_too_long_for_leading_segment_is_rejected() {
        let cfg = ComposerConfig {
            transitions: true,
            transition_secs: 0.5,
            ..Default::default()
        };
        let plan = transition_plan(&cfg, &[clip(0.2, 6.0, Placement::Pip)]);
        let err = compile(&cfg, &plan).unwrap_err();
        assert!(matches!(err, ComposeError::Validation(_)));
    }
}
