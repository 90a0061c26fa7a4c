use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::Context as _;
use tracing::{debug, info};

use crate::exec::probe::{is_engine_available, probe_media};
use crate::foundation::error::{ComposeError, ComposeResult};
use crate::graph::model::{FilterValue, RenderGraph};

// Intermediate-quality encode: fast enough to iterate on, good enough to
// hand to a final re-encoding step downstream.
const VIDEO_CODEC_ARGS: [&str; 6] = ["-c:v", "libx264", "-preset", "ultrafast", "-crf", "18"];
const AUDIO_CODEC_ARGS: [&str; 4] = ["-c:a", "aac", "-b:a", "192k"];

/// Output duration tolerance: absolute slack plus a relative share, since
/// container rounding grows with length.
fn duration_tolerance(expected_secs: f64) -> f64 {
    0.5 + expected_secs * 0.02
}

/// Serialize a render graph into the engine's `-filter_complex` syntax.
///
/// Pure; all quoting and escaping happens here and nowhere else.
pub fn filter_complex(graph: &RenderGraph) -> String {
    graph
        .nodes()
        .iter()
        .map(|node| {
            let mut s = String::new();
            for pad in &node.inputs {
                s.push('[');
                s.push_str(pad);
                s.push(']');
            }
            s.push_str(&node.name);
            if !node.args.is_empty() {
                s.push('=');
                let rendered: Vec<String> = node
                    .args
                    .iter()
                    .map(|arg| match &arg.key {
                        Some(key) => format!("{key}={}", render_value(&arg.value)),
                        None => render_value(&arg.value),
                    })
                    .collect();
                s.push_str(&rendered.join(":"));
            }
            for label in &node.outputs {
                s.push('[');
                s.push_str(label);
                s.push(']');
            }
            s
        })
        .collect::<Vec<_>>()
        .join(";")
}

fn render_value(value: &FilterValue) -> String {
    match value {
        FilterValue::Literal(s) => s.clone(),
        FilterValue::Expr(s) | FilterValue::Text(s) => quote(s),
        FilterValue::FilePath(p) => quote(&escape_filter_path(p)),
    }
}

/// Single-quote a filter argument value. A quote inside the value closes
/// the quoting, emits an escaped quote, and reopens.
fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Normalize a path for use inside a filter argument: forward slashes, and
/// drive-letter colons escaped so they are not taken as argument separators.
pub fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace(':', r"\:")
}

/// Assemble the full engine argument list for one composition.
pub fn build_args(graph: &RenderGraph, out_path: &Path) -> ComposeResult<Vec<String>> {
    let video = graph
        .video_output()
        .ok_or_else(|| ComposeError::compile("graph has no designated video output"))?;
    let audio = graph
        .audio_output()
        .ok_or_else(|| ComposeError::compile("graph has no designated audio output"))?;

    let mut args: Vec<String> = vec!["-y".into()];
    for input in graph.inputs() {
        if let Some(seek) = input.seek {
            args.push("-ss".into());
            args.push(format!("{seek}"));
        }
        if let Some(limit) = input.limit {
            args.push("-t".into());
            args.push(format!("{limit}"));
        }
        args.push("-i".into());
        args.push(input.path.to_string_lossy().into_owned());
    }
    args.push("-filter_complex".into());
    args.push(filter_complex(graph));
    args.push("-map".into());
    args.push(format!("[{video}]"));
    args.push("-map".into());
    args.push(format!("[{audio}]"));
    args.extend(VIDEO_CODEC_ARGS.iter().map(|s| s.to_string()));
    args.extend(AUDIO_CODEC_ARGS.iter().map(|s| s.to_string()));
    args.push(out_path.to_string_lossy().into_owned());
    Ok(args)
}

/// Execute the graph in a single engine pass and post-validate the output.
///
/// Full success or full failure: on a non-zero exit or a failed
/// post-validation the partial output file is removed and the engine's
/// diagnostic text is returned verbatim.
pub fn render(graph: &RenderGraph, out_path: &Path, expected_secs: f64) -> ComposeResult<()> {
    if !is_engine_available() {
        return Err(ComposeError::execution(
            "ffmpeg is required for composition, but was not found on PATH",
        ));
    }
    ensure_parent_dir(out_path)?;

    let args = build_args(graph, out_path)?;
    debug!(filter = %filter_complex(graph), "compiled filter graph");

    let output = Command::new("ffmpeg")
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .output()
        .map_err(|e| {
            ComposeError::execution(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        discard_partial(out_path);
        return Err(ComposeError::execution(format!(
            "ffmpeg exited with status {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    match std::fs::metadata(out_path) {
        Err(_) => {
            return Err(ComposeError::execution(format!(
                "ffmpeg succeeded but produced no output at '{}'",
                out_path.display()
            )));
        }
        Ok(meta) if meta.len() == 0 => {
            discard_partial(out_path);
            return Err(ComposeError::execution(format!(
                "ffmpeg produced an empty output at '{}'",
                out_path.display()
            )));
        }
        Ok(_) => {}
    }

    let probed = probe_media(out_path)?;
    let tolerance = duration_tolerance(expected_secs);
    if (probed.duration_secs - expected_secs).abs() > tolerance {
        discard_partial(out_path);
        return Err(ComposeError::execution(format!(
            "output duration {} deviates from expected {expected_secs} by more than {tolerance}",
            probed.duration_secs
        )));
    }

    info!(
        out = %out_path.display(),
        duration = probed.duration_secs,
        "composition rendered"
    );
    Ok(())
}

fn discard_partial(out_path: &Path) {
    let _ = std::fs::remove_file(out_path);
}

/// Ensure the parent directory of `path` exists.
fn ensure_parent_dir(path: &Path) -> ComposeResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::model::{FilterArg, InputSpec, RenderGraph};
    use std::path::PathBuf;

    fn minimal_graph() -> RenderGraph {
        let mut g = RenderGraph::new();
        let main = g.add_input(InputSpec::whole("main.mp4"));
        let v = g.add_filter(
            vec![RenderGraph::video_pad(main)],
            "scale",
            vec![
                FilterArg::pos(FilterValue::int(1280)),
                FilterArg::pos(FilterValue::int(720)),
            ],
            "v",
        );
        let a = g.add_filter(vec![RenderGraph::audio_pad(main)], "anull", vec![], "a");
        g.set_video_output(v);
        g.set_audio_output(a);
        g
    }

    #[test]
    fn serializes_minimal_graph() {
        let g = minimal_graph();
        assert_eq!(
            filter_complex(&g),
            "[0:v]scale=1280:720[v0];[0:a]anull[a1]"
        );
    }

    #[test]
    fn expressions_are_single_quoted() {
        let mut g = minimal_graph();
        let node = g.add_filter(
            vec!["v0".to_string()],
            "overlay",
            vec![FilterArg::kv(
                "enable",
                FilterValue::Expr("between(t,5,12)".into()),
            )],
            "o",
        );
        g.set_video_output(node);
        assert!(filter_complex(&g).contains("overlay=enable='between(t,5,12)'"));
    }

    #[test]
    fn text_with_quotes_is_escaped() {
        assert_eq!(quote("it's here"), r"'it'\''s here'");
    }

    #[test]
    fn windows_paths_are_normalized_for_filter_args() {
        let escaped = escape_filter_path(Path::new(r"C:\media\styled.ass"));
        assert_eq!(escaped, r"C\:/media/styled.ass");
    }

    #[test]
    fn subtitles_filename_is_quoted_and_escaped() {
        let mut g = minimal_graph();
        let node = g.add_filter(
            vec!["v0".to_string()],
            "subtitles",
            vec![FilterArg::kv(
                "filename",
                FilterValue::FilePath(PathBuf::from("media/styled.ass")),
            )],
            "c",
        );
        g.set_video_output(node);
        assert!(filter_complex(&g).contains("subtitles=filename='media/styled.ass'"));
    }

    #[test]
    fn build_args_places_trims_before_each_input() {
        let mut g = RenderGraph::new();
        let a = g.add_input(InputSpec::windowed("main.mp4", 0.0, 5.0));
        let b = g.add_input(InputSpec::whole("broll.mp4"));
        let v = g.add_filter(
            vec![RenderGraph::video_pad(a), RenderGraph::video_pad(b)],
            "xfade",
            vec![],
            "x",
        );
        let au = g.add_filter(vec![RenderGraph::audio_pad(a)], "anull", vec![], "a");
        // b's audio goes unused here; acceptable for an args-shape test.
        g.set_video_output(v);
        g.set_audio_output(au);

        let args = build_args(&g, Path::new("out/final.mp4")).unwrap();
        assert_eq!(args[0], "-y");
        let first_input = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(&args[first_input - 4..first_input], ["-ss", "0", "-t", "5"]);
        assert_eq!(args[first_input + 1], "main.mp4");
        assert!(args.windows(2).any(|w| w == ["-map", "[x0]"]));
        assert!(args.windows(2).any(|w| w == ["-map", "[a1]"]));
        assert!(args.windows(2).any(|w| w == ["-crf", "18"]));
        assert!(args.windows(2).any(|w| w == ["-b:a", "192k"]));
        assert_eq!(args.last().map(String::as_str), Some("out/final.mp4"));
    }

    #[test]
    fn build_args_without_outputs_is_a_defect() {
        let mut g = RenderGraph::new();
        g.add_input(InputSpec::whole("main.mp4"));
        let err = build_args(&g, Path::new("final.mp4")).unwrap_err();
        assert!(err.to_string().contains("no designated video output"));
    }
}
