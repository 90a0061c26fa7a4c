use std::collections::HashMap;
use std::path::PathBuf;

use crate::foundation::error::{ComposeError, ComposeResult};

/// Index of a declared engine input file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputIndex(pub usize);

/// One source file handed to the engine, with optional input-side trimming.
#[derive(Clone, Debug, PartialEq)]
pub struct InputSpec {
    pub path: PathBuf,
    /// Seek this many seconds into the source before reading (`-ss`).
    pub seek: Option<f64>,
    /// Read at most this many seconds (`-t`).
    pub limit: Option<f64>,
}

impl InputSpec {
    /// The whole file, untrimmed.
    pub fn whole(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            seek: None,
            limit: None,
        }
    }

    /// A window of the file starting at `seek` for `limit` seconds.
    pub fn windowed(path: impl Into<PathBuf>, seek: f64, limit: f64) -> Self {
        Self {
            path: path.into(),
            seek: Some(seek),
            limit: Some(limit),
        }
    }
}

/// A single filter argument value.
///
/// The variants exist so that engine-specific quoting and escaping happen in
/// exactly one place, at the executor boundary: the compiler never
/// concatenates escaped strings.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterValue {
    /// Number or bare identifier, emitted as-is.
    Literal(String),
    /// Engine expression (e.g. `between(t,5,12)`), single-quoted on output.
    Expr(String),
    /// Free user text (drawtext), escaped and quoted on output.
    Text(String),
    /// File path (subtitles, fontfile), escaped and quoted on output.
    FilePath(PathBuf),
}

impl FilterValue {
    pub fn num(v: f64) -> Self {
        Self::Literal(format!("{v}"))
    }

    pub fn int(v: i64) -> Self {
        Self::Literal(v.to_string())
    }
}

/// One `key=value` (or positional) filter argument.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterArg {
    pub key: Option<String>,
    pub value: FilterValue,
}

impl FilterArg {
    pub fn pos(value: FilterValue) -> Self {
        Self { key: None, value }
    }

    pub fn kv(key: impl Into<String>, value: FilterValue) -> Self {
        Self {
            key: Some(key.into()),
            value,
        }
    }
}

/// One primitive operation node: named filter, labeled in/out edges.
#[derive(Clone, Debug)]
pub struct FilterNode {
    /// Input pads: either `"{i}:v"` / `"{i}:a"` source pads or labels
    /// produced by earlier nodes.
    pub inputs: Vec<String>,
    pub name: String,
    pub args: Vec<FilterArg>,
    /// Labels this node produces (always exactly one in this crate).
    pub outputs: Vec<String>,
}

/// Declarative render graph for one composition.
///
/// Built once by the compiler and then only read: the executor serializes
/// it into the engine's graph syntax without mutating it.
#[derive(Debug, Default)]
pub struct RenderGraph {
    inputs: Vec<InputSpec>,
    nodes: Vec<FilterNode>,
    video_out: Option<String>,
    audio_out: Option<String>,
}

impl RenderGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_input(&mut self, spec: InputSpec) -> InputIndex {
        self.inputs.push(spec);
        InputIndex(self.inputs.len() - 1)
    }

    /// Video source pad of input `idx`.
    pub fn video_pad(idx: InputIndex) -> String {
        format!("{}:v", idx.0)
    }

    /// Audio source pad of input `idx`.
    pub fn audio_pad(idx: InputIndex) -> String {
        format!("{}:a", idx.0)
    }

    /// Append a filter node and return its freshly allocated output label.
    pub fn add_filter(
        &mut self,
        inputs: Vec<String>,
        name: &str,
        args: Vec<FilterArg>,
        label_prefix: &str,
    ) -> String {
        let label = format!("{label_prefix}{}", self.nodes.len());
        self.nodes.push(FilterNode {
            inputs,
            name: name.to_string(),
            args,
            outputs: vec![label.clone()],
        });
        label
    }

    pub fn set_video_output(&mut self, label: String) {
        self.video_out = Some(label);
    }

    pub fn set_audio_output(&mut self, label: String) {
        self.audio_out = Some(label);
    }

    pub fn inputs(&self) -> &[InputSpec] {
        &self.inputs
    }

    pub fn nodes(&self) -> &[FilterNode] {
        &self.nodes
    }

    pub fn video_output(&self) -> Option<&str> {
        self.video_out.as_deref()
    }

    pub fn audio_output(&self) -> Option<&str> {
        self.audio_out.as_deref()
    }

    /// Structural well-formedness check.
    ///
    /// Every node input must be a source pad of a declared input or a label
    /// produced by an earlier node; labels are unique, every intermediate
    /// label is consumed exactly once, and both designated outputs exist and
    /// are left unconsumed. Violations are defects in the compiler.
    pub fn validate(&self) -> ComposeResult<()> {
        let mut produced: HashMap<&str, usize> = HashMap::new();
        let mut consumed: HashMap<&str, usize> = HashMap::new();

        for (n, node) in self.nodes.iter().enumerate() {
            for pad in &node.inputs {
                if let Some(idx) = parse_source_pad(pad) {
                    if idx >= self.inputs.len() {
                        return Err(ComposeError::compile(format!(
                            "node {n} ({}) reads pad '{pad}' but only {} inputs are declared",
                            node.name,
                            self.inputs.len()
                        )));
                    }
                } else if !produced.contains_key(pad.as_str()) {
                    return Err(ComposeError::compile(format!(
                        "node {n} ({}) reads undefined label '{pad}'",
                        node.name
                    )));
                }
                let uses = consumed.entry(pad.as_str()).or_insert(0);
                *uses += 1;
                if *uses > 1 {
                    return Err(ComposeError::compile(format!(
                        "label '{pad}' is consumed more than once"
                    )));
                }
            }
            for label in &node.outputs {
                if produced.insert(label.as_str(), n).is_some() {
                    return Err(ComposeError::compile(format!(
                        "label '{label}' is produced more than once"
                    )));
                }
                if parse_source_pad(label).is_some() {
                    return Err(ComposeError::compile(format!(
                        "label '{label}' shadows a source pad"
                    )));
                }
            }
        }

        for (name, out) in [("video", &self.video_out), ("audio", &self.audio_out)] {
            let Some(label) = out else {
                return Err(ComposeError::compile(format!(
                    "graph has no designated {name} output"
                )));
            };
            if !produced.contains_key(label.as_str()) {
                return Err(ComposeError::compile(format!(
                    "designated {name} output '{label}' is never produced"
                )));
            }
            if consumed.contains_key(label.as_str()) {
                return Err(ComposeError::compile(format!(
                    "designated {name} output '{label}' is also consumed by a node"
                )));
            }
        }

        let outputs = [self.video_out.as_deref(), self.audio_out.as_deref()];
        for &label in produced.keys() {
            if !outputs.contains(&Some(label)) && !consumed.contains_key(label) {
                return Err(ComposeError::compile(format!(
                    "label '{label}' is produced but never consumed"
                )));
            }
        }

        Ok(())
    }
}

/// Parse `"{i}:v"` / `"{i}:a"` source pads; anything else is a node label.
fn parse_source_pad(pad: &str) -> Option<usize> {
    let (idx, stream) = pad.split_once(':')?;
    if stream != "v" && stream != "a" {
        return None;
    }
    idx.parse().ok()
}
