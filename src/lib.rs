//! Reelweave turns one talking-head video plus auxiliary assets (an ASS
//! caption file, b-roll clips with timing metadata) into a single rendered
//! output file.
//!
//! Every overlay, cutaway, transition, and audio adjustment is expressed as
//! one declarative [`RenderGraph`] and executed in a single pass of the
//! external `ffmpeg` engine. No intermediate files are produced.
//!
//! The public API is request-oriented:
//!
//! - Build a [`ComposerConfig`] (or take the defaults)
//! - Create a [`Composer`]
//! - Submit a [`CompositionRequest`] and receive a [`CompositionReport`]
#![forbid(unsafe_code)]

pub mod compose;
pub mod config;
pub mod exec;
pub mod foundation;
pub mod graph;
pub mod timeline;

pub use crate::compose::{Composer, CompositionReport, CompositionRequest};
pub use crate::config::ComposerConfig;
pub use crate::exec::probe::{is_engine_available, probe_media, MediaInfo};
pub use crate::foundation::error::{ComposeError, ComposeResult};
pub use crate::foundation::time::Interval;
pub use crate::graph::compile::{CompositionMode, CompositionPlan};
pub use crate::graph::model::RenderGraph;
pub use crate::timeline::clip::{BrollClip, BrollPlan, Placement};
pub use crate::timeline::segments::TransitionStyle;
