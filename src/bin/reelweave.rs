use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use reelweave::{BrollPlan, Composer, ComposerConfig, CompositionRequest};

#[derive(Parser, Debug)]
#[command(name = "reelweave", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compose a final video in one engine pass (requires `ffmpeg` on PATH).
    Compose(ComposeArgs),
    /// Probe a media file and print its metadata as JSON.
    Probe(ProbeArgs),
}

#[derive(Parser, Debug)]
struct ComposeArgs {
    /// Main talking-head video.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output video path.
    #[arg(long)]
    out: PathBuf,

    /// ASS caption file to burn in.
    #[arg(long)]
    captions: Option<PathBuf>,

    /// B-roll plan JSON ({"clips": [...]}).
    #[arg(long)]
    broll: Option<PathBuf>,

    /// Header text; without a value, "{brand_name} Video" is synthesized
    /// from the configuration.
    #[arg(long, num_args = 0..=1, default_missing_value = "")]
    header: Option<String>,

    /// Composer configuration JSON; missing fields take defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Join cutaways with cross-fade transitions instead of overlays.
    #[arg(long)]
    transitions: bool,
}

#[derive(Parser, Debug)]
struct ProbeArgs {
    /// Media file to probe.
    file: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Compose(args) => cmd_compose(args),
        Command::Probe(args) => cmd_probe(args),
    }
}

fn read_config(path: Option<&Path>) -> anyhow::Result<ComposerConfig> {
    let Some(path) = path else {
        return Ok(ComposerConfig::default());
    };
    let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
    let cfg: ComposerConfig =
        serde_json::from_reader(BufReader::new(f)).with_context(|| "parse config JSON")?;
    Ok(cfg)
}

fn read_broll_plan(path: Option<&Path>) -> anyhow::Result<BrollPlan> {
    let Some(path) = path else {
        return Ok(BrollPlan::default());
    };
    let f = File::open(path).with_context(|| format!("open b-roll plan '{}'", path.display()))?;
    let plan: BrollPlan =
        serde_json::from_reader(BufReader::new(f)).with_context(|| "parse b-roll plan JSON")?;
    Ok(plan)
}

fn cmd_compose(args: ComposeArgs) -> anyhow::Result<()> {
    let mut cfg = read_config(args.config.as_deref())?;
    if args.transitions {
        cfg.transitions = true;
    }

    let header_text = args.header.map(|h| {
        if h.trim().is_empty() {
            format!("{} Video", cfg.brand_name)
        } else {
            h
        }
    });

    let plan = read_broll_plan(args.broll.as_deref())?;
    let composer = Composer::new(cfg)?;
    let request = CompositionRequest {
        main_video: args.in_path,
        output: args.out,
        captions: args.captions,
        broll: plan.clips,
        header_text,
    };

    let report = composer.compose(&request)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let info = reelweave::probe_media(&args.file)?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
