use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{error, warn};

use sprite_chunks::batch::{run_batch, BatchDirection};
use sprite_chunks::config::Config;
use sprite_chunks::overlap::OverlapPolicy;
use sprite_chunks::palette::SpriteKind;
use sprite_chunks::pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "sprite-tool", about = "Bidirectional sprite-chunk converter")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Frames -> object folder (Object Generator).
    Generate {
        input: PathBuf,
        output: PathBuf,
        #[arg(long, default_value = "config.json")]
        config: PathBuf,
        #[arg(long, value_enum, default_value = "object")]
        kind: KindArg,
    },
    /// Object folder -> frames (Frames Generator).
    Assemble {
        input: PathBuf,
        output: PathBuf,
        #[arg(long, default_value = "config.json")]
        config: PathBuf,
        #[arg(long, value_enum, default_value = "object")]
        kind: KindArg,
        #[arg(long, default_value = "chunk")]
        overlap: String,
    },
    /// Runs Generate or Assemble over every subfolder of a root directory.
    Batch {
        input: PathBuf,
        output: PathBuf,
        #[arg(long, default_value = "config.json")]
        config: PathBuf,
        #[arg(long, value_enum, default_value = "object")]
        kind: KindArg,
        #[arg(long, value_enum)]
        direction: DirectionArg,
        #[arg(long, default_value = "chunk")]
        overlap: String,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum KindArg {
    Object,
    Effect,
}

impl From<KindArg> for SpriteKind {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::Object => SpriteKind::Object,
            KindArg::Effect => SpriteKind::Effect,
        }
    }
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum DirectionArg {
    Forward,
    Reverse,
}

fn load_config(path: &PathBuf) -> anyhow::Result<Config> {
    if path.exists() {
        Ok(Config::load(path)?)
    } else {
        Ok(Config::default())
    }
}

fn parse_overlap(s: &str) -> anyhow::Result<OverlapPolicy> {
    OverlapPolicy::parse(s).ok_or_else(|| anyhow::anyhow!("unknown overlap policy: {s}"))
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Generate { input, output, config, kind } => {
            let pipeline = Pipeline::new(kind.into(), load_config(&config)?);
            let summary = pipeline.forward(&input, &output)?;
            for w in &summary.warnings {
                warn!("{w}");
            }
            println!("wrote {} frame(s), {} chunk(s)", summary.frame_count, summary.chunk_count);
        }
        Commands::Assemble { input, output, config, kind, overlap } => {
            let pipeline = Pipeline::new(kind.into(), load_config(&config)?);
            let policy = parse_overlap(&overlap)?;
            let rendered = pipeline.reverse(&input, &output, policy)?;
            println!("wrote {rendered} frame(s)");
        }
        Commands::Batch { input, output, config, kind, direction, overlap } => {
            let pipeline = Pipeline::new(kind.into(), load_config(&config)?);
            let policy = parse_overlap(&overlap)?;
            let direction = match direction {
                DirectionArg::Forward => BatchDirection::Forward,
                DirectionArg::Reverse => BatchDirection::Reverse,
            };
            let summary = run_batch(&pipeline, &input, &output, direction, policy)?;
            println!("converted {} folder(s), {} failed", summary.succeeded, summary.failed.len());
            if !summary.failed.is_empty() {
                for (path, message) in &summary.failed {
                    error!("{}: {message}", path.display());
                }
                return Err(anyhow::anyhow!("{} folder(s) failed to convert", summary.failed.len()));
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    sprite_chunks::set_up_logger();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
