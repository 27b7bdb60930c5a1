//! spieluhr - turn MIDI files into music box punch strips
//!
//! Subcommands:
//! - `spieluhr convert <input.mid>` - Fit a tune onto a mechanism and write
//!   the strip as PDF/SVG, plus the punched notes as MIDI
//! - `spieluhr boxes` - List the known mechanisms
//! - `spieluhr config` - Print the effective configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use spieluhr::SearchMode;
use spieluhr_conf::SpieluhrConfig;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "spieluhr")]
#[command(about = "Turn MIDI files into music box punch strips")]
#[command(version)]
struct Cli {
    /// Config file to use instead of ./spieluhr.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a MIDI file into a punch strip
    Convert(ConvertArgs),

    /// List the supported music box mechanisms
    Boxes,

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args)]
pub struct ConvertArgs {
    /// Standard MIDI file to read
    pub input: PathBuf,

    /// Music box type (see `spieluhr boxes`)
    #[arg(short = 'b', long = "box")]
    pub box_type: Option<String>,

    /// Transpose by this many semitones instead of searching
    #[arg(short, long, allow_negative_numbers = true)]
    pub transpose: Option<i32>,

    /// Drop same-pitch repeats closer than this many ticks
    #[arg(short, long)]
    pub filter: Option<u64>,

    /// Shifts the transposition search may pick: any, octaves, no-octaves
    #[arg(long)]
    pub search: Option<SearchMode>,

    /// Paper preset: letter, letter-full, legal, legal-narrow, a4x2
    #[arg(long)]
    pub paper: Option<String>,

    /// Write the punched notes as a MIDI file
    #[arg(short = 'm', long = "midi")]
    pub midi: Option<PathBuf>,

    /// Write the strip as a multi-page PDF
    #[arg(short = 'p', long = "pdf")]
    pub pdf: Option<PathBuf>,

    /// Write the strip as a single SVG sheet
    #[arg(short = 's', long = "svg")]
    pub svg: Option<PathBuf>,
}

fn init_tracing(config: &SpieluhrConfig, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.telemetry.log_level))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, sources) = SpieluhrConfig::load_with_sources_from(cli.config.as_deref())?;
    init_tracing(&config, cli.verbose);
    tracing::debug!(files = ?sources.files, env = ?sources.env_overrides, "configuration loaded");

    match cli.command {
        Commands::Convert(args) => commands::convert(&args, config)?,
        Commands::Boxes => commands::boxes(),
        Commands::Config => commands::print_config(&config, &sources),
    }

    Ok(())
}
