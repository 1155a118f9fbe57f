//! CLI command definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Portal Probe: end-to-end journeys against the admin and customer portals
#[derive(Parser, Debug)]
#[command(name = "portal-probe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (only errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available journeys
    Journeys,

    /// Print the resolved configuration as JSON (passwords masked)
    Config(ConfigArgs),

    /// Run journeys in a real browser
    Run(RunArgs),
}

/// Arguments for `config`
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// YAML file with timing overrides
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Arguments for `run`
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Journeys to run (`all` or none for every journey)
    #[arg(value_name = "JOURNEY")]
    pub journeys: Vec<String>,

    /// YAML file with timing overrides
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Print reports as JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Stop after the first failed journey
    #[arg(long)]
    pub fail_fast: bool,

    /// Screenshot directory (overrides ARTIFACTS_DIR)
    #[arg(long, value_name = "DIR")]
    pub artifacts: Option<PathBuf>,
}

/// Color argument
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Color when stdout is a terminal
    #[default]
    Auto,
    /// Always color
    Always,
    /// Never color
    Never,
}
