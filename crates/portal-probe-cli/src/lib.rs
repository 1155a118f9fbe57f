//! Portal Probe CLI library
//!
//! Argument parsing, configuration loading, journey selection and report
//! rendering for the `portal-probe` binary.

#![warn(missing_docs)]

mod commands;
mod config;
mod error;
pub mod logging;
pub mod output;
pub mod runner;

pub use commands::{Cli, ColorArg, Commands, ConfigArgs, RunArgs};
pub use config::{load_suite, CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
