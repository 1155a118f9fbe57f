//! CLI settings and suite configuration loading

use crate::commands::ColorArg;
use crate::error::CliResult;
use portal_probe::{SuiteConfig, TimingConfig};
use std::path::Path;

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only
    Quiet,
    /// Journey and step results
    #[default]
    Normal,
    /// Step boundaries from the library
    Verbose,
    /// Per-attempt polling detail
    Debug,
    /// Everything
    Trace,
}

impl Verbosity {
    /// From the `-v` count and `--quiet`
    #[must_use]
    pub const fn from_flags(verbose: u8, quiet: bool) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            2 => Self::Debug,
            _ => Self::Trace,
        }
    }

    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Default log level when `RUST_LOG` is unset
    #[must_use]
    pub const fn log_level(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl From<ColorArg> for ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

impl ColorChoice {
    /// Apply to the `console` crate's global switch
    pub fn apply(self) {
        match self {
            Self::Always => console::set_colors_enabled(true),
            Self::Never => console::set_colors_enabled(false),
            Self::Auto => {}
        }
    }
}

/// CLI configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct CliConfig {
    /// Verbosity
    pub verbosity: Verbosity,
    /// Color choice
    pub color: ColorChoice,
}

impl CliConfig {
    /// Create with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }
}

/// Environment configuration with optional YAML timing overrides
pub fn load_suite(timings: Option<&Path>) -> CliResult<SuiteConfig> {
    let suite = SuiteConfig::from_env();
    Ok(match timings {
        Some(path) => suite.with_timings(TimingConfig::load(path)?),
        None => suite,
    })
}
