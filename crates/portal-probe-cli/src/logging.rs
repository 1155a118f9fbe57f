//! Log output for the CLI

use crate::config::Verbosity;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise the level follows `-v`/`--quiet`.
/// Logs go to stderr so `--json` output on stdout stays parseable. Calling
/// this twice is harmless.
pub fn init(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn default_directive(verbosity: Verbosity) -> String {
    let level = verbosity.log_level();
    format!("warn,portal_probe={level},portal_probe_cli={level}")
}
