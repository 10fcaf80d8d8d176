//! Tracing subscriber setup.
//!
//! Logs always go to stderr: stdout carries CLI output and the stdio MCP
//! protocol.

use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber.
///
/// `RUST_LOG` wins when set. Otherwise the level is `info`, or `debug` with
/// `verbose`.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
