//! Structured tracing helpers.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Builds the log filter. `RUST_LOG` wins when set; otherwise `directives` is used.
///
/// # Errors
///
/// Returns an error when `directives` is not a valid filter and `RUST_LOG` is unset.
pub fn build_filter(directives: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid log filter `{directives}`")),
    }
}

/// Installs the global `fmt` subscriber writing to stderr, so stdout stays free
/// for the function's output.
///
/// # Errors
///
/// Returns an error when the filter is invalid or a global subscriber is
/// already installed.
pub fn init(directives: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(directives)?)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))
        .context("cannot install tracing subscriber")
}
