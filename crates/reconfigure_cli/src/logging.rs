//! Log subscriber setup for the `reconfigure` binary.

use std::io;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_ENV_VAR: &str = "RECONFIGURE_LOG";

const DEFAULT_FILTER: &str = "info";

/// Picks the log filter: the environment wins, then `--debug`, then the
/// settings file, then `info`.
pub fn log_filter(env: Option<&str>, debug: bool, configured: Option<&str>) -> String {
    match (env.filter(|value| !value.trim().is_empty()), debug, configured) {
        (Some(env), _, _) => env.to_string(),
        (None, true, _) => "debug".to_string(),
        (None, false, Some(configured)) => configured.to_string(),
        (None, false, None) => DEFAULT_FILTER.to_string(),
    }
}

/// Installs the global subscriber. Log lines go to stderr so a JSON report on
/// stdout stays parseable.
pub fn init_logging(filter: &str, json: bool) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr))
            .with(filter)
            .init();
    }
}
