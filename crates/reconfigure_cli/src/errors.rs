use reconfigure_core::PreflightError;
use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that end a `reconfigure` invocation.
#[derive(Error, Debug)]
pub enum Error {
    /// The settings file could not be found, read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The command line, combined with the settings defaults, is incomplete.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Validation failed and nothing was changed.
    #[error("Pre-flight validation failed: {0}")]
    Preflight(#[from] PreflightError),

    /// The run completed but some targets failed.
    #[error("{failed} target(s) failed")]
    TargetsFailed { failed: usize },

    #[error("Failed to write the run report: {0}")]
    Report(String),
}

impl Error {
    /// Process exit status for this error.
    ///
    /// Usage problems exit with 2, everything that stops or spoils a run
    /// with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) | Error::InvalidArguments(_) => 2,
            Error::Preflight(_) | Error::TargetsFailed { .. } | Error::Report(_) => 1,
        }
    }
}
