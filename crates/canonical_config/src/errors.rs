//! Canonical configuration error types.

use std::path::PathBuf;

use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors raised while reading a canonical configuration source.
///
/// Every variant is fatal for a run: a configuration that cannot be parsed
/// stops the reconciliation before any target is touched.
#[derive(Error, Debug)]
pub enum ConfigParseError {
    #[error("Failed to read configuration source {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration source contains no sections")]
    NoSections,

    #[error("Line {line}: key/value entry appears before any section header")]
    MissingSectionHeader { line: usize },

    #[error("Line {line}: cannot parse '{content}'")]
    MalformedLine { line: usize, content: String },

    #[error("Line {line}: section '{name}' is declared more than once")]
    DuplicateSection { name: String, line: usize },

    #[error("Line {line}: section header has an empty name")]
    EmptySectionName { line: usize },
}

/// Result type alias for canonical configuration operations.
pub type ConfigParseResult<T> = Result<T, ConfigParseError>;
