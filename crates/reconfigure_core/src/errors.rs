//! Error types for the reconciliation engine.
//!
//! Errors are split by when they can happen. [`PreflightError`] stops a run
//! before anything is mutated. [`TargetError`] fails a single target or row
//! while the run carries on with the others.

use std::io;
use std::path::PathBuf;

use canonical_config::ConfigParseError;
use fragment_renderer::RenderError;
use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Fatal validation failures. Nothing has been backed up or written when one
/// of these is returned.
#[derive(Error, Debug)]
pub enum PreflightError {
    #[error("Configuration file not found: {path:?}")]
    ConfigFileNotFound { path: PathBuf },

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] ConfigParseError),

    #[error("Configuration has no [{section}] section")]
    MissingConnection { section: String },

    #[error("[{section}] section is missing required key '{key}'")]
    MissingConnectionKey { section: String, key: String },

    #[error("An install directory is required for the {profile} profile")]
    InstallRootRequired { profile: String },

    #[error("Install directory not found: {path:?}")]
    InstallRootNotFound { path: PathBuf },

    #[error("Install directory {path:?} does not contain {expected}")]
    InstallLayoutInvalid { path: PathBuf, expected: String },

    #[error("Target '{target}' not found at {location}")]
    TargetMissing { target: String, location: String },

    #[error("Target '{target}' has no [{section}] section in the configuration")]
    SectionMissing { target: String, section: String },

    #[error("Target '{target}' refers to catalog table {table}, which does not exist")]
    TableMissing { target: String, table: String },

    #[error("Catalog check failed: {0}")]
    Catalog(#[from] RepositoryError),
}

/// Failure of a single target or row during the apply phase.
///
/// The Display text of these errors is what ends up in `FAILED(reason)`.
#[derive(Error, Debug)]
pub enum TargetError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Backup of {path:?} failed: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Row '{name}' does not exist in {table}")]
    RowMissing { table: String, name: String },

    #[error("Section [{section}] has no '{field}' to identify its {table} row")]
    RowKeyMissing {
        table: String,
        section: String,
        field: String,
    },

    #[error("Value '{value}' for {table}.{column} is not a valid {expected}")]
    InvalidColumnValue {
        table: String,
        column: String,
        value: String,
        expected: &'static str,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Relational session unavailable: {reason}")]
    SessionUnavailable { reason: String },

    #[error("Commit of the relational session failed: {reason}")]
    Commit { reason: String },

    #[error("Replacement of {table} abandoned because another row is invalid; table left unchanged")]
    ReplaceAbandoned { table: String },

    #[error("No rows configured to replace {table}; table left unchanged")]
    EmptyReplace { table: String },
}

/// Errors reported by a catalog repository.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// The session itself is gone. No further statement can succeed.
    #[error("Catalog connection failed: {0}")]
    Connection(String),

    /// A single statement failed; the session is still usable.
    #[error("Catalog statement failed: {0}")]
    Statement(String),

    #[error("Unsupported catalog URL scheme '{0}', expected 'sqlite'")]
    UnsupportedScheme(String),

    /// The URL is not repeated in the message since it may carry credentials.
    #[error("Invalid catalog URL: {reason}")]
    InvalidUrl { reason: String },
}

impl RepositoryError {
    /// Whether the error means the shared session can no longer be used.
    pub fn is_connection_loss(&self) -> bool {
        matches!(
            self,
            RepositoryError::Connection(_)
                | RepositoryError::UnsupportedScheme(_)
                | RepositoryError::InvalidUrl { .. }
        )
    }
}
