//! Settings file for the `reconfigure` CLI.
//!
//! The settings file is optional TOML. It supplies defaults for arguments the
//! command line leaves out, the log filter, and the report format:
//!
//! ```toml
//! [defaults]
//! cfg = "~/reconfigure/platform.cfg"
//! base = "/opt/pentaho/biserver-ce"
//!
//! [logging]
//! filter = "reconfigure_core=debug"
//! json = false
//!
//! [report]
//! format = "json"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::Error;

/// Settings file looked up in the current directory when `--settings` is absent.
pub const DEFAULT_CONFIG_FILENAME: &str = "reconfigure.toml";

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

/// Fallbacks for `--cfg` and `--base`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    pub cfg: Option<String>,
    pub base: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive such as `info` or `reconfigure_core=debug`.
    pub filter: Option<String>,

    /// Emit log lines as JSON objects.
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub format: ReportFormat,
}

/// How the run report is printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// One colored line per target followed by the summary.
    #[default]
    Text,
    /// The full run report as JSON.
    Json,
}

impl AppConfig {
    /// Loads the settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file does not exist, cannot be read,
    /// or does not match the settings schema.
    pub fn load(path: &Path) -> Result<Self, Error> {
        debug!(path = ?path, "Loading settings");

        if !path.exists() {
            return Err(Error::Config(format!(
                "Settings file not found: {:?}",
                path
            )));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read settings file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse settings file: {}", e)))
    }

    /// Loads the explicitly named settings file, or the default one if it
    /// exists.
    ///
    /// A missing file at the default location yields the default settings;
    /// a missing explicit file is an error.
    pub fn load_or_default(explicit: Option<&str>) -> Result<Self, Error> {
        let path = get_config_path(explicit);
        if explicit.is_none() && !path.exists() {
            debug!(path = ?path, "No settings file, using defaults");
            return Ok(Self::default());
        }
        Self::load(&path)
    }
}

/// Resolves the settings file path: the given one, or
/// [`DEFAULT_CONFIG_FILENAME`] in the current directory.
pub fn get_config_path(config_path: Option<&str>) -> PathBuf {
    if let Some(path) = config_path {
        PathBuf::from(path)
    } else {
        let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        current_dir.join(DEFAULT_CONFIG_FILENAME)
    }
}
