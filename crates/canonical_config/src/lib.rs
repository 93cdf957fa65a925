//! Canonical configuration for reconfigure
//!
//! The canonical configuration is the single, operator-authored description of
//! the environment values for one run. It is an INI-style document:
//!
//! ```text
//! [CONNECTION]
//! db: sqlite:///var/lib/etl/repository.db
//!
//! [DB1]
//! host_name: localhost
//! port: 3306
//!
//! [tomcat]
//! xml: <Context path="/pentaho">
//!     <Resource name="jdbc/Hibernate" />
//!     </Context>
//! ```
//!
//! Section names keep their case, keys are lower-cased, and indented lines
//! continue the previous value. This crate only parses; it knows nothing about
//! the targets the values end up in.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use tracing::debug;

pub mod errors;
mod parser;
pub mod section;

pub use errors::{ConfigParseError, ConfigParseResult};
pub use section::Section;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Name of the reserved section that carries the relational connection.
pub const CONNECTION_SECTION: &str = "CONNECTION";

/// Ordered mapping of section name to [`Section`].
///
/// Built once per run. The only mutation after parsing is the removal of
/// reserved sections through [`CanonicalConfig::take_section`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalConfig {
    sections: IndexMap<String, Section>,
}

impl CanonicalConfig {
    /// Reads and parses a canonical configuration file.
    pub fn read(path: &Path) -> ConfigParseResult<Self> {
        debug!(path = ?path, "Reading canonical configuration");

        let text = fs::read_to_string(path).map_err(|source| ConfigParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&text)
    }

    /// Parses canonical configuration text.
    pub fn parse(text: &str) -> ConfigParseResult<Self> {
        let sections = parser::parse_sections(text)?;
        debug!(sections = sections.len(), "Canonical configuration parsed");
        Ok(Self { sections })
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    pub fn contains_section(&self, name: &str) -> bool {
        self.sections.contains_key(name)
    }

    /// Removes a section, keeping the order of those that remain.
    pub fn take_section(&mut self, name: &str) -> Option<Section> {
        self.sections.shift_remove(name)
    }

    /// Section names in source order.
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Iterates over `(name, section)` pairs in source order.
    pub fn sections(&self) -> impl Iterator<Item = (&str, &Section)> {
        self.sections.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Serializes the configuration back to INI text.
    ///
    /// `CanonicalConfig::parse(&config.to_ini_string())` yields a configuration
    /// equal to `config`, with the same section and key order.
    pub fn to_ini_string(&self) -> String {
        parser::render_sections(&self.sections)
    }
}
