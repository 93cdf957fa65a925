//! Test utilities for unit, integration and end-to-end tests.
//!
//! This crate provides the shared fixtures the reconfiguration tests run
//! against: an installation tree laid out like a BI platform install, SQLite
//! catalogs seeded with known rows, and canonical configuration texts that
//! target both.

pub mod catalog;
pub mod config;
pub mod install;

pub use catalog::{count_rows, create_kettle_catalog, create_platform_catalog, read_row, sqlite_url};
pub use config::{platform_config, repository_config, write_config, ConfigBuilder};
pub use install::{InstallTree, PLATFORM_FILES, REPOSITORIES_XML, XMI_MODEL};
