//! Integration testing library for reconfigure.
//!
//! Scenarios assemble a complete, throwaway deployment (install tree or
//! repositories file, seeded SQLite catalog, canonical configuration) and
//! hand back the settings to run against it.

pub mod scenarios;

pub use scenarios::{init_test_logging, PlatformScenario, RepositoryScenario, RUN_TIMESTAMP};
