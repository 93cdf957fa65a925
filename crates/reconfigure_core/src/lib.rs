//! # Reconfigure Core
//!
//! This crate reconciles a deployed installation with a canonical
//! configuration. A run reads one INI-style configuration, validates that
//! every target it names can be reached, snapshots the files it is about to
//! change, and then brings each target in line with its section:
//!
//! 1. Catalog rows, patched or replaced inside one relational session
//! 2. Text files, rendered by one of the four fragment renderers
//! 3. Metadata models found in the installation tree
//!
//! Each target ends the run as `APPLIED`, `SKIPPED_DRY_RUN` or
//! `FAILED(reason)`, collected in a [`RunReport`].
//!
//! ## Examples
//!
//! ```no_run
//! use reconfigure_core::{DryRunPolicy, Profile, ReconciliationDriver, RunSettings};
//!
//! let settings = RunSettings::new(Profile::Repository, "/etc/reconfigure/kettle.cfg")
//!     .with_policy(DryRunPolicy::DryRun);
//!
//! let mut driver = ReconciliationDriver::new(settings);
//! match driver.run() {
//!     Ok(report) => {
//!         for outcome in &report.outcomes {
//!             println!("{outcome}");
//!         }
//!         std::process::exit(report.exit_code());
//!     }
//!     Err(e) => eprintln!("Nothing was changed: {e}"),
//! }
//! ```
//!
//! ## Architecture
//!
//! Catalog access goes through the [`CatalogRepository`] trait. The driver
//! opens it with a [`CatalogConnector`], which defaults to SQLite; tests
//! substitute [`InMemoryCatalog`] or a failing connector.

pub mod backup;
pub mod catalog;
pub mod credentials;
pub mod discovery;
pub mod driver;
pub mod dry_run;
pub mod errors;
pub mod memory_catalog;
pub mod outcome;
pub mod paths;
pub mod registry;
pub mod relational;
pub mod sqlite_catalog;
pub mod text_target;

pub use backup::{run_timestamp, BackupManager, BackupRecord, BACKUP_TIMESTAMP_FORMAT};
pub use catalog::{
    CatalogRepository, CatalogRow, ColumnKind, ColumnSpec, ColumnValue, SessionEnd, TableSpec,
    DATASOURCE, R_DATABASE, USERS,
};
pub use credentials::{CredentialEncoding, KETTLE_PREFIX};
pub use discovery::{discover_metadata, MetadataTarget};
pub use driver::{CatalogConnector, ReconciliationDriver, RunPhase, RunSettings, SqliteConnector};
pub use dry_run::{DryRunPolicy, WriteEffect};
pub use errors::{PreflightError, RepositoryError, TargetError};
pub use memory_catalog::InMemoryCatalog;
pub use outcome::{OutcomeStatus, OutcomeSummary, RunReport, TargetKind, TargetOutcome};
pub use paths::expand_home;
pub use registry::{Profile, TargetClass, TargetDescriptor};
pub use relational::{DesiredRow, ReconcileMode, RelationalReconciler, RowOutcome};
pub use sqlite_catalog::SqliteCatalog;
pub use text_target::TextTargetWriter;
