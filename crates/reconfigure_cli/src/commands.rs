//! Command modules for the Reconfigure CLI.
//!
//! - `platform_cmd`: reconcile a BI platform install and its catalog
//! - `repository_cmd`: reconcile an ETL repository file and its catalog

use std::io::Write;

use clap::Args;
use reconfigure_core::{
    DryRunPolicy, ReconciliationDriver, RunReport, RunSettings, TargetClass,
};
use tracing::{info, instrument};

use crate::config::ReportFormat;
use crate::errors::Error;
use crate::report::write_report;

pub mod platform_cmd;
pub mod repository_cmd;

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;

/// Flags shared by both profiles.
#[derive(Args, Debug, Clone, Default)]
pub struct RunOptions {
    /// Validate and render everything but write nothing
    #[arg(short, long)]
    pub test: bool,

    /// Log at debug level
    #[arg(short, long)]
    pub debug: bool,

    /// Reconcile only one class of targets: metadata, files or relational
    #[arg(long, value_name = "CLASS")]
    pub only: Option<TargetClass>,
}

impl RunOptions {
    pub fn apply_to(&self, settings: RunSettings) -> RunSettings {
        settings
            .with_policy(DryRunPolicy::from_flag(self.test))
            .with_only(self.only)
    }
}

/// Runs the reconciliation, prints the report and turns failed targets into
/// an error.
#[instrument(skip(out))]
pub fn execute(
    settings: RunSettings,
    format: ReportFormat,
    out: &mut dyn Write,
) -> Result<RunReport, Error> {
    let mut driver = ReconciliationDriver::new(settings);
    let report = driver.run()?;

    write_report(&report, format, out)?;

    let failed = report.summary().failed;
    if failed > 0 {
        return Err(Error::TargetsFailed { failed });
    }
    info!(profile = %report.profile, "All targets reconciled");
    Ok(report)
}
