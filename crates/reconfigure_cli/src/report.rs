//! Printing of the run report.

use std::io::{self, Write};

use colored::{ColoredString, Colorize};
use reconfigure_core::{OutcomeStatus, RunReport, TargetOutcome};

use crate::config::ReportFormat;
use crate::errors::Error;

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;

pub fn write_report(report: &RunReport, format: ReportFormat, out: &mut dyn Write) -> Result<(), Error> {
    match format {
        ReportFormat::Text => write_text(report, out).map_err(|e| Error::Report(e.to_string())),
        ReportFormat::Json => write_json(report, out).map_err(|e| Error::Report(e.to_string())),
    }
}

/// One line per target, then the summary.
pub fn write_text(report: &RunReport, out: &mut dyn Write) -> io::Result<()> {
    if report.dry_run {
        writeln!(out, "{}", "Dry run: no file or row was changed".yellow())?;
    }
    for outcome in &report.outcomes {
        writeln!(out, "{}", status_line(outcome))?;
    }
    for backup in report.backups.iter().filter(|backup| backup.written) {
        writeln!(
            out,
            "Backed up {} to {}",
            backup.original_path.display(),
            backup.snapshot_path.display()
        )?;
    }
    writeln!(out, "{}", report.summary())
}

pub fn write_json(report: &RunReport, out: &mut dyn Write) -> serde_json::Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out).map_err(serde_json::Error::io)
}

pub fn status_line(outcome: &TargetOutcome) -> String {
    format!(
        "[{}] {}: {}",
        outcome.kind,
        outcome.target,
        status_label(&outcome.status)
    )
}

fn status_label(status: &OutcomeStatus) -> ColoredString {
    let label = status.to_string();
    match status {
        OutcomeStatus::Applied => label.green(),
        OutcomeStatus::SkippedDryRun => label.yellow(),
        OutcomeStatus::Failed(_) => label.red().bold(),
    }
}
