//! Per-target outcomes and the run report.

use std::fmt;

use serde::Serialize;

use crate::backup::BackupRecord;
use crate::dry_run::WriteEffect;
use crate::errors::TargetError;

#[cfg(test)]
#[path = "outcome_tests.rs"]
mod tests;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetKind {
    RelationalRow,
    TextWhole,
    TextAnchored,
    TextKeyValue,
    TextAggregate,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TargetKind::RelationalRow => "RELATIONAL_ROW",
            TargetKind::TextWhole => "TEXT_WHOLE",
            TargetKind::TextAnchored => "TEXT_ANCHORED",
            TargetKind::TextKeyValue => "TEXT_KEY_VALUE",
            TargetKind::TextAggregate => "TEXT_AGGREGATE",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeStatus {
    Applied,
    SkippedDryRun,
    Failed(String),
}

impl OutcomeStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, OutcomeStatus::Failed(_))
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeStatus::Applied => f.write_str("APPLIED"),
            OutcomeStatus::SkippedDryRun => f.write_str("SKIPPED_DRY_RUN"),
            OutcomeStatus::Failed(reason) => write!(f, "FAILED({reason})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetOutcome {
    pub target: String,
    pub kind: TargetKind,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl TargetOutcome {
    pub fn new(target: impl Into<String>, kind: TargetKind, status: OutcomeStatus) -> Self {
        Self {
            target: target.into(),
            kind,
            status,
        }
    }

    pub fn failed(target: impl Into<String>, kind: TargetKind, error: &TargetError) -> Self {
        Self::new(target, kind, OutcomeStatus::Failed(error.to_string()))
    }

    /// Outcome of a write that settles immediately, such as a file write.
    pub fn from_write(
        target: impl Into<String>,
        kind: TargetKind,
        result: Result<WriteEffect, TargetError>,
    ) -> Self {
        let status = match result {
            Ok(WriteEffect::Written) => OutcomeStatus::Applied,
            Ok(WriteEffect::Suppressed) => OutcomeStatus::SkippedDryRun,
            Err(e) => OutcomeStatus::Failed(e.to_string()),
        };
        Self::new(target, kind, status)
    }
}

impl fmt::Display for TargetOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.target, self.status)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeSummary {
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl fmt::Display for OutcomeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "applied: {}, skipped: {}, failed: {}",
            self.applied, self.skipped, self.failed
        )
    }
}

/// Everything a finished run has to say for itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub profile: String,
    pub dry_run: bool,
    pub outcomes: Vec<TargetOutcome>,
    pub backups: Vec<BackupRecord>,
}

impl RunReport {
    pub fn summary(&self) -> OutcomeSummary {
        self.outcomes
            .iter()
            .fold(OutcomeSummary::default(), |mut summary, outcome| {
                match outcome.status {
                    OutcomeStatus::Applied => summary.applied += 1,
                    OutcomeStatus::SkippedDryRun => summary.skipped += 1,
                    OutcomeStatus::Failed(_) => summary.failed += 1,
                }
                summary
            })
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|outcome| outcome.status.is_failure())
    }

    /// Process exit status: zero only when no target failed.
    pub fn exit_code(&self) -> i32 {
        if self.has_failures() {
            1
        } else {
            0
        }
    }
}
