//! The single switch that decides whether mutations are committed.

use serde::Serialize;

#[cfg(test)]
#[path = "dry_run_tests.rs"]
mod tests;

/// Whether a run persists its mutations.
///
/// Every component that writes (backups, text targets, the relational
/// session) is handed the same policy, so a dry run exercises the full
/// pipeline but leaves files and rows exactly as they were.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DryRunPolicy {
    Apply,
    DryRun,
}

impl DryRunPolicy {
    pub fn from_flag(dry_run: bool) -> Self {
        if dry_run {
            DryRunPolicy::DryRun
        } else {
            DryRunPolicy::Apply
        }
    }

    pub fn permits_writes(self) -> bool {
        self == DryRunPolicy::Apply
    }

    pub fn is_dry_run(self) -> bool {
        self == DryRunPolicy::DryRun
    }
}

/// What a gated writer actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteEffect {
    Written,
    /// Rendering succeeded but the write was withheld by the policy.
    Suppressed,
}
