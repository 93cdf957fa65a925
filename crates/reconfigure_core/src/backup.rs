//! Timestamped snapshots of files before they are modified.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{debug, info};

use crate::dry_run::DryRunPolicy;

#[cfg(test)]
#[path = "backup_tests.rs"]
mod tests;

/// Suffix format appended to snapshot file names, e.g. `2024.03.07-142501`.
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y.%m.%d-%H%M%S";

/// Formats the run start time the way snapshot suffixes expect it.
pub fn run_timestamp(started: DateTime<Local>) -> String {
    started.format(BACKUP_TIMESTAMP_FORMAT).to_string()
}

/// A snapshot taken (or, in a dry run, planned) for one original file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupRecord {
    pub original_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub timestamp: String,
    /// `false` when the dry-run policy withheld the copy.
    pub written: bool,
}

/// Takes at most one snapshot per file per run.
///
/// Snapshots sit next to the original as `<original>.<timestamp>` and are
/// created exclusively, so an existing file at that path is never replaced.
#[derive(Debug)]
pub struct BackupManager {
    policy: DryRunPolicy,
    timestamp: String,
    records: Vec<BackupRecord>,
    seen: HashMap<PathBuf, usize>,
}

impl BackupManager {
    pub fn new(policy: DryRunPolicy, timestamp: impl Into<String>) -> Self {
        Self {
            policy,
            timestamp: timestamp.into(),
            records: Vec::new(),
            seen: HashMap::new(),
        }
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn snapshot_path_for(&self, original: &Path) -> PathBuf {
        let mut name = OsString::from(original.as_os_str());
        name.push(".");
        name.push(&self.timestamp);
        PathBuf::from(name)
    }

    /// Snapshots `original` unless it was already snapshotted in this run,
    /// in which case the first record is returned and nothing is copied.
    pub fn snapshot(&mut self, original: &Path) -> io::Result<BackupRecord> {
        let key = fs::canonicalize(original)?;
        if let Some(&index) = self.seen.get(&key) {
            debug!(path = ?original, "File already backed up in this run");
            return Ok(self.records[index].clone());
        }

        let metadata = fs::metadata(original)?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", original.display()),
            ));
        }

        let snapshot_path = self.snapshot_path_for(original);
        let mut source = File::open(original)?;

        let written = if self.policy.permits_writes() {
            let mut target = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&snapshot_path)?;
            io::copy(&mut source, &mut target)?;
            target.sync_all()?;
            info!(original = ?original, snapshot = ?snapshot_path, "Backup created");
            true
        } else {
            debug!(original = ?original, snapshot = ?snapshot_path, "Dry run, backup not written");
            false
        };

        let record = BackupRecord {
            original_path: original.to_path_buf(),
            snapshot_path,
            timestamp: self.timestamp.clone(),
            written,
        };
        self.seen.insert(key, self.records.len());
        self.records.push(record.clone());
        Ok(record)
    }

    pub fn records(&self) -> &[BackupRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<BackupRecord> {
        self.records
    }
}
