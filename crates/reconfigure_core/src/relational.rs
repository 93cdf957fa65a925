//! Applies configuration sections to catalog rows inside one session.

use canonical_config::Section;
use tracing::{debug, warn};

use crate::catalog::{CatalogRepository, ColumnKind, ColumnSpec, ColumnValue, SessionEnd, TableSpec};
use crate::dry_run::DryRunPolicy;
use crate::errors::TargetError;
use crate::outcome::{OutcomeStatus, TargetKind, TargetOutcome};

#[cfg(test)]
#[path = "relational_tests.rs"]
mod tests;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileMode {
    /// Update only the columns the section supplies on an existing row.
    /// A row that does not exist is a failure, never an insert.
    Patch,
    /// Delete every row of the table, then insert one row per section.
    /// Nothing is deleted unless every row is valid and there is at least one.
    Replace,
}

/// One row the configuration wants in a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredRow {
    /// Value of the table's key column.
    pub name: String,
    pub section: Section,
}

impl DesiredRow {
    pub fn new(name: impl Into<String>, section: Section) -> Self {
        Self {
            name: name.into(),
            section,
        }
    }
}

/// Result of issuing one row's writes. Whether those writes persist is only
/// known once the session is finished.
#[derive(Debug)]
pub struct RowOutcome {
    pub name: String,
    pub result: Result<(), TargetError>,
}

/// Drives the row writes of a run against one repository session.
///
/// Rows are independent: a failed row does not stop the others. Once an
/// error shows the session itself is gone, every later row fails with
/// [`TargetError::SessionUnavailable`] without touching the repository.
pub struct RelationalReconciler<'a> {
    repository: &'a mut dyn CatalogRepository,
    policy: DryRunPolicy,
    lost: Option<String>,
}

impl<'a> RelationalReconciler<'a> {
    pub fn new(repository: &'a mut dyn CatalogRepository, policy: DryRunPolicy) -> Self {
        Self {
            repository,
            policy,
            lost: None,
        }
    }

    pub fn reconcile(
        &mut self,
        table: &TableSpec,
        mode: ReconcileMode,
        rows: &[DesiredRow],
    ) -> Vec<RowOutcome> {
        if mode == ReconcileMode::Replace {
            if let Some(rejected) = check_replacement(table, rows) {
                return rejected;
            }
        }

        if mode == ReconcileMode::Replace && self.lost.is_none() {
            match self.repository.delete_all_rows(table) {
                Ok(removed) => debug!(table = table.table, removed, "Table cleared for replacement"),
                Err(e) => {
                    warn!(table = table.table, error = %e, "Failed to clear table");
                    let reason = e.to_string();
                    if e.is_connection_loss() {
                        self.lost = Some(reason.clone());
                    }
                    return rows
                        .iter()
                        .map(|row| RowOutcome {
                            name: row.name.clone(),
                            result: Err(TargetError::Repository(e.clone())),
                        })
                        .collect();
                }
            }
        }

        rows.iter()
            .map(|row| {
                let result = match self.lost.clone() {
                    Some(reason) => Err(TargetError::SessionUnavailable { reason }),
                    None => self.write_row(table, mode, row),
                };

                if let Err(TargetError::Repository(e)) = &result {
                    if e.is_connection_loss() {
                        warn!(table = table.table, row = %row.name, error = %e, "Catalog session lost");
                        self.lost = Some(e.to_string());
                    }
                }

                RowOutcome {
                    name: row.name.clone(),
                    result,
                }
            })
            .collect()
    }

    fn write_row(
        &mut self,
        table: &TableSpec,
        mode: ReconcileMode,
        row: &DesiredRow,
    ) -> Result<(), TargetError> {
        let values = column_values(table, &row.section)?;

        if mode == ReconcileMode::Patch
            && !self.repository.row_exists(table, &row.name)?
        {
            return Err(TargetError::RowMissing {
                table: table.table.to_string(),
                name: row.name.clone(),
            });
        }

        self.repository.upsert_row(table, &row.name, &values)?;
        debug!(table = table.table, row = %row.name, columns = values.len(), "Row written");
        Ok(())
    }

    /// Ends the session and settles the status of every row.
    ///
    /// Applying commits; a failed commit turns every written row into a
    /// failure. A dry run rolls back and reports written rows as skipped.
    pub fn finish(mut self, rows: Vec<RowOutcome>) -> Vec<TargetOutcome> {
        let commit_failure = if self.policy.permits_writes() {
            match &self.lost {
                Some(reason) => Some(reason.clone()),
                None => self
                    .repository
                    .finish(SessionEnd::Commit)
                    .err()
                    .map(|e| e.to_string()),
            }
        } else {
            if self.lost.is_none() {
                if let Err(e) = self.repository.finish(SessionEnd::Rollback) {
                    warn!(error = %e, "Rollback of dry-run session failed");
                }
            }
            None
        };

        rows.into_iter()
            .map(|row| {
                let status = match row.result {
                    Err(e) => OutcomeStatus::Failed(e.to_string()),
                    Ok(()) if self.policy.is_dry_run() => OutcomeStatus::SkippedDryRun,
                    Ok(()) => match &commit_failure {
                        Some(reason) => OutcomeStatus::Failed(
                            TargetError::Commit {
                                reason: reason.clone(),
                            }
                            .to_string(),
                        ),
                        None => OutcomeStatus::Applied,
                    },
                };
                TargetOutcome::new(row.name, TargetKind::RelationalRow, status)
            })
            .collect()
    }
}

/// A replacement clears the table, so it only goes ahead when there is at
/// least one row and every row can be written. Otherwise the rows fail and
/// the table is not touched.
fn check_replacement(table: &TableSpec, rows: &[DesiredRow]) -> Option<Vec<RowOutcome>> {
    if rows.is_empty() {
        warn!(table = table.table, "Refusing to replace table with no rows");
        return Some(vec![RowOutcome {
            name: table.table.to_string(),
            result: Err(TargetError::EmptyReplace {
                table: table.table.to_string(),
            }),
        }]);
    }

    let errors: Vec<Option<TargetError>> = rows
        .iter()
        .map(|row| column_values(table, &row.section).err())
        .collect();
    if errors.iter().all(Option::is_none) {
        return None;
    }

    warn!(table = table.table, "Replacement abandoned, table left unchanged");
    Some(
        rows.iter()
            .zip(errors)
            .map(|(row, error)| RowOutcome {
                name: row.name.clone(),
                result: Err(error.unwrap_or_else(|| TargetError::ReplaceAbandoned {
                    table: table.table.to_string(),
                })),
            })
            .collect(),
    )
}

/// Maps the section onto the table's columns, encoding credentials and
/// coercing typed columns. Keys without a column are ignored.
pub fn column_values(
    table: &TableSpec,
    section: &Section,
) -> Result<Vec<(&'static str, ColumnValue)>, TargetError> {
    for key in section.keys() {
        if table.column_for_key(key).is_none() {
            debug!(table = table.table, key, "Key has no column");
        }
    }

    table
        .columns
        .iter()
        .filter_map(|spec| section.get(spec.key).map(|value| (spec, value)))
        .map(|(spec, value)| Ok((spec.column, coerce(table, spec, value)?)))
        .collect()
}

fn coerce(table: &TableSpec, spec: &ColumnSpec, value: &str) -> Result<ColumnValue, TargetError> {
    let invalid = |expected: &'static str| TargetError::InvalidColumnValue {
        table: table.table.to_string(),
        column: spec.column.to_string(),
        value: value.to_string(),
        expected,
    };

    match spec.kind {
        ColumnKind::Text => Ok(ColumnValue::Text(match spec.credential {
            Some(encoding) => encoding.encode(value),
            None => value.to_string(),
        })),
        ColumnKind::Integer => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Ok(ColumnValue::Null);
            }
            trimmed
                .parse::<i64>()
                .map(ColumnValue::Integer)
                .map_err(|_| invalid("integer"))
        }
        ColumnKind::Flag => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(ColumnValue::Integer(1)),
            "0" | "false" | "no" | "off" => Ok(ColumnValue::Integer(0)),
            _ => Err(invalid("flag")),
        },
    }
}
