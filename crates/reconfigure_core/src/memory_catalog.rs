//! An in-process catalog with the same session semantics as a database.

use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::{CatalogRepository, CatalogRow, ColumnValue, SessionEnd, TableSpec};
use crate::errors::RepositoryError;

#[cfg(test)]
#[path = "memory_catalog_tests.rs"]
mod tests;

type Tables = BTreeMap<String, BTreeMap<String, CatalogRow>>;

/// Keeps committed rows and a staged copy for the open session.
///
/// Writes go to the staged copy and only replace the committed rows on
/// [`SessionEnd::Commit`]. Failures can be injected per row name to drive
/// error paths in tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    committed: Tables,
    staged: Option<Tables>,
    failing_rows: BTreeMap<String, RepositoryError>,
    fail_commit: Option<RepositoryError>,
    finished: Option<SessionEnd>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: &TableSpec) -> Self {
        self.committed.entry(table.table.to_string()).or_default();
        self
    }

    pub fn with_row<'a>(
        mut self,
        table: &TableSpec,
        name: &str,
        values: impl IntoIterator<Item = (&'a str, ColumnValue)>,
    ) -> Self {
        let row = values
            .into_iter()
            .map(|(column, value)| (column.to_string(), value))
            .collect();
        self.committed
            .entry(table.table.to_string())
            .or_default()
            .insert(name.to_string(), row);
        self
    }

    /// Every write touching the row `name` fails with `error`.
    pub fn failing_row(mut self, name: &str, error: RepositoryError) -> Self {
        self.failing_rows.insert(name.to_string(), error);
        self
    }

    pub fn failing_commit(mut self, error: RepositoryError) -> Self {
        self.fail_commit = Some(error);
        self
    }

    /// Committed state of one row.
    pub fn row(&self, table: &TableSpec, name: &str) -> Option<&CatalogRow> {
        self.committed.get(table.table)?.get(name)
    }

    /// Committed row names of a table, in key order.
    pub fn row_names(&self, table: &TableSpec) -> Vec<String> {
        self.committed
            .get(table.table)
            .map(|rows| rows.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn finished(&self) -> Option<SessionEnd> {
        self.finished
    }

    fn current(&self) -> &Tables {
        self.staged.as_ref().unwrap_or(&self.committed)
    }

    fn staged_table(
        &mut self,
        table: &TableSpec,
    ) -> Result<&mut BTreeMap<String, CatalogRow>, RepositoryError> {
        let committed = &self.committed;
        self.staged
            .get_or_insert_with(|| committed.clone())
            .get_mut(table.table)
            .ok_or_else(|| RepositoryError::Statement(format!("no such table: {}", table.table)))
    }
}

impl CatalogRepository for InMemoryCatalog {
    fn table_exists(&mut self, table: &TableSpec) -> Result<bool, RepositoryError> {
        Ok(self.current().contains_key(table.table))
    }

    fn find_row_by_name(
        &mut self,
        table: &TableSpec,
        name: &str,
    ) -> Result<Option<CatalogRow>, RepositoryError> {
        let rows = self
            .current()
            .get(table.table)
            .ok_or_else(|| RepositoryError::Statement(format!("no such table: {}", table.table)))?;
        Ok(rows.get(name).cloned())
    }

    fn row_exists(&mut self, table: &TableSpec, name: &str) -> Result<bool, RepositoryError> {
        Ok(self.find_row_by_name(table, name)?.is_some())
    }

    fn upsert_row(
        &mut self,
        table: &TableSpec,
        name: &str,
        values: &[(&'static str, ColumnValue)],
    ) -> Result<(), RepositoryError> {
        if let Some(error) = self.failing_rows.get(name) {
            return Err(error.clone());
        }

        let row = self.staged_table(table)?.entry(name.to_string()).or_default();
        for (column, value) in values {
            row.insert(column.to_string(), value.clone());
        }
        Ok(())
    }

    fn delete_all_rows(&mut self, table: &TableSpec) -> Result<usize, RepositoryError> {
        let rows = self.staged_table(table)?;
        let removed = rows.len();
        rows.clear();
        Ok(removed)
    }

    fn finish(&mut self, end: SessionEnd) -> Result<(), RepositoryError> {
        let staged = self.staged.take();
        self.finished = Some(end);
        match end {
            SessionEnd::Rollback => Ok(()),
            SessionEnd::Commit => {
                if let Some(error) = self.fail_commit.clone() {
                    return Err(error);
                }
                if let Some(staged) = staged {
                    self.committed = staged;
                }
                Ok(())
            }
        }
    }
}

/// Builds an empty catalog holding the given tables.
impl FromIterator<TableSpec> for InMemoryCatalog {
    fn from_iter<I: IntoIterator<Item = TableSpec>>(iter: I) -> Self {
        let tables: BTreeSet<&'static str> = iter.into_iter().map(|spec| spec.table).collect();
        Self {
            committed: tables
                .into_iter()
                .map(|table| (table.to_string(), BTreeMap::new()))
                .collect(),
            ..Self::default()
        }
    }
}
