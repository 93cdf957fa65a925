//! SQLite-backed catalog repository.

use std::path::{Path, PathBuf};

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OpenFlags, OptionalExtension};
use tracing::{debug, info};
use url::Url;

use crate::catalog::{CatalogRepository, CatalogRow, ColumnValue, SessionEnd, TableSpec};
use crate::errors::RepositoryError;

#[cfg(test)]
#[path = "sqlite_catalog_tests.rs"]
mod tests;

const SCHEME: &str = "sqlite";

/// A catalog stored in an existing SQLite database file.
///
/// The whole run shares one transaction, opened by [`SqliteCatalog::open`]
/// and ended by [`CatalogRepository::finish`]. Dropping the catalog without
/// finishing rolls the transaction back.
#[derive(Debug)]
pub struct SqliteCatalog {
    conn: Connection,
    path: PathBuf,
    in_session: bool,
}

impl SqliteCatalog {
    /// Opens the database named by a `sqlite:` URL, e.g.
    /// `sqlite:///var/lib/etl/repository.db`, and begins the session.
    ///
    /// The database file must already exist.
    pub fn open(url: &str) -> Result<Self, RepositoryError> {
        let path = database_path(url)?;
        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(classify)?;

        // Touch the schema so a file that is not a database fails here.
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(classify)?;
        conn.execute_batch("BEGIN").map_err(classify)?;

        info!(path = ?path, "Catalog session opened");
        Ok(Self {
            conn,
            path,
            in_session: true,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogRepository for SqliteCatalog {
    fn table_exists(&mut self, table: &TableSpec) -> Result<bool, RepositoryError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
                params![table.table],
                |_| Ok(()),
            )
            .optional()
            .map_err(classify)?;
        Ok(found.is_some())
    }

    fn find_row_by_name(
        &mut self,
        table: &TableSpec,
        name: &str,
    ) -> Result<Option<CatalogRow>, RepositoryError> {
        let columns: Vec<&str> = table.columns.iter().map(|spec| spec.column).collect();
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            std::iter::once(table.key_column)
                .chain(columns.iter().copied())
                .map(quote)
                .collect::<Vec<_>>()
                .join(", "),
            quote(table.table),
            quote(table.key_column),
        );

        self.conn
            .query_row(&sql, params![name], |row| {
                let mut values = CatalogRow::new();
                for (index, column) in std::iter::once(table.key_column)
                    .chain(columns.iter().copied())
                    .enumerate()
                {
                    let value: Value = row.get(index)?;
                    values.insert(column.to_string(), from_sql(value));
                }
                Ok(values)
            })
            .optional()
            .map_err(classify)
    }

    fn row_exists(&mut self, table: &TableSpec, name: &str) -> Result<bool, RepositoryError> {
        let sql = format!(
            "SELECT 1 FROM {} WHERE {} = ?1",
            quote(table.table),
            quote(table.key_column),
        );
        let found = self
            .conn
            .query_row(&sql, params![name], |_| Ok(()))
            .optional()
            .map_err(classify)?;
        Ok(found.is_some())
    }

    fn upsert_row(
        &mut self,
        table: &TableSpec,
        name: &str,
        values: &[(&'static str, ColumnValue)],
    ) -> Result<(), RepositoryError> {
        let mut sql_params: Vec<Value> = values.iter().map(|(_, value)| to_sql(value)).collect();
        sql_params.push(Value::Text(name.to_string()));

        let updated = if values.is_empty() {
            usize::from(self.row_exists(table, name)?)
        } else {
            let assignments = values
                .iter()
                .enumerate()
                .map(|(index, (column, _))| format!("{} = ?{}", quote(column), index + 1))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "UPDATE {} SET {} WHERE {} = ?{}",
                quote(table.table),
                assignments,
                quote(table.key_column),
                values.len() + 1,
            );
            self.conn
                .execute(&sql, params_from_iter(sql_params.iter()))
                .map_err(classify)?
        };

        if updated == 0 {
            let columns = values
                .iter()
                .map(|(column, _)| quote(column))
                .chain(std::iter::once(quote(table.key_column)))
                .collect::<Vec<_>>();
            let placeholders = (1..=columns.len())
                .map(|index| format!("?{index}"))
                .collect::<Vec<_>>();
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote(table.table),
                columns.join(", "),
                placeholders.join(", "),
            );
            self.conn
                .execute(&sql, params_from_iter(sql_params.iter()))
                .map_err(classify)?;
            debug!(table = table.table, row = name, "Row inserted");
        } else {
            debug!(table = table.table, row = name, "Row updated");
        }
        Ok(())
    }

    fn delete_all_rows(&mut self, table: &TableSpec) -> Result<usize, RepositoryError> {
        let removed = self
            .conn
            .execute(&format!("DELETE FROM {}", quote(table.table)), [])
            .map_err(classify)?;
        debug!(table = table.table, removed, "Rows deleted");
        Ok(removed)
    }

    fn finish(&mut self, end: SessionEnd) -> Result<(), RepositoryError> {
        if !self.in_session {
            return Err(RepositoryError::Connection(
                "catalog session already finished".to_string(),
            ));
        }
        self.in_session = false;

        let statement = match end {
            SessionEnd::Commit => "COMMIT",
            SessionEnd::Rollback => "ROLLBACK",
        };
        self.conn.execute_batch(statement).map_err(classify)?;
        info!(path = ?self.path, ?end, "Catalog session finished");
        Ok(())
    }
}

fn database_path(url: &str) -> Result<PathBuf, RepositoryError> {
    let invalid = |reason: String| RepositoryError::InvalidUrl { reason };

    let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    if parsed.scheme() != SCHEME {
        return Err(RepositoryError::UnsupportedScheme(
            parsed.scheme().to_string(),
        ));
    }

    // `sqlite:relative/catalog.db`
    if parsed.cannot_be_a_base() {
        if parsed.path().is_empty() {
            return Err(invalid("missing database path".to_string()));
        }
        return Ok(PathBuf::from(parsed.path()));
    }

    // Reuse the file URL rules for host and percent-decoding.
    let rest = &url[SCHEME.len() + 1..];
    Url::parse(&format!("file:{rest}"))
        .map_err(|e| invalid(e.to_string()))?
        .to_file_path()
        .map_err(|()| invalid("not a local database path".to_string()))
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn to_sql(value: &ColumnValue) -> Value {
    match value {
        ColumnValue::Null => Value::Null,
        ColumnValue::Integer(value) => Value::Integer(*value),
        ColumnValue::Text(text) => Value::Text(text.clone()),
    }
}

fn from_sql(value: Value) -> ColumnValue {
    match value {
        Value::Null => ColumnValue::Null,
        Value::Integer(value) => ColumnValue::Integer(value),
        Value::Real(value) => ColumnValue::Text(value.to_string()),
        Value::Text(text) => ColumnValue::Text(text),
        Value::Blob(bytes) => ColumnValue::Text(String::from_utf8_lossy(&bytes).into_owned()),
    }
}

/// Separates errors that end the session from errors of one statement.
fn classify(error: rusqlite::Error) -> RepositoryError {
    let lost = match &error {
        rusqlite::Error::SqliteFailure(failure, _) => matches!(
            failure.code,
            ErrorCode::CannotOpen
                | ErrorCode::NotADatabase
                | ErrorCode::DatabaseCorrupt
                | ErrorCode::SystemIoFailure
                | ErrorCode::PermissionDenied
                | ErrorCode::ReadOnly
        ),
        _ => false,
    };

    if lost {
        RepositoryError::Connection(error.to_string())
    } else {
        RepositoryError::Statement(error.to_string())
    }
}
