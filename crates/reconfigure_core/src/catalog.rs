//! Catalog tables, their column mappings, and the repository seam used to
//! read and write rows.

use std::collections::BTreeMap;
use std::fmt;

use crate::credentials::CredentialEncoding;
use crate::errors::RepositoryError;

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    /// Parsed as a signed integer. An empty value is stored as NULL.
    Integer,
    /// Stored as 1 or 0. Accepts `1/0`, `true/false`, `yes/no`, `on/off`.
    Flag,
}

/// Maps one configuration key onto one catalog column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub column: &'static str,
    pub key: &'static str,
    pub kind: ColumnKind,
    pub credential: Option<CredentialEncoding>,
}

impl ColumnSpec {
    pub const fn text(column: &'static str, key: &'static str) -> Self {
        Self {
            column,
            key,
            kind: ColumnKind::Text,
            credential: None,
        }
    }

    pub const fn integer(column: &'static str, key: &'static str) -> Self {
        Self {
            column,
            key,
            kind: ColumnKind::Integer,
            credential: None,
        }
    }

    pub const fn flag(column: &'static str, key: &'static str) -> Self {
        Self {
            column,
            key,
            kind: ColumnKind::Flag,
            credential: None,
        }
    }

    pub const fn credential(
        column: &'static str,
        key: &'static str,
        encoding: CredentialEncoding,
    ) -> Self {
        Self {
            column,
            key,
            kind: ColumnKind::Text,
            credential: Some(encoding),
        }
    }
}

/// A catalog table: its name, the column identifying a row, and the columns
/// that configuration keys may set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub table: &'static str,
    pub key_column: &'static str,
    pub columns: &'static [ColumnSpec],
}

impl TableSpec {
    pub fn column_for_key(&self, key: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|spec| spec.key == key)
    }
}

/// Kettle repository database connections.
pub const R_DATABASE: TableSpec = TableSpec {
    table: "R_DATABASE",
    key_column: "NAME",
    columns: &[
        ColumnSpec::text("HOST_NAME", "host_name"),
        ColumnSpec::text("DATABASE_NAME", "database_name"),
        ColumnSpec::integer("PORT", "port"),
        ColumnSpec::text("USERNAME", "username"),
        ColumnSpec::credential("PASSWORD", "password", CredentialEncoding::KettleObfuscated),
        ColumnSpec::text("SERVERNAME", "servername"),
        ColumnSpec::text("DATA_TBS", "data_tbs"),
        ColumnSpec::text("INDEX_TBS", "index_tbs"),
    ],
};

/// Platform data sources, rebuilt wholesale on every run.
pub const DATASOURCE: TableSpec = TableSpec {
    table: "DATASOURCE",
    key_column: "NAME",
    columns: &[
        ColumnSpec::integer("MAXACTCONN", "maxactconn"),
        ColumnSpec::text("DRIVERCLASS", "driverclass"),
        ColumnSpec::integer("IDLECONN", "idleconn"),
        ColumnSpec::text("USERNAME", "username"),
        ColumnSpec::credential("PASSWORD", "password", CredentialEncoding::Base64),
        ColumnSpec::text("URL", "url"),
        ColumnSpec::text("QUERY", "query"),
        ColumnSpec::integer("WAIT", "wait"),
    ],
};

/// Platform user accounts.
pub const USERS: TableSpec = TableSpec {
    table: "USERS",
    key_column: "USERNAME",
    columns: &[
        ColumnSpec::credential("PASSWORD", "password", CredentialEncoding::Base64),
        ColumnSpec::text("DESCRIPTION", "description"),
        ColumnSpec::flag("ENABLED", "enabled"),
    ],
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnValue {
    Null,
    Integer(i64),
    Text(String),
}

impl ColumnValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ColumnValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ColumnValue::Integer(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<&str> for ColumnValue {
    fn from(value: &str) -> Self {
        ColumnValue::Text(value.to_string())
    }
}

impl From<i64> for ColumnValue {
    fn from(value: i64) -> Self {
        ColumnValue::Integer(value)
    }
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnValue::Null => write!(f, "NULL"),
            ColumnValue::Integer(value) => write!(f, "{value}"),
            ColumnValue::Text(text) => write!(f, "{text}"),
        }
    }
}

/// Column values of one row, keyed by column name.
pub type CatalogRow = BTreeMap<String, ColumnValue>;

/// How the relational session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Commit,
    Rollback,
}

/// Access to the catalog within one session.
///
/// A repository holds a single session for its whole lifetime. Every write is
/// staged in that session until [`CatalogRepository::finish`] commits or
/// rolls it back, so a run either persists all of its row writes or none.
pub trait CatalogRepository {
    fn table_exists(&mut self, table: &TableSpec) -> Result<bool, RepositoryError>;

    /// Returns the mapped columns of the row whose key column equals `name`.
    fn find_row_by_name(
        &mut self,
        table: &TableSpec,
        name: &str,
    ) -> Result<Option<CatalogRow>, RepositoryError>;

    /// Whether a row keyed by `name` exists. Only the key column is read.
    fn row_exists(&mut self, table: &TableSpec, name: &str) -> Result<bool, RepositoryError>;

    /// Sets `values` on the row keyed by `name`, inserting the row if it does
    /// not exist. Columns not listed are left as they are.
    fn upsert_row(
        &mut self,
        table: &TableSpec,
        name: &str,
        values: &[(&'static str, ColumnValue)],
    ) -> Result<(), RepositoryError>;

    /// Removes every row of the table and returns how many were removed.
    fn delete_all_rows(&mut self, table: &TableSpec) -> Result<usize, RepositoryError>;

    fn finish(&mut self, end: SessionEnd) -> Result<(), RepositoryError>;
}
