//! SQLite catalogs seeded with known rows.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;

/// Creates an ETL repository catalog with two `R_DATABASE` rows, `DB1` and `DB2`.
///
/// `DB1` points at `old-host:5432/kettle` as user `etl`; `DB2` at
/// `old-host:5432/warehouse` with an empty password.
pub fn create_kettle_catalog(path: &Path) -> Result<()> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to create catalog at {}", path.display()))?;
    conn.execute_batch(
        r#"
        CREATE TABLE R_DATABASE (
          ID_DATABASE INTEGER PRIMARY KEY,
          NAME TEXT NOT NULL UNIQUE,
          ID_DATABASE_TYPE INTEGER,
          ID_DATABASE_CONTYPE INTEGER,
          HOST_NAME TEXT,
          DATABASE_NAME TEXT,
          PORT INTEGER,
          USERNAME TEXT,
          PASSWORD TEXT,
          SERVERNAME TEXT,
          DATA_TBS TEXT,
          INDEX_TBS TEXT
        );

        INSERT INTO R_DATABASE
          (ID_DATABASE, NAME, ID_DATABASE_TYPE, ID_DATABASE_CONTYPE, HOST_NAME, DATABASE_NAME, PORT, USERNAME, PASSWORD)
        VALUES
          (1, 'DB1', 1, 1, 'old-host', 'kettle', 5432, 'etl', 'Encrypted 2be98afc86aa7f2e4cb79ce10bef2cfca'),
          (2, 'DB2', 1, 1, 'old-host', 'warehouse', 5432, 'etl', '');
        "#,
    )?;
    debug!(path = ?path, "Kettle catalog created");
    Ok(())
}

/// Creates a BI platform catalog with a `DATASOURCE` table holding one
/// `SampleData` row and a `USERS` table holding `admin` and `suzy`.
pub fn create_platform_catalog(path: &Path) -> Result<()> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to create catalog at {}", path.display()))?;
    conn.execute_batch(
        r#"
        CREATE TABLE DATASOURCE (
          NAME VARCHAR(50) PRIMARY KEY,
          MAXACTCONN INTEGER,
          DRIVERCLASS VARCHAR(50),
          IDLECONN INTEGER,
          USERNAME VARCHAR(50),
          PASSWORD VARCHAR(150),
          URL VARCHAR(512),
          QUERY VARCHAR(100),
          WAIT INTEGER
        );

        INSERT INTO DATASOURCE VALUES
          ('SampleData', 20, 'org.hsqldb.jdbcDriver', 5, 'pentaho_user', 'cGFzc3dvcmQ=',
           'jdbc:hsqldb:hsql://localhost/sampledata', 'select 1', 1000);

        CREATE TABLE USERS (
          USERNAME VARCHAR(50) PRIMARY KEY,
          PASSWORD VARCHAR(50),
          DESCRIPTION VARCHAR(100),
          ENABLED INTEGER
        );

        INSERT INTO USERS VALUES
          ('admin', 'cGFzc3dvcmQ=', 'Administrator', 1),
          ('suzy', 'cGFzc3dvcmQ=', 'Suzy', 1);
        "#,
    )?;
    debug!(path = ?path, "Platform catalog created");
    Ok(())
}

/// Returns the `sqlite:` URL for a database file.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use test_utils::sqlite_url;
///
/// assert_eq!(sqlite_url(Path::new("/tmp/repository.db")), "sqlite:///tmp/repository.db");
/// ```
pub fn sqlite_url(path: &Path) -> String {
    format!("sqlite://{}", path.display())
}

/// Reads one row as column name to text value (`None` for NULL).
///
/// Integers come back in their decimal form, so `PORT` 3306 reads as `"3306"`.
pub fn read_row(
    path: &Path,
    table: &str,
    key_column: &str,
    name: &str,
) -> Result<Option<BTreeMap<String, Option<String>>>> {
    let conn = Connection::open(path)?;
    let sql = format!("SELECT * FROM \"{table}\" WHERE \"{key_column}\" = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let row = stmt
        .query_row(params![name], |row| {
            let mut values = BTreeMap::new();
            for (index, column) in columns.iter().enumerate() {
                let value = match row.get_ref(index)? {
                    ValueRef::Null => None,
                    ValueRef::Integer(value) => Some(value.to_string()),
                    ValueRef::Real(value) => Some(value.to_string()),
                    ValueRef::Text(text) | ValueRef::Blob(text) => {
                        Some(String::from_utf8_lossy(text).into_owned())
                    }
                };
                values.insert(column.clone(), value);
            }
            Ok(values)
        })
        .optional()?;
    Ok(row)
}

pub fn count_rows(path: &Path, table: &str) -> Result<usize> {
    let conn = Connection::open(path)?;
    let count: i64 = conn.query_row(&format!("SELECT count(*) FROM \"{table}\""), [], |row| {
        row.get(0)
    })?;
    Ok(usize::try_from(count)?)
}
