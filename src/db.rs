//! Shared SQLite plumbing for the file-based codecs
//!
//! Both relational formats use the same strict validation policy: the file's
//! table set and every table's column set must equal the format's expected
//! schema exactly. Any deviation, or a file that is not a database at all,
//! means "not a valid session file" - there is no partial recovery.

use std::collections::HashSet;
use std::path::Path;

use rusqlite::{Connection, OpenFlags};

use crate::{Error, Result};

/// Expected schema entry: table name plus its full column set
pub(crate) type TableSpec = (&'static str, &'static [&'static str]);

/// Open an existing session database read-only, verifying its schema
pub(crate) fn open_validated(path: &Path, expected: &[TableSpec]) -> Result<Connection> {
    if !path.is_file() {
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;

    if !schema_matches(&conn, expected) {
        tracing::debug!("schema mismatch in {:?}", path);
        return Err(Error::InvalidSessionFile {
            path: path.to_path_buf(),
        });
    }

    Ok(conn)
}

/// Open (creating if needed) a database for writing a fresh session file
pub(crate) fn create(path: &Path) -> Result<Connection> {
    Ok(Connection::open(path)?)
}

/// Strict schema equality check
///
/// A file that is not a database errors on the first query; that counts as a
/// mismatch, same as a wrong table or column set.
pub(crate) fn schema_matches(conn: &Connection, expected: &[TableSpec]) -> bool {
    check_schema(conn, expected).unwrap_or(false)
}

fn check_schema(conn: &Connection, expected: &[TableSpec]) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
    let tables = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<HashSet<String>>>()?;

    let expected_tables: HashSet<String> =
        expected.iter().map(|(table, _)| table.to_string()).collect();
    if tables != expected_tables {
        return Ok(false);
    }

    for (table, columns) in expected {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info(\"{table}\")"))?;
        // column 1 of table_info is the column name
        let db_columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<HashSet<String>>>()?;

        let expected_columns: HashSet<String> =
            columns.iter().map(|column| column.to_string()).collect();
        if db_columns != expected_columns {
            return Ok(false);
        }
    }

    Ok(true)
}
