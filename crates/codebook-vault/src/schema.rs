//! The table layout the repository expects.
//!
//! Creating and upgrading the schema belongs to whoever provisions the
//! connection. [`SCHEMA_SQL`] is published so that code (and the tests) can
//! build a compatible database; [`crate::PasswordVault`] never runs it.

use rusqlite::Connection;
use tracing::debug;

use crate::error::{Result, VaultError};

/// DDL for the `Codebook` and `PasswordEntry` tables.
///
/// `created_time` defaults to a UTC timestamp with millisecond precision so
/// rows inserted in quick succession still sort in insertion order.
pub const SCHEMA_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS Codebook (
        codebook_id   INTEGER PRIMARY KEY AUTOINCREMENT,
        username      TEXT NOT NULL,
        codebook_name TEXT NOT NULL,
        created_time  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
        UNIQUE (username, codebook_name)
    );
    CREATE INDEX IF NOT EXISTS idx_codebook_username ON Codebook(username);

    CREATE TABLE IF NOT EXISTS PasswordEntry (
        entry_id           INTEGER PRIMARY KEY AUTOINCREMENT,
        codebook_id        INTEGER NOT NULL REFERENCES Codebook(codebook_id),
        address            TEXT NOT NULL,
        public_key         TEXT NOT NULL,
        encrypted_password TEXT NOT NULL,
        notes              TEXT NOT NULL DEFAULT '',
        created_time       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
    );
    CREATE INDEX IF NOT EXISTS idx_entry_codebook ON PasswordEntry(codebook_id);
"#;

/// Create both tables on `conn` if they do not exist yet.
pub fn apply(conn: &Connection) -> Result<()> {
    debug!("applying codebook schema");
    conn.execute_batch(SCHEMA_SQL)
        .map_err(|e| VaultError::storage("apply schema", e))?;
    Ok(())
}
