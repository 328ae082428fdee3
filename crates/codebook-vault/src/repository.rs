//! SQLite-backed repository for codebooks and their password entries.
//!
//! [`PasswordVault`] borrows a live `rusqlite::Connection` owned by the
//! caller. It never opens, configures or closes that connection, and it
//! assumes exclusive use of it for the duration of each call.
//!
//! Every statement is prepared, run and dropped inside the operation that
//! needs it, so no statement outlives a call even when it returns early
//! with an error.
//!
//! Two signalling tiers are kept apart:
//!
//! - `Err(VaultError)` for malformed input and store failures.
//! - `Ok(false)` when the target codebook or entry does not exist, or a
//!   write statement did not go through.

use std::fmt;

use rusqlite::{Connection, Row, Statement, params};
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, VaultError};
use crate::model::{Codebook, PasswordEntry, validate_codebook_name, validate_entry_fields};

// ---------------------------------------------------------------------------
// SQL
// ---------------------------------------------------------------------------

const INSERT_CODEBOOK: &str = "INSERT INTO Codebook (username, codebook_name)
     VALUES (?1, ?2)
     ON CONFLICT(username, codebook_name) DO NOTHING";

const SELECT_USER_CODEBOOKS: &str = "SELECT codebook_id, username, codebook_name, created_time
     FROM Codebook
     WHERE username = ?1
     ORDER BY created_time DESC, codebook_id DESC";

const CODEBOOK_EXISTS: &str = "SELECT 1 FROM Codebook WHERE codebook_id = ?1";

const DELETE_CODEBOOK_ENTRIES: &str = "DELETE FROM PasswordEntry WHERE codebook_id = ?1";

const DELETE_CODEBOOK: &str = "DELETE FROM Codebook WHERE codebook_id = ?1";

const INSERT_ENTRY: &str = "INSERT INTO PasswordEntry
     (codebook_id, address, public_key, encrypted_password, notes)
     VALUES (?1, ?2, ?3, ?4, ?5)";

const SELECT_ENTRIES: &str = r"SELECT entry_id, codebook_id, address, public_key,
            encrypted_password, notes, created_time
     FROM PasswordEntry
     WHERE codebook_id = ?1
       AND address LIKE ?2 ESCAPE '\'
     ORDER BY created_time DESC, entry_id DESC
     LIMIT ?3 OFFSET ?4";

const UPDATE_ENTRY: &str = "UPDATE PasswordEntry SET
         address = ?1,
         public_key = ?2,
         encrypted_password = ?3,
         notes = ?4
     WHERE entry_id = ?5";

// ---------------------------------------------------------------------------
// Delete progress
// ---------------------------------------------------------------------------

/// How far a codebook deletion got before it finished or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeleteStage {
    NotStarted,
    Began,
    EntriesDeleted,
    CodebookDeleted,
    Committed,
}

impl fmt::Display for DeleteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotStarted => "not_started",
            Self::Began => "began",
            Self::EntriesDeleted => "entries_deleted",
            Self::CodebookDeleted => "codebook_deleted",
            Self::Committed => "committed",
        })
    }
}

// ---------------------------------------------------------------------------
// PasswordVault
// ---------------------------------------------------------------------------

/// Repository over the `Codebook` and `PasswordEntry` tables.
///
/// # Example
///
/// ```rust,no_run
/// # use codebook_vault::{PasswordVault, schema};
/// # fn example() -> codebook_vault::Result<()> {
/// let conn = rusqlite::Connection::open("vault.db")
///     .map_err(|e| codebook_vault::VaultError::storage("open connection", e))?;
/// schema::apply(&conn)?;
///
/// let vault = PasswordVault::new(&conn)?;
/// vault.create_codebook("alice", "Personal")?;
///
/// let books = vault.get_user_codebooks("alice")?;
/// vault.add_entry(books[0].id, "example.com", "pk-1", "ct-1", "")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PasswordVault<'c> {
    conn: &'c Connection,
}

impl<'c> PasswordVault<'c> {
    /// Wrap a connection handle.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidArgument`] when no connection is given.
    pub fn new(conn: impl Into<Option<&'c Connection>>) -> Result<Self> {
        let conn = conn
            .into()
            .ok_or_else(|| VaultError::invalid("invalid database connection"))?;
        Ok(Self { conn })
    }

    // -- Codebooks ----------------------------------------------------------

    /// Create a codebook named `name` for `owner`.
    ///
    /// Creating a codebook that already exists for the same owner changes
    /// nothing and still returns `true`. Returns `false` only when the
    /// insert itself was rejected by the store.
    ///
    /// # Errors
    ///
    /// [`VaultError::InvalidArgument`] for a name that is empty, longer than
    /// 100 characters, or contains anything other than ASCII letters,
    /// digits, space, `-` and `_`. [`VaultError::Storage`] if the statement
    /// cannot be prepared.
    #[instrument(skip(self))]
    pub fn create_codebook(&self, owner: &str, name: &str) -> Result<bool> {
        validate_codebook_name(name)?;

        let mut stmt = self.prepare(INSERT_CODEBOOK)?;
        match stmt.execute(params![owner, name]) {
            Ok(0) => {
                debug!("codebook already exists");
                Ok(true)
            }
            Ok(_) => {
                info!(codebook_id = self.conn.last_insert_rowid(), "created codebook");
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "codebook insert failed");
                Ok(false)
            }
        }
    }

    /// Delete a codebook together with all of its entries.
    ///
    /// Returns `false` without touching the database when the codebook does
    /// not exist. Otherwise both deletes run in one transaction: either the
    /// codebook and its entries are all gone, or nothing changed.
    ///
    /// # Errors
    ///
    /// [`VaultError::Storage`] if beginning the transaction, either delete,
    /// or the commit fails. The transaction is rolled back before the error
    /// is returned; a failed rollback is logged and the original error wins.
    #[instrument(skip(self))]
    pub fn delete_codebook(&self, codebook_id: i64) -> Result<bool> {
        if !self.codebook_exists(codebook_id)? {
            debug!("codebook not found");
            return Ok(false);
        }

        if let Err(err) = self.begin_transaction() {
            warn!(stage = %DeleteStage::NotStarted, error = %err, "could not begin delete");
            return Err(err);
        }
        let mut stage = DeleteStage::Began;

        if let Err(err) = self.delete_in_transaction(codebook_id, &mut stage) {
            warn!(stage = %stage, error = %err, "codebook delete failed, rolling back");
            if let Err(rollback_err) = self.rollback_transaction() {
                warn!(error = %rollback_err, "rollback failed");
            }
            return Err(err);
        }

        info!(stage = %stage, "deleted codebook and its entries");
        Ok(true)
    }

    /// List every codebook owned by `owner`, newest first.
    ///
    /// An owner with no codebooks yields an empty list. Owners are not
    /// validated, so the empty string is looked up like any other owner.
    #[instrument(skip(self))]
    pub fn get_user_codebooks(&self, owner: &str) -> Result<Vec<Codebook>> {
        let mut stmt = self.prepare(SELECT_USER_CODEBOOKS)?;
        let rows = stmt
            .query_map(params![owner], codebook_from_row)
            .map_err(|e| VaultError::storage("query codebooks", e))?;

        let codebooks = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| VaultError::storage("read codebook row", e))?;

        debug!(count = codebooks.len(), "listed codebooks");
        Ok(codebooks)
    }

    // -- Entries ------------------------------------------------------------

    /// Add an entry to an existing codebook.
    ///
    /// Returns `false` if the codebook does not exist (nothing is written)
    /// or the store rejected the insert. Field lengths are not checked here;
    /// only [`update_entry`](Self::update_entry) validates them.
    ///
    /// # Errors
    ///
    /// [`VaultError::Storage`] if a statement cannot be prepared.
    #[instrument(skip(self, public_key, encrypted_password, notes))]
    pub fn add_entry(
        &self,
        codebook_id: i64,
        address: &str,
        public_key: &str,
        encrypted_password: &str,
        notes: &str,
    ) -> Result<bool> {
        if !self.codebook_exists(codebook_id)? {
            debug!("codebook not found");
            return Ok(false);
        }

        let mut stmt = self.prepare(INSERT_ENTRY)?;
        match stmt.execute(params![
            codebook_id,
            address,
            public_key,
            encrypted_password,
            notes
        ]) {
            Ok(_) => {
                info!(entry_id = self.conn.last_insert_rowid(), "added entry");
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "entry insert failed");
                Ok(false)
            }
        }
    }

    /// Fetch one page of a codebook's entries, newest first.
    ///
    /// `filter` must appear somewhere in the address; an empty filter
    /// matches everything. `page` is zero-based and skips
    /// `page * page_size` rows. A page past the end is simply empty, including
    /// one whose offset does not fit in an `i64`.
    #[instrument(skip(self))]
    pub fn get_entries(
        &self,
        codebook_id: i64,
        filter: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<PasswordEntry>> {
        // An offset past i64::MAX cannot address any row.
        let Some(offset) = i64::from(page).checked_mul(i64::from(page_size)) else {
            debug!("page offset out of range");
            return Ok(Vec::new());
        };
        let pattern = like_pattern(filter);
        let limit = i64::from(page_size);

        let mut stmt = self.prepare(SELECT_ENTRIES)?;
        let rows = stmt
            .query_map(params![codebook_id, pattern, limit, offset], entry_from_row)
            .map_err(|e| VaultError::storage("query entries", e))?;

        let entries = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| VaultError::storage("read entry row", e))?;

        debug!(count = entries.len(), "fetched entries");
        Ok(entries)
    }

    /// Replace the address, public key, encrypted password and notes of an
    /// entry.
    ///
    /// Returns `true` only when a row was actually changed; an unknown
    /// `entry_id` gives `false`.
    ///
    /// # Errors
    ///
    /// [`VaultError::InvalidArgument`] if the address is not 1-253
    /// characters, the public key not 1-4096, or the encrypted password not
    /// 1-512. [`VaultError::Storage`] if the statement cannot be prepared.
    #[instrument(skip(self, new_public_key, new_encrypted_password, new_notes))]
    pub fn update_entry(
        &self,
        entry_id: i64,
        new_address: &str,
        new_public_key: &str,
        new_encrypted_password: &str,
        new_notes: &str,
    ) -> Result<bool> {
        validate_entry_fields(new_address, new_public_key, new_encrypted_password)?;

        let mut stmt = self.prepare(UPDATE_ENTRY)?;
        match stmt.execute(params![
            new_address,
            new_public_key,
            new_encrypted_password,
            new_notes,
            entry_id
        ]) {
            Ok(0) => {
                debug!("entry not found");
                Ok(false)
            }
            Ok(_) => {
                info!("updated entry");
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "entry update failed");
                Ok(false)
            }
        }
    }

    // -- Internal helpers ---------------------------------------------------

    fn prepare(&self, sql: &str) -> Result<Statement<'c>> {
        self.conn
            .prepare(sql)
            .map_err(|e| VaultError::storage("prepare statement", e))
    }

    fn codebook_exists(&self, codebook_id: i64) -> Result<bool> {
        let mut stmt = self.prepare(CODEBOOK_EXISTS)?;
        stmt.exists(params![codebook_id])
            .map_err(|e| VaultError::storage("check codebook exists", e))
    }

    /// Run both deletes and the commit, advancing `stage` as each succeeds.
    fn delete_in_transaction(&self, codebook_id: i64, stage: &mut DeleteStage) -> Result<()> {
        self.prepare(DELETE_CODEBOOK_ENTRIES)?
            .execute(params![codebook_id])
            .map_err(|e| VaultError::storage("delete entries", e))?;
        *stage = DeleteStage::EntriesDeleted;

        self.prepare(DELETE_CODEBOOK)?
            .execute(params![codebook_id])
            .map_err(|e| VaultError::storage("delete codebook", e))?;
        *stage = DeleteStage::CodebookDeleted;

        self.commit_transaction()?;
        *stage = DeleteStage::Committed;
        Ok(())
    }

    fn begin_transaction(&self) -> Result<()> {
        self.conn
            .execute_batch("BEGIN TRANSACTION")
            .map_err(|e| VaultError::storage("begin transaction", e))
    }

    fn commit_transaction(&self) -> Result<()> {
        self.conn
            .execute_batch("COMMIT")
            .map_err(|e| VaultError::storage("commit", e))
    }

    fn rollback_transaction(&self) -> Result<()> {
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(|e| VaultError::storage("rollback", e))
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn codebook_from_row(row: &Row<'_>) -> rusqlite::Result<Codebook> {
    Ok(Codebook {
        id: row.get(0)?,
        owner: row.get(1)?,
        name: row.get(2)?,
        created_time: row.get(3)?,
    })
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<PasswordEntry> {
    Ok(PasswordEntry {
        id: row.get(0)?,
        codebook_id: row.get(1)?,
        address: row.get(2)?,
        public_key: row.get(3)?,
        encrypted_password: row.get(4)?,
        notes: row.get(5)?,
        created_time: row.get(6)?,
    })
}

/// Turn a substring filter into a `LIKE` pattern with `\` as the escape
/// character, so `%` and `_` in the filter match literally.
fn like_pattern(filter: &str) -> String {
    let mut pattern = String::with_capacity(filter.len() + 2);
    pattern.push('%');
    for c in filter.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
