//! Storage layer for password codebooks.
//!
//! A codebook is a named, per-user collection of password entries. Each
//! entry carries an address plus a public key and an encrypted password
//! produced elsewhere; this crate stores those as opaque strings and never
//! encrypts or decrypts anything.
//!
//! # Modules
//!
//! - [`repository`]: [`PasswordVault`], the CRUD façade over SQLite.
//! - [`model`]: record types, field limits and validation.
//! - [`schema`]: the table layout the repository expects.
//! - [`error`]: unified error type.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use codebook_vault::{PasswordVault, VaultError, schema};
//!
//! # fn example() -> codebook_vault::Result<()> {
//! // The connection is opened and owned by the caller.
//! let conn = rusqlite::Connection::open("data/vault.db")
//!     .map_err(|e| VaultError::storage("open connection", e))?;
//! schema::apply(&conn)?;
//!
//! let vault = PasswordVault::new(&conn)?;
//! vault.create_codebook("alice", "Personal")?;
//!
//! let book = vault.get_user_codebooks("alice")?.remove(0);
//! vault.add_entry(book.id, "mail.example.com", "<public key>", "<ciphertext>", "")?;
//!
//! let page = vault.get_entries(book.id, "example.com", 0, 20)?;
//! assert_eq!(page.len(), 1);
//!
//! // Removes the codebook and every entry in it.
//! vault.delete_codebook(book.id)?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod model;
pub mod repository;
pub mod schema;

pub use error::{Result, VaultError};
pub use model::{Codebook, PasswordEntry};
pub use repository::PasswordVault;
