//! Record types and field validation.
//!
//! The `public_key` and `encrypted_password` fields are opaque strings
//! produced by the encryption layer. Nothing here inspects their content,
//! only their length.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Maximum length of a codebook name, in characters.
pub const MAX_CODEBOOK_NAME_LEN: usize = 100;

/// Maximum length of an entry address (a DNS name fits in 253).
pub const MAX_ADDRESS_LEN: usize = 253;

/// Maximum length of an entry's public key.
pub const MAX_PUBLIC_KEY_LEN: usize = 4096;

/// Maximum length of an entry's encrypted password.
pub const MAX_ENCRYPTED_PASSWORD_LEN: usize = 512;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A named collection of password entries owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Codebook {
    /// Database row ID.
    pub id: i64,

    /// The owning user.
    pub owner: String,

    /// Display name, unique per owner.
    pub name: String,

    /// Creation timestamp as stored by the database.
    pub created_time: String,
}

/// A single encrypted password record inside a codebook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordEntry {
    pub id: i64,
    pub codebook_id: i64,
    /// Site or host the password belongs to.
    pub address: String,
    pub public_key: String,
    pub encrypted_password: String,
    pub notes: String,
    pub created_time: String,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check that `name` is 1..=100 characters of ASCII letters, digits, space,
/// `-` or `_`.
pub fn is_valid_codebook_name(name: &str) -> bool {
    !name.is_empty()
        && name.chars().count() <= MAX_CODEBOOK_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_'))
}

/// Reject a codebook name that fails [`is_valid_codebook_name`].
pub fn validate_codebook_name(name: &str) -> Result<()> {
    if is_valid_codebook_name(name) {
        Ok(())
    } else {
        Err(VaultError::invalid("codebook name is invalid"))
    }
}

/// Validate the length-bounded fields of an entry update.
///
/// `notes` is unconstrained and therefore not checked.
pub fn validate_entry_fields(
    address: &str,
    public_key: &str,
    encrypted_password: &str,
) -> Result<()> {
    check_len("address", address, MAX_ADDRESS_LEN)?;
    check_len("public key", public_key, MAX_PUBLIC_KEY_LEN)?;
    check_len("encrypted password", encrypted_password, MAX_ENCRYPTED_PASSWORD_LEN)?;
    Ok(())
}

fn check_len(field: &str, value: &str, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len == 0 || len > max {
        return Err(VaultError::invalid(format!(
            "{field} must be 1-{max} characters (got {len})"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
