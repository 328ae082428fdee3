//! Repository error types.
//!
//! Every public operation returns [`VaultError`] through [`Result`]. Only two
//! kinds of failure exist: input the caller can fix, and failures reported by
//! the underlying store. Missing codebooks or entries are not errors; the
//! operations report them as `false`.

/// Unified error type for the codebook repository.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// Malformed input: missing connection, bad codebook name, or an entry
    /// field outside its length bounds. Raised before any I/O.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// SQLite rejected a statement or a transaction command.
    ///
    /// `context` names the step that failed; the source carries the store's
    /// own diagnostic message.
    #[error("storage error ({context}): {source}")]
    Storage {
        context: &'static str,
        #[source]
        source: rusqlite::Error,
    },
}

impl VaultError {
    /// Build an [`InvalidArgument`](Self::InvalidArgument) from any message.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Wrap a store error with the name of the step that produced it.
    pub fn storage(context: &'static str, source: rusqlite::Error) -> Self {
        Self::Storage { context, source }
    }

    /// Returns `true` for caller-fixable input errors.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, VaultError>;
