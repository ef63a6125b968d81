//! Error types and handling for stash-core operations.
//!
//! The error taxonomy is deliberately small and caller-oriented: input
//! errors ([`Error::InvalidUrl`], [`Error::StorageFull`]) are never worth
//! retrying, while [`Error::BackendUnavailable`] is the one class a UI
//! can reasonably surface with a "retry" affordance. The store itself
//! never retries internally; retrying a `set` after a partial failure
//! risks re-applying a stale read, so any retry policy belongs to the
//! caller.

use thiserror::Error;

/// The main error type for stash-core operations.
///
/// All public functions in stash-core return `Result<T, Error>`. The
/// variants are distinguishable so that view collaborators can render
/// different messages ("list is full" vs. "couldn't reach storage")
/// without string-matching.
#[derive(Error, Debug)]
pub enum Error {
    /// URL failed validation.
    ///
    /// The input did not parse as an absolute URL, or its scheme was not
    /// `http`/`https`. Script-injection schemes (`javascript:`, `data:`)
    /// land here. Always a caller error; never retried.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The collection is at capacity and a non-dedup insert was attempted.
    ///
    /// Actionable by deleting items first. A dedup update of an existing
    /// URL succeeds even when the collection is full.
    #[error("Saved-item limit reached ({limit} items)")]
    StorageFull {
        /// The item cap that was hit.
        limit: usize,
    },

    /// The persistence backend failed a `get` or `set`.
    ///
    /// Covers quota, I/O, and connectivity failures in the underlying
    /// key-value store. This is the only recoverable category; the
    /// failure is surfaced immediately to the caller of the specific
    /// operation, which decides whether to retry.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The persisted blob could not be encoded or decoded.
    ///
    /// A corrupt or incompatible collection blob is reported rather than
    /// silently treated as empty, so a bad sync can never wipe the list
    /// through a read-modify-write cycle.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl Error {
    /// Check if the error might be recoverable through retry logic.
    ///
    /// Only [`Error::BackendUnavailable`] qualifies: the other variants
    /// describe the input or the committed state, and retrying the same
    /// call cannot change the outcome.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::BackendUnavailable(_))
    }

    /// Get the error category as a string identifier.
    ///
    /// Useful for grouping errors in logs or metrics without matching on
    /// the variant payload.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::InvalidUrl(_) => "invalid_url",
            Self::StorageFull { .. } => "storage_full",
            Self::BackendUnavailable(_) => "backend_unavailable",
            Self::Serialization(_) => "serialization",
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
