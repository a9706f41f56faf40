//! Volume error types.
//!
//! Every fallible operation in `libvolume` returns [`VolumeError`]. The enum
//! derives [`thiserror::Error`] and is also [`Serialize`]/[`Deserialize`] so
//! the transport layer in front of this crate can forward it unchanged.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for volume resolution and record operations.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum VolumeError {
    /// The caller supplied a malformed payload or an invalid value, such as a
    /// mount path that is not absolute.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The referenced service, volume or dependency does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The cluster storage-class listing could not be obtained.
    #[error("storage class catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// The persistence collaborator rejected or failed a write.
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),
}

impl VolumeError {
    /// Create a [`VolumeError::InvalidInput`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn invalid<E: std::fmt::Display>(e: E) -> Self {
        Self::InvalidInput(e.to_string())
    }

    /// Create a [`VolumeError::NotFound`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn not_found<E: std::fmt::Display>(e: E) -> Self {
        Self::NotFound(e.to_string())
    }

    /// Create a [`VolumeError::CatalogUnavailable`] from anything that
    /// implements [`std::fmt::Display`].
    pub fn catalog<E: std::fmt::Display>(e: E) -> Self {
        Self::CatalogUnavailable(e.to_string())
    }

    /// Create a [`VolumeError::PersistenceFailure`] from anything that
    /// implements [`std::fmt::Display`].
    pub fn persistence<E: std::fmt::Display>(e: E) -> Self {
        Self::PersistenceFailure(e.to_string())
    }

    /// Whether the caller may retry the request with backoff.
    ///
    /// Only catalog failures qualify: they reflect transient cluster API
    /// conditions. A failed write may have been partially applied.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::CatalogUnavailable(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<serde_json::Error> for VolumeError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidInput(format!("malformed payload: {e}"))
    }
}
