//! Registry error types.

use std::path::PathBuf;

use procreg_core::CoreError;
use procreg_storage::{ErrorCategory, StorageError};

/// Errors returned by registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Failure reported by the backing store.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Filesystem failure while exporting.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Caller-supplied input was rejected before reaching the store.
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Type alias for registry results.
pub type RegistryResult<T> = Result<T, RegistryError>;

impl RegistryError {
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if the document, index or database was absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Storage(e) if e.is_not_found())
    }

    /// Returns `true` on a revision mismatch or duplicate create.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Storage(e) if e.is_conflict())
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Storage(e) => e.category(),
            Self::Io { .. } => ErrorCategory::Backend,
            Self::Validation(_) => ErrorCategory::Validation,
        }
    }
}

impl From<CoreError> for RegistryError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::JsonError(_) => Self::Storage(err.into()),
            other => Self::Validation(other.to_string()),
        }
    }
}
