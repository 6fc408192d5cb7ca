//! Storage error types for the backing store abstraction.
//!
//! This module defines all error types that can occur during store operations.

use std::fmt;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested document or database was not found.
    #[error("Not found: {id}")]
    NotFound {
        /// Identifier of the missing document or database.
        id: String,
    },

    /// A revision mismatch or a duplicate create.
    #[error("Conflict on {id}: {message}")]
    Conflict {
        /// Identifier of the conflicting document or index.
        id: String,
        /// Description of the conflict.
        message: String,
    },

    /// Transport or authentication failure reaching the store.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// A document body could not be encoded or decoded.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the serialization error.
        message: String,
    },

    /// The store rejected the request for authorization reasons.
    #[error("Permission denied: {message}")]
    Permission {
        /// Description of the rejection.
        message: String,
    },

    /// The request itself was malformed.
    #[error("Validation error: {message}")]
    Validation {
        /// Description of the validation failure.
        message: String,
    },

    /// A single row of a result stream could not be read.
    ///
    /// The cursor itself is still usable; any other error yielded by a
    /// stream is a cursor failure.
    #[error("Row scan error{}: {message}", .id.as_deref().map(|id| format!(" on {id}")).unwrap_or_default())]
    RowScan {
        /// Identifier of the row, when it could be read.
        id: Option<String>,
        /// Description of the row failure.
        message: String,
    },

    /// Any other non-success response from the store.
    #[error("{operation} failed{}: {message}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Backend {
        /// The store operation that failed.
        operation: String,
        /// Underlying status code, if the store reported one.
        status: Option<u16>,
        /// Description of the failure.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Creates a new `Conflict` error.
    #[must_use]
    pub fn conflict(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Creates a new `Connection` error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a new `Serialization` error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Creates a new `Permission` error.
    #[must_use]
    pub fn permission(message: impl Into<String>) -> Self {
        Self::Permission {
            message: message.into(),
        }
    }

    /// Creates a new `Validation` error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a new `RowScan` error.
    #[must_use]
    pub fn row_scan(id: Option<String>, message: impl Into<String>) -> Self {
        Self::RowScan {
            id,
            message: message.into(),
        }
    }

    /// Creates a new `Backend` error.
    #[must_use]
    pub fn backend(
        operation: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self::Backend {
            operation: operation.into(),
            status,
            message: message.into(),
        }
    }

    /// Returns `true` if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is a conflict error.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Returns `true` if this error concerns a single row rather than the cursor.
    #[must_use]
    pub fn is_row_error(&self) -> bool {
        matches!(self, Self::RowScan { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::Connection { .. } => ErrorCategory::Connectivity,
            Self::Serialization { .. } | Self::RowScan { .. } => ErrorCategory::Serialization,
            Self::Permission { .. } => ErrorCategory::Permission,
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::Backend { .. } => ErrorCategory::Backend,
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<procreg_core::CoreError> for StorageError {
    fn from(err: procreg_core::CoreError) -> Self {
        match err {
            procreg_core::CoreError::JsonError(e) => Self::serialization(e.to_string()),
            other => Self::validation(other.to_string()),
        }
    }
}

/// Categories of storage errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Document or database absent.
    NotFound,
    /// Revision mismatch or duplicate create.
    Conflict,
    /// Transport/authentication failure.
    Connectivity,
    /// Malformed body.
    Serialization,
    /// Authorization rejection.
    Permission,
    /// Malformed request.
    Validation,
    /// Other store failure.
    Backend,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Connectivity => write!(f, "connectivity"),
            Self::Serialization => write!(f, "serialization"),
            Self::Permission => write!(f, "permission"),
            Self::Validation => write!(f, "validation"),
            Self::Backend => write!(f, "backend"),
        }
    }
}
