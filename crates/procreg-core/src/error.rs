use thiserror::Error;

/// Core error types for procreg domain values
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid process state: {0}")]
    InvalidState(String),

    #[error("Invalid index type: {0}")]
    InvalidIndexType(String),

    #[error("Invalid index descriptor: {message}")]
    InvalidIndex { message: String },

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CoreError {
    /// Create a new InvalidState error
    pub fn invalid_state(state: impl Into<String>) -> Self {
        Self::InvalidState(state.into())
    }

    /// Create a new InvalidIndexType error
    pub fn invalid_index_type(index_type: impl Into<String>) -> Self {
        Self::InvalidIndexType(index_type.into())
    }

    /// Create a new InvalidIndex error
    pub fn invalid_index(message: impl Into<String>) -> Self {
        Self::InvalidIndex {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
