//! Error types for relay-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Malformed alert payload: {0}")]
    MalformedAlert(String),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid number in field {field}: {value}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for core operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;
