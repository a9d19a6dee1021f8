//! Broker error types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Unauthorized (HTTP 401)")]
    Unauthorized,

    #[error("Broker rejected request [{code}]: {msg}")]
    Rejected { code: String, msg: String },

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

pub type BrokerResult<T> = Result<T, BrokerError>;
