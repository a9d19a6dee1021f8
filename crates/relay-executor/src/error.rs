//! Executor error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Invalid batching configuration: {0}")]
    InvalidBatchConfig(String),

    #[error("Invalid execution configuration: {0}")]
    InvalidExecutionConfig(String),
}

pub type ExecutorResult<T> = Result<T, ExecutorError>;
