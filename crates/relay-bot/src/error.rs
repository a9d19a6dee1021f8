//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Broker error: {0}")]
    Broker(#[from] relay_broker::BrokerError),

    #[error("Executor error: {0}")]
    Executor(#[from] relay_executor::ExecutorError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] relay_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
