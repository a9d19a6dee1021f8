//! Structured logging for the signal relay.
//!
//! - Structured logging with tracing (JSON in production, pretty otherwise)
//! - A rolling in-memory buffer of recent log lines, fed by a tracing layer,
//!   for the `/api/logs` feed

pub mod buffer;
pub mod error;
pub mod logging;

pub use buffer::{LogBufferLayer, LogSink, RollingLogBuffer, DEFAULT_LOG_BUFFER_LINES};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, DEFAULT_LOG_FILTER};
