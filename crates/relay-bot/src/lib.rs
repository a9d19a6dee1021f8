//! Signal relay service.
//!
//! Accepts trading alerts over HTTP and relays them to the broker:
//! - Webhook ingress (axum)
//! - Buy ranking and immediate exits (relay-executor)
//! - Authenticated order submission (relay-broker)
//! - Structured logging with a rolling log feed (relay-telemetry)

pub mod app;
pub mod config;
pub mod error;
pub mod webhook;

pub use app::Application;
pub use config::{AppConfig, LoadedConfig, DEFAULT_CONFIG_PATH};
pub use error::{AppError, AppResult};
