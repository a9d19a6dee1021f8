//! Core domain types for the signal relay.
//!
//! This crate provides the types shared by every stage of the pipeline:
//! - `Signal`, `SignalAction`: normalized trading alerts, classified once at ingestion
//! - `OrderRequest`, `OrderResult`: what is sent to the broker and what comes back
//! - `ExecutionOutcome`, `SkipReason`: what the execution engine did with a signal
//! - `parse_alert`: inbound webhook payload parsing

pub mod error;
pub mod execution;
pub mod order;
pub mod parser;
pub mod signal;

pub use error::{CoreError, CoreResult};
pub use execution::{ExecutionOutcome, SkipReason};
pub use order::{OrderRequest, OrderResult, OrderSide, PriceMode};
pub use parser::parse_alert;
pub use signal::{SellPortion, Signal, SignalAction, SignalId};
