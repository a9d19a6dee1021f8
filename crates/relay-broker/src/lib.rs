//! Broker REST client for the signal relay.
//!
//! # Key Components
//!
//! - [`BrokerClient`]: Owns the auth token, submits orders with the single
//!   expiry retry, and answers balance/affordability queries
//! - [`BrokerTransport`]: Dyn-compatible seam over the HTTP calls
//! - [`RestTransport`]: reqwest implementation of the transport
//! - [`MockTransport`]: Scripted transport for tests
//!
//! # Expiry Retry
//!
//! 1. Order rejected with an expiry code/marker (or HTTP 401)
//! 2. Cached token invalidated
//! 3. Token re-acquired, order resubmitted once
//! 4. A second expiry is returned as a rejection, never retried

pub mod client;
pub mod config;
pub mod error;
pub mod rest;
pub mod transport;
pub mod wire;

pub use client::{AuthToken, BrokerClient, ExpiryRules};
pub use config::{BrokerConfig, Credentials};
pub use error::{BrokerError, BrokerResult};
pub use rest::RestTransport;
pub use transport::{BoxFuture, BrokerTransport, DynTransport, MockTransport};
pub use wire::{Holding, OrderReply, OrderWire, Withdrawable, WithdrawableQuery};
