//! Signal execution pipeline for the signal relay.
//!
//! # Key Components
//!
//! - [`SignalQueue`]: Unbounded FIFO from producers to the single worker
//! - [`BatchScheduler`]: Buffers buys for a window, ranks them, executes the top K
//! - [`ExecutionEngine`]: Sizes and places one order per signal
//! - [`Worker`]: Dequeue, route, poll the deadline, repeat
//! - [`WorkerSupervisor`]: Restarts the worker if its task has died
//! - [`Relay`]: Producer-facing entry point tying the above together
//!
//! # Signal Routing (in `BatchScheduler::on_signal`)
//!
//! 1. Buy -> buffered until the window deadline, then ranked
//! 2. Exit -> executed immediately, then sell cooldown
//! 3. Anything else -> logged and ignored

pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod queue;
pub mod scheduler;
pub mod supervisor;
pub mod worker;

// Configuration
pub use config::{BatchConfig, ExecutionConfig};

// Error types
pub use error::{ExecutorError, ExecutorResult};

// Execution
pub use engine::{desired_buy_quantity, sell_quantity, ExecutionEngine};

// Batching
pub use queue::SignalQueue;
pub use scheduler::{BatchScheduler, FlushReport, Ranking, RankingBuffer, SchedulerState};

// Worker lifecycle
pub use pipeline::Relay;
pub use supervisor::{WorkerFactory, WorkerSupervisor};
pub use worker::Worker;
