//! Producer-facing entry point of the execution pipeline.

use std::sync::Arc;

use relay_broker::BrokerClient;
use relay_core::Signal;
use tracing::info;

use crate::config::{BatchConfig, ExecutionConfig};
use crate::engine::ExecutionEngine;
use crate::error::ExecutorResult;
use crate::queue::SignalQueue;
use crate::scheduler::BatchScheduler;
use crate::supervisor::WorkerSupervisor;
use crate::worker::Worker;

/// Queue, supervised worker and execution engine wired together.
///
/// Cheap to share behind an `Arc`; `submit` may be called from any task.
pub struct Relay {
    queue: Arc<SignalQueue>,
    supervisor: WorkerSupervisor,
}

impl Relay {
    /// Validate the configs and build the pipeline. The worker is started
    /// lazily by the first `submit`, or eagerly by [`Relay::start`].
    pub fn new(
        broker: Arc<BrokerClient>,
        batch: BatchConfig,
        execution: ExecutionConfig,
    ) -> ExecutorResult<Self> {
        batch.validate()?;
        execution.validate()?;

        info!(
            buffer_window_ms = batch.buffer_window_ms,
            poll_interval_ms = batch.poll_interval_ms,
            max_buy_rank = batch.max_buy_rank,
            score_threshold = batch.score_threshold,
            target_buy_amount = %execution.target_buy_amount,
            "Relay configured"
        );

        let queue = Arc::new(SignalQueue::new());
        let engine = Arc::new(ExecutionEngine::new(broker, execution));
        let worker_queue = Arc::clone(&queue);
        let supervisor = WorkerSupervisor::new(Box::new(move || {
            let scheduler = BatchScheduler::new(Arc::clone(&engine), batch.clone());
            Worker::new(Arc::clone(&worker_queue), scheduler, batch.poll_interval())
        }));

        Ok(Self { queue, supervisor })
    }

    /// Start the worker if it is not running.
    pub fn start(&self) {
        self.supervisor.ensure_running();
    }

    /// Accept a signal. Never blocks; restarts the worker if it died.
    pub fn submit(&self, signal: Signal) {
        self.supervisor.ensure_running();
        self.queue.enqueue(signal);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_worker_alive(&self) -> bool {
        self.supervisor.is_alive()
    }

    pub fn worker_restarts(&self) -> u64 {
        self.supervisor.restarts()
    }

    pub fn shutdown(&self) {
        self.supervisor.shutdown();
    }
}
