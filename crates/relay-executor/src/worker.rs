//! The single consumer task.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::queue::SignalQueue;
use crate::scheduler::BatchScheduler;

/// Drains the queue into the scheduler and checks the buy deadline every cycle.
pub struct Worker {
    queue: Arc<SignalQueue>,
    scheduler: BatchScheduler,
    poll_interval: Duration,
}

impl Worker {
    pub fn new(
        queue: Arc<SignalQueue>,
        scheduler: BatchScheduler,
        poll_interval: Duration,
    ) -> Self {
        Self {
            queue,
            scheduler,
            poll_interval,
        }
    }

    /// One cycle: wait up to the poll interval for a signal, route it, then
    /// flush if the window is due.
    pub async fn tick(&mut self) {
        if let Some(signal) = self.queue.dequeue(self.poll_interval).await {
            debug!(signal_id = %signal.id, pending = self.queue.len(), "Signal dequeued");
            self.scheduler.on_signal(signal, Instant::now()).await;
        }

        if let Some(report) = self.scheduler.poll(Instant::now()).await {
            info!(
                executed = report.executed.len(),
                accepted = report.executed.iter().filter(|(_, o)| o.is_accepted()).count(),
                dropped = report.dropped.len(),
                below_threshold = report.below_threshold.len(),
                "Buy window flushed"
            );
        }
    }

    /// Run until the task is aborted.
    pub async fn run(mut self) {
        info!(poll_interval_ms = self.poll_interval.as_millis() as u64, "Worker started");
        loop {
            self.tick().await;
        }
    }
}
