//! Worker supervision.
//!
//! Keeps exactly one worker task alive. Liveness is checked through the
//! task's `JoinHandle` before each signal is accepted; a finished (panicked
//! or returned) worker is replaced by a fresh one built from the factory.
//!
//! Buys buffered by a crashed worker are lost. Queued signals are not: the
//! queue outlives the worker.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::worker::Worker;

/// Builds a fresh worker.
pub type WorkerFactory = Box<dyn Fn() -> Worker + Send + Sync>;

pub struct WorkerSupervisor {
    factory: WorkerFactory,
    handle: Mutex<Option<JoinHandle<()>>>,
    restarts: AtomicU64,
}

impl WorkerSupervisor {
    pub fn new(factory: WorkerFactory) -> Self {
        Self {
            factory,
            handle: Mutex::new(None),
            restarts: AtomicU64::new(0),
        }
    }

    /// Spawn the worker if none is running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn ensure_running(&self) {
        let mut handle = self.handle.lock();
        match handle.as_ref() {
            Some(h) if !h.is_finished() => return,
            Some(_) => {
                let restarts = self.restarts.fetch_add(1, Ordering::Relaxed) + 1;
                error!(restarts, "Worker task is not running, restarting");
            }
            None => info!("Starting worker task"),
        }
        let worker = (self.factory)();
        *handle = Some(tokio::spawn(worker.run()));
    }

    pub fn is_alive(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Number of replacements spawned after a worker died.
    pub fn restarts(&self) -> u64 {
        self.restarts.load(Ordering::Relaxed)
    }

    /// Abort the worker. A later `ensure_running` starts a new one without
    /// counting a restart.
    pub fn shutdown(&self) {
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
            info!("Worker task stopped");
        }
    }
}

impl Drop for WorkerSupervisor {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.get_mut().take() {
            handle.abort();
        }
    }
}
