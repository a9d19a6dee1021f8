//! Ingestion queue.
//!
//! Unbounded FIFO between any number of producers and the single worker.
//! `enqueue` never blocks. `dequeue` waits at most `timeout` so the worker
//! can check the buffering deadline even when no traffic arrives.
//!
//! The receiver lives behind an async mutex owned by the queue, not by the
//! worker, so a replacement worker resumes on the same queue after a crash.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use relay_core::Signal;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error};

#[derive(Debug)]
pub struct SignalQueue {
    tx: mpsc::UnboundedSender<Signal>,
    rx: Mutex<mpsc::UnboundedReceiver<Signal>>,
    pending: AtomicUsize,
}

impl Default for SignalQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
            pending: AtomicUsize::new(0),
        }
    }

    /// Append a signal. Never blocks.
    pub fn enqueue(&self, signal: Signal) {
        debug!(
            signal_id = %signal.id,
            ticker = %signal.ticker,
            action = %signal.action,
            "Signal enqueued"
        );
        self.pending.fetch_add(1, Ordering::AcqRel);
        if let Err(e) = self.tx.send(signal) {
            // The receiver is owned by `self`; this only happens mid-drop.
            self.pending.fetch_sub(1, Ordering::AcqRel);
            error!(signal_id = %e.0.id, "Signal queue closed, signal discarded");
        }
    }

    /// Wait up to `timeout` for the next signal.
    pub async fn dequeue(&self, timeout: Duration) -> Option<Signal> {
        let mut rx = self.rx.lock().await;
        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Some(signal)) => {
                self.pending.fetch_sub(1, Ordering::AcqRel);
                Some(signal)
            }
            Ok(None) | Err(_) => None,
        }
    }

    /// Signals enqueued but not yet dequeued.
    pub fn len(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::SignalAction;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn buy(ticker: &str) -> Signal {
        Signal::new(ticker, SignalAction::Buy, dec!(1000))
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = SignalQueue::new();
        queue.enqueue(buy("A"));
        queue.enqueue(buy("B"));
        queue.enqueue(buy("C"));
        assert_eq!(queue.len(), 3);

        let timeout = Duration::from_millis(10);
        assert_eq!(queue.dequeue(timeout).await.unwrap().ticker, "A");
        assert_eq!(queue.dequeue(timeout).await.unwrap().ticker, "B");
        assert_eq!(queue.dequeue(timeout).await.unwrap().ticker, "C");
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dequeue_times_out_when_empty() {
        let queue = SignalQueue::new();
        let started = tokio::time::Instant::now();

        assert!(queue.dequeue(Duration::from_millis(250)).await.is_none());
        assert!(started.elapsed() >= Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_dequeue_wakes_on_enqueue() {
        let queue = SignalQueue::new();
        let mut dequeue = tokio_test::task::spawn(queue.dequeue(Duration::from_secs(60)));
        tokio_test::assert_pending!(dequeue.poll());

        queue.enqueue(buy("A"));
        assert!(dequeue.is_woken());
        let signal = tokio_test::assert_ready!(dequeue.poll());
        assert_eq!(signal.unwrap().ticker, "A");
    }

    #[test]
    fn test_enqueue_never_blocks_without_consumer() {
        // No runtime, no consumer: enqueue still returns immediately.
        let queue = SignalQueue::new();
        for i in 0..10_000 {
            queue.enqueue(buy(&format!("T{i}")));
        }
        assert_eq!(queue.len(), 10_000);
    }

    #[tokio::test]
    async fn test_many_producers_single_consumer() {
        let queue = Arc::new(SignalQueue::new());
        let mut producers = Vec::new();
        for p in 0..8 {
            let queue = Arc::clone(&queue);
            producers.push(std::thread::spawn(move || {
                for i in 0..100 {
                    queue.enqueue(buy(&format!("P{p}-{i}")));
                }
            }));
        }
        for producer in producers {
            producer.join().unwrap();
        }

        let mut received = 0;
        while queue.dequeue(Duration::from_millis(10)).await.is_some() {
            received += 1;
        }
        assert_eq!(received, 800);
    }
}
