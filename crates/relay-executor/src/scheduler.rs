//! Buy-ranking batch scheduler.
//!
//! State machine driven by the worker:
//!
//! ```text
//! Idle --first buy--> Buffering{deadline} --deadline elapsed--> flush --> Idle
//! ```
//!
//! - The deadline is set when the buffer goes from empty to non-empty and is
//!   never pushed back by later buys.
//! - Exits bypass the buffer and execute at once, ahead of any pending flush.
//! - A flush ranks buffered buys by score (stable, so ties keep arrival
//!   order), executes the top `max_buy_rank` one by one with spacing, and
//!   drops the rest.

use std::sync::Arc;

use relay_core::{ExecutionOutcome, Signal};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::BatchConfig;
use crate::engine::ExecutionEngine;

// ============================================================================
// SchedulerState
// ============================================================================

/// Observable scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Buffer empty, no deadline.
    Idle,
    /// At least one buy buffered.
    Buffering { deadline: Instant },
}

// ============================================================================
// RankingBuffer
// ============================================================================

/// Result of ranking one buffering window.
#[derive(Debug, Clone, Default)]
pub struct Ranking {
    /// Buys to execute, best score first.
    pub winners: Vec<Signal>,
    /// Buys above the threshold that did not make the cut.
    pub dropped: Vec<Signal>,
    /// Buys at or below the threshold.
    pub below_threshold: Vec<Signal>,
}

/// Pending buys plus the window deadline.
///
/// The deadline is set only on the empty to non-empty transition and
/// cleared only by [`RankingBuffer::drain_ranked`].
#[derive(Debug, Default)]
pub struct RankingBuffer {
    pending: Vec<Signal>,
    deadline: Option<Instant>,
}

impl RankingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer a buy. Opens the window if the buffer was empty.
    pub fn push(&mut self, signal: Signal, now: Instant, window: std::time::Duration) {
        if self.pending.is_empty() {
            self.deadline = Some(now + window);
        }
        self.pending.push(signal);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// True once the window deadline has passed.
    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Empty the buffer and rank its contents.
    ///
    /// Only buys scoring strictly above `threshold` are ranked.
    pub fn drain_ranked(&mut self, threshold: f64, max_rank: usize) -> Ranking {
        self.deadline = None;
        let (mut ranked, below_threshold): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|signal| signal.score > threshold);

        // sort_by is stable: equal scores keep arrival order.
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        let dropped = if ranked.len() > max_rank {
            ranked.split_off(max_rank)
        } else {
            Vec::new()
        };

        Ranking {
            winners: ranked,
            dropped,
            below_threshold,
        }
    }
}

// ============================================================================
// BatchScheduler
// ============================================================================

/// What one flush did.
#[derive(Debug, Clone, Default)]
pub struct FlushReport {
    /// Executed winners with their outcomes, in execution order.
    pub executed: Vec<(Signal, ExecutionOutcome)>,
    /// Ranked out by `max_buy_rank`.
    pub dropped: Vec<Signal>,
    /// Filtered out by the score threshold.
    pub below_threshold: Vec<Signal>,
}

impl FlushReport {
    /// Tickers of the executed winners, in execution order.
    pub fn winner_tickers(&self) -> Vec<&str> {
        self.executed
            .iter()
            .map(|(signal, _)| signal.ticker.as_str())
            .collect()
    }
}

/// Owns the ranking buffer. Driven by a single worker, so no locking.
pub struct BatchScheduler {
    engine: Arc<ExecutionEngine>,
    config: BatchConfig,
    buffer: RankingBuffer,
}

impl BatchScheduler {
    pub fn new(engine: Arc<ExecutionEngine>, config: BatchConfig) -> Self {
        Self {
            engine,
            config,
            buffer: RankingBuffer::new(),
        }
    }

    pub fn state(&self) -> SchedulerState {
        match self.buffer.deadline() {
            Some(deadline) => SchedulerState::Buffering { deadline },
            None => SchedulerState::Idle,
        }
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Route one dequeued signal.
    ///
    /// Buys are buffered. Exits execute now, followed by the sell cooldown,
    /// and their outcome is returned. Anything else is ignored.
    pub async fn on_signal(&mut self, signal: Signal, now: Instant) -> Option<ExecutionOutcome> {
        if signal.action.is_buy() {
            debug!(
                signal_id = %signal.id,
                ticker = %signal.ticker,
                score = signal.score,
                "Buffering buy"
            );
            self.buffer.push(signal, now, self.config.buffer_window());
            if let SchedulerState::Buffering { deadline } = self.state() {
                debug!(
                    buffered = self.buffer.len(),
                    flush_in_ms = deadline.saturating_duration_since(now).as_millis() as u64,
                    "Buy window open"
                );
            }
            return None;
        }

        if signal.action.is_exit() {
            info!(
                signal_id = %signal.id,
                ticker = %signal.ticker,
                action = %signal.action,
                buffered = self.buffer.len(),
                "Executing exit immediately"
            );
            let outcome = self.engine.execute(&signal).await;
            info!(ticker = %signal.ticker, outcome = ?outcome, "Exit handled");
            tokio::time::sleep(self.config.sell_cooldown()).await;
            return Some(outcome);
        }

        info!(
            signal_id = %signal.id,
            action = %signal.action,
            "Ignoring signal without order intent"
        );
        None
    }

    /// Flush if the window deadline has passed.
    pub async fn poll(&mut self, now: Instant) -> Option<FlushReport> {
        if !self.buffer.is_due(now) {
            return None;
        }
        Some(self.flush().await)
    }

    /// Rank the buffered buys and execute the winners sequentially.
    pub async fn flush(&mut self) -> FlushReport {
        let ranking = self
            .buffer
            .drain_ranked(self.config.score_threshold, self.config.max_buy_rank);

        info!(
            winners = ranking.winners.len(),
            dropped = ranking.dropped.len(),
            below_threshold = ranking.below_threshold.len(),
            "Flushing buy window"
        );
        for signal in &ranking.below_threshold {
            info!(
                ticker = %signal.ticker,
                score = signal.score,
                threshold = self.config.score_threshold,
                "Buy below score threshold, excluded"
            );
        }
        for signal in &ranking.dropped {
            warn!(
                ticker = %signal.ticker,
                score = signal.score,
                max_rank = self.config.max_buy_rank,
                "Buy ranked out, dropped"
            );
        }

        let mut executed = Vec::with_capacity(ranking.winners.len());
        for (rank, signal) in ranking.winners.into_iter().enumerate() {
            info!(
                rank = rank + 1,
                ticker = %signal.ticker,
                score = signal.score,
                "Executing ranked buy"
            );
            let outcome = self.engine.execute(&signal).await;
            debug!(ticker = %signal.ticker, outcome = ?outcome, "Ranked buy handled");
            executed.push((signal, outcome));
            tokio::time::sleep(self.config.order_spacing()).await;
        }

        FlushReport {
            executed,
            dropped: ranking.dropped,
            below_threshold: ranking.below_threshold,
        }
    }
}
