//! Batching and execution configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ExecutorError, ExecutorResult};

/// Configuration for the buy-ranking batcher and the worker loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Length of the buy buffering window, measured from the first buy (ms).
    #[serde(default = "default_buffer_window_ms")]
    pub buffer_window_ms: u64,
    /// Bounded dequeue wait (ms). This is the effective resolution of the
    /// buffering deadline: a flush happens at most this late.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Buys must score strictly above this to be ranked.
    ///
    /// An alert without a score has score 0 and is excluded at the default
    /// of 0. Set a negative value to rank unscored buys.
    #[serde(default)]
    pub score_threshold: f64,
    /// Maximum buys executed per window.
    #[serde(default = "default_max_buy_rank")]
    pub max_buy_rank: usize,
    /// Delay after each buy in a flush (ms).
    #[serde(default = "default_order_spacing_ms")]
    pub order_spacing_ms: u64,
    /// Delay after each immediate sell (ms).
    #[serde(default = "default_sell_cooldown_ms")]
    pub sell_cooldown_ms: u64,
}

fn default_buffer_window_ms() -> u64 {
    10_000
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_max_buy_rank() -> usize {
    3
}

fn default_order_spacing_ms() -> u64 {
    300
}

fn default_sell_cooldown_ms() -> u64 {
    300
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            buffer_window_ms: default_buffer_window_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            score_threshold: 0.0,
            max_buy_rank: default_max_buy_rank(),
            order_spacing_ms: default_order_spacing_ms(),
            sell_cooldown_ms: default_sell_cooldown_ms(),
        }
    }
}

impl BatchConfig {
    pub fn buffer_window(&self) -> Duration {
        Duration::from_millis(self.buffer_window_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn order_spacing(&self) -> Duration {
        Duration::from_millis(self.order_spacing_ms)
    }

    pub fn sell_cooldown(&self) -> Duration {
        Duration::from_millis(self.sell_cooldown_ms)
    }

    pub fn validate(&self) -> ExecutorResult<()> {
        if self.buffer_window_ms == 0 {
            return Err(ExecutorError::InvalidBatchConfig(
                "buffer_window_ms must be positive".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ExecutorError::InvalidBatchConfig(
                "poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.poll_interval_ms > self.buffer_window_ms {
            return Err(ExecutorError::InvalidBatchConfig(format!(
                "poll_interval_ms ({}) exceeds buffer_window_ms ({})",
                self.poll_interval_ms, self.buffer_window_ms
            )));
        }
        if self.max_buy_rank == 0 {
            return Err(ExecutorError::InvalidBatchConfig(
                "max_buy_rank must be at least 1".to_string(),
            ));
        }
        if !self.score_threshold.is_finite() {
            return Err(ExecutorError::InvalidBatchConfig(
                "score_threshold must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for order sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Cash to spend per buy, in account currency.
    #[serde(default = "default_target_buy_amount")]
    pub target_buy_amount: Decimal,
    /// When set, signals carrying a different country code are ranked and
    /// logged but not executed.
    #[serde(default)]
    pub domestic_country: Option<String>,
}

fn default_target_buy_amount() -> Decimal {
    Decimal::from(1_000_000u64)
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            target_buy_amount: default_target_buy_amount(),
            domestic_country: None,
        }
    }
}

impl ExecutionConfig {
    pub fn validate(&self) -> ExecutorResult<()> {
        if self.target_buy_amount <= Decimal::ZERO {
            return Err(ExecutorError::InvalidExecutionConfig(
                "target_buy_amount must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(BatchConfig::default().validate().is_ok());
        assert!(ExecutionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_rank() {
        let config = BatchConfig {
            max_buy_rank: 0,
            ..BatchConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ExecutorError::InvalidBatchConfig(_))
        ));
    }

    #[test]
    fn test_rejects_poll_longer_than_window() {
        let config = BatchConfig {
            buffer_window_ms: 100,
            poll_interval_ms: 500,
            ..BatchConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_positive_target() {
        let config = ExecutionConfig {
            target_buy_amount: Decimal::ZERO,
            domestic_country: None,
        };
        assert!(config.validate().is_err());
    }
}
