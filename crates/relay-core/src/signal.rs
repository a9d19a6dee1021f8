//! Trading signals and action classification.
//!
//! A `Signal` is the normalized form of one inbound alert. The free-form
//! action text is classified into a `SignalAction` exactly once, when the
//! signal is built; every later stage dispatches on the enum.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a received signal, used for log correlation.
///
/// Format: `sig_{timestamp_ms}_{uuid_short}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalId(String);

impl SignalId {
    /// Create a new unique signal ID.
    pub fn new() -> Self {
        let ts = Utc::now().timestamp_millis();
        let uuid_short = &Uuid::new_v4().to_string()[..8];
        Self(format!("sig_{ts}_{uuid_short}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SignalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Portion of a held position that a sell-class action liquidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SellPortion {
    /// Half the holding, rounded half-to-even (partial profit).
    Half,
    /// The entire holding.
    All,
    /// 30% of the holding, floored (non-final stop loss).
    StopLossFraction,
    /// A third of the holding, floored (unclassified exit).
    Third,
}

/// Classified alert action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalAction {
    /// Entry signal. Competes for a slot in the ranking window.
    Buy,
    /// First profit target (partial exit).
    ProfitTarget1,
    /// Second profit target (full exit).
    ProfitTarget2,
    /// First stop loss (partial exit).
    StopLoss1,
    /// Second stop loss (partial exit).
    StopLoss2,
    /// Final exit (full exit).
    FinalExit,
    /// Final stop loss (full exit).
    FinalStopLoss,
    /// Exit at breakeven (full exit).
    ExitBreakeven,
    /// Unrecognized action text.
    ///
    /// `exit_like` records whether the text carried a generic exit keyword
    /// (profit, stop, exit, sell, close); such actions sell with the default ratio.
    Other { label: String, exit_like: bool },
}

impl SignalAction {
    /// Classify free-form action text.
    ///
    /// Matching is case-insensitive and ignores punctuation and spacing, so
    /// "Profit Target 1", "profit_target_1" and "TP1" are the same action.
    /// Exit classes are checked before `Buy`.
    pub fn classify(raw: &str) -> Self {
        let compact: String = raw
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();
        let has = |needles: &[&str]| needles.iter().any(|n| compact.contains(n));

        if has(&["finalstop", "finalsl"]) {
            Self::FinalStopLoss
        } else if has(&["finalexit"]) {
            Self::FinalExit
        } else if has(&["breakeven"]) {
            Self::ExitBreakeven
        } else if has(&["profittarget2", "takeprofit2", "tp2"]) {
            Self::ProfitTarget2
        } else if has(&["profittarget1", "takeprofit1", "tp1"]) {
            Self::ProfitTarget1
        } else if has(&["stoploss2", "sl2"]) {
            Self::StopLoss2
        } else if has(&["stoploss1", "sl1", "stoploss"]) {
            Self::StopLoss1
        } else if has(&["buy"]) {
            Self::Buy
        } else {
            Self::Other {
                label: raw.trim().to_string(),
                exit_like: has(&["profit", "stop", "exit", "sell", "close"]),
            }
        }
    }

    /// Returns true for entry signals.
    #[must_use]
    pub fn is_buy(&self) -> bool {
        matches!(self, Self::Buy)
    }

    /// Returns true for the recognized sell-class actions.
    ///
    /// Unclassified exits are not sell-class, see [`Self::is_exit`].
    #[must_use]
    pub fn is_sell_class(&self) -> bool {
        matches!(
            self,
            Self::ProfitTarget1
                | Self::ProfitTarget2
                | Self::StopLoss1
                | Self::StopLoss2
                | Self::FinalExit
                | Self::FinalStopLoss
                | Self::ExitBreakeven
        )
    }

    /// Returns true for any action that reduces a position.
    #[must_use]
    pub fn is_exit(&self) -> bool {
        match self {
            Self::Other { exit_like, .. } => *exit_like,
            other => other.is_sell_class(),
        }
    }

    /// Portion of the holding to sell, or `None` for non-exit actions.
    #[must_use]
    pub fn sell_portion(&self) -> Option<SellPortion> {
        match self {
            Self::Buy => None,
            Self::ProfitTarget1 => Some(SellPortion::Half),
            Self::ProfitTarget2 | Self::FinalExit | Self::FinalStopLoss | Self::ExitBreakeven => {
                Some(SellPortion::All)
            }
            Self::StopLoss1 | Self::StopLoss2 => Some(SellPortion::StopLossFraction),
            Self::Other { exit_like: true, .. } => Some(SellPortion::Third),
            Self::Other { exit_like: false, .. } => None,
        }
    }
}

impl fmt::Display for SignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "Buy"),
            Self::ProfitTarget1 => write!(f, "ProfitTarget1"),
            Self::ProfitTarget2 => write!(f, "ProfitTarget2"),
            Self::StopLoss1 => write!(f, "StopLoss1"),
            Self::StopLoss2 => write!(f, "StopLoss2"),
            Self::FinalExit => write!(f, "FinalExit"),
            Self::FinalStopLoss => write!(f, "FinalStopLoss"),
            Self::ExitBreakeven => write!(f, "ExitBreakeven"),
            Self::Other { label, .. } => write!(f, "Other({label})"),
        }
    }
}

/// A normalized trading alert.
///
/// Signals are never mutated after construction; stages pass them by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Correlation ID.
    pub id: SignalId,
    /// Broker ticker (exchange prefix already stripped).
    pub ticker: String,
    /// Classified action.
    pub action: SignalAction,
    /// Alert price. Zero when the alert carried none.
    pub price: Decimal,
    /// Ranking score. Defaults to 0.
    pub score: f64,
    /// Optional stop price used as the sell limit.
    pub stop_price: Option<Decimal>,
    /// Optional market country code.
    pub country: Option<String>,
    /// When the relay accepted the alert.
    pub received_at: DateTime<Utc>,
}

impl Signal {
    /// Create a signal with default score and no stop price or country.
    pub fn new(ticker: impl Into<String>, action: SignalAction, price: Decimal) -> Self {
        Self {
            id: SignalId::new(),
            ticker: ticker.into(),
            action,
            price,
            score: 0.0,
            stop_price: None,
            country: None,
            received_at: Utc::now(),
        }
    }

    /// Set the ranking score.
    #[must_use]
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    /// Set the stop price. Zero is treated as "no stop".
    #[must_use]
    pub fn with_stop_price(mut self, stop: Decimal) -> Self {
        self.stop_price = (!stop.is_zero()).then_some(stop);
        self
    }

    /// Set the market country code.
    #[must_use]
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }
}
