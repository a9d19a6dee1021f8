//! Execution outcome types.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::order::{OrderRequest, OrderResult};

/// Reason the execution engine did not submit an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkipReason {
    /// Buy signal without a positive price.
    InvalidPrice,
    /// Computed quantity was zero (nothing affordable).
    ZeroQuantity,
    /// Sell signal for a ticker with no holding.
    NoHolding,
    /// Signal for a market outside the configured domestic country.
    NonDomesticMarket,
    /// Action carries no order intent.
    NotActionable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPrice => write!(f, "invalid_price"),
            Self::ZeroQuantity => write!(f, "zero_quantity"),
            Self::NoHolding => write!(f, "no_holding"),
            Self::NonDomesticMarket => write!(f, "non_domestic_market"),
            Self::NotActionable => write!(f, "not_actionable"),
        }
    }
}

/// What happened to one signal in the execution engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionOutcome {
    /// An order was submitted; `result` is the broker's answer.
    Placed {
        request: OrderRequest,
        result: OrderResult,
    },
    /// No order was submitted.
    Skipped(SkipReason),
}

impl ExecutionOutcome {
    /// The submitted request, if any.
    #[must_use]
    pub fn request(&self) -> Option<&OrderRequest> {
        match self {
            Self::Placed { request, .. } => Some(request),
            Self::Skipped(_) => None,
        }
    }

    /// True if an order was submitted and accepted.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Placed { result, .. } if result.is_success())
    }
}
