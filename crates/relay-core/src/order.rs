//! Order-related types.
//!
//! Provides order side, price mode, the request sent to the broker and the
//! result it produced.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// How the order is priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "mode", content = "price")]
pub enum PriceMode {
    /// Market order, no price.
    Market,
    /// Limit order at the given price.
    Limit(Decimal),
}

impl PriceMode {
    /// A price of exactly zero selects market mode, any other value a limit.
    #[must_use]
    pub fn from_price(price: Decimal) -> Self {
        if price.is_zero() {
            Self::Market
        } else {
            Self::Limit(price)
        }
    }

    /// Limit price, if any.
    #[must_use]
    pub fn limit_price(&self) -> Option<Decimal> {
        match self {
            Self::Market => None,
            Self::Limit(price) => Some(*price),
        }
    }
}

impl fmt::Display for PriceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Market => write!(f, "market"),
            Self::Limit(price) => write!(f, "limit@{price}"),
        }
    }
}

/// A single order destined for the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub side: OrderSide,
    pub ticker: String,
    /// Always at least 1 for a submitted order.
    pub quantity: u64,
    pub price_mode: PriceMode,
}

impl OrderRequest {
    #[must_use]
    pub fn new(side: OrderSide, ticker: impl Into<String>, quantity: u64, price: Decimal) -> Self {
        Self {
            side,
            ticker: ticker.into(),
            quantity,
            price_mode: PriceMode::from_price(price),
        }
    }
}

impl fmt::Display for OrderRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} x{} ({})",
            self.side, self.ticker, self.quantity, self.price_mode
        )
    }
}

/// Outcome of one order submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderResult {
    /// Broker accepted the order.
    Success { order_id: String },
    /// Broker refused the order. Terminal, never retried.
    Rejected { code: String, msg: String },
    /// The request did not complete.
    TransportError { detail: String },
}

impl OrderResult {
    /// Code used when no token could be obtained for the request.
    pub const AUTH_FAILURE_CODE: &'static str = "AUTH";
    /// Code used when a request asks for zero shares.
    pub const INVALID_QUANTITY_CODE: &'static str = "QTY";

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Rejection caused by a failed token acquisition.
    #[must_use]
    pub fn auth_failure(msg: impl Into<String>) -> Self {
        Self::Rejected {
            code: Self::AUTH_FAILURE_CODE.to_string(),
            msg: msg.into(),
        }
    }
}

impl fmt::Display for OrderResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { order_id } => write!(f, "accepted (order_id={order_id})"),
            Self::Rejected { code, msg } => write!(f, "rejected [{code}] {msg}"),
            Self::TransportError { detail } => write!(f, "transport error: {detail}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_zero_price_selects_market() {
        assert_eq!(PriceMode::from_price(dec!(0)), PriceMode::Market);
        assert_eq!(PriceMode::from_price(dec!(0.00)), PriceMode::Market);
        assert_eq!(
            PriceMode::from_price(dec!(50000)),
            PriceMode::Limit(dec!(50000))
        );
    }

    #[test]
    fn test_limit_price() {
        assert_eq!(PriceMode::Market.limit_price(), None);
        assert_eq!(PriceMode::Limit(dec!(1.5)).limit_price(), Some(dec!(1.5)));
    }

    #[test]
    fn test_auth_failure_is_rejection() {
        let result = OrderResult::auth_failure("no token");
        assert!(!result.is_success());
        assert!(matches!(result, OrderResult::Rejected { ref code, .. } if code == "AUTH"));
    }

    #[test]
    fn test_order_request_display() {
        let req = OrderRequest::new(OrderSide::Sell, "005930", 3, dec!(0));
        assert_eq!(req.to_string(), "sell 005930 x3 (market)");
    }
}
