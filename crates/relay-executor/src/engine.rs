//! Order execution engine.
//!
//! Turns one signal into at most one broker order:
//! - buys are sized from the target spend, clamped to what the account can afford
//! - sells are sized from the held quantity and the action's [`SellPortion`]
//!
//! The engine never retries. Token expiry retries live in the broker client.

use std::sync::Arc;

use relay_broker::BrokerClient;
use relay_core::{ExecutionOutcome, OrderRequest, OrderSide, SellPortion, Signal, SkipReason};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::config::ExecutionConfig;

/// Quantity to sell out of `holding` for the given portion.
///
/// Every portion sells at least one share when anything is held.
/// The half split rounds half to even (3 -> 2, 5 -> 2).
#[must_use]
pub fn sell_quantity(holding: u64, portion: SellPortion) -> u64 {
    if holding == 0 {
        return 0;
    }
    let qty = match portion {
        SellPortion::Half => {
            let half = holding / 2;
            if holding % 2 == 1 && half % 2 == 1 {
                half + 1
            } else {
                half
            }
        }
        SellPortion::All => holding,
        SellPortion::StopLossFraction => {
            u64::try_from(u128::from(holding) * 3 / 10).unwrap_or(u64::MAX)
        }
        SellPortion::Third => holding / 3,
    };
    qty.max(1)
}

/// Shares a buy of `target` at `price` should ask for, at least one.
///
/// Returns `None` when the price is not positive.
#[must_use]
pub fn desired_buy_quantity(target: Decimal, price: Decimal) -> Option<u64> {
    if price <= Decimal::ZERO {
        return None;
    }
    let qty = target
        .checked_div(price)
        .map(|q| q.floor())
        .and_then(|q| q.to_u64())
        .unwrap_or(u64::MAX);
    Some(qty.max(1))
}

/// Executes signals against the broker.
pub struct ExecutionEngine {
    broker: Arc<BrokerClient>,
    config: ExecutionConfig,
}

impl ExecutionEngine {
    pub fn new(broker: Arc<BrokerClient>, config: ExecutionConfig) -> Self {
        Self { broker, config }
    }

    pub fn broker(&self) -> &Arc<BrokerClient> {
        &self.broker
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Execute any signal: buys, exits, or a `NotActionable` skip.
    pub async fn execute(&self, signal: &Signal) -> ExecutionOutcome {
        if let Some(skip) = self.market_filter(signal) {
            return skip;
        }
        if signal.action.is_buy() {
            self.execute_buy(signal).await
        } else if signal.action.is_exit() {
            self.execute_sell(signal).await
        } else {
            info!(
                signal_id = %signal.id,
                action = %signal.action,
                "Signal carries no order intent"
            );
            ExecutionOutcome::Skipped(SkipReason::NotActionable)
        }
    }

    /// Skip signals for a market other than the configured domestic one.
    ///
    /// A signal without a country is treated as domestic.
    fn market_filter(&self, signal: &Signal) -> Option<ExecutionOutcome> {
        let domestic = self.config.domestic_country.as_deref()?;
        let country = signal.country.as_deref()?;
        if country.eq_ignore_ascii_case(domestic) {
            return None;
        }
        warn!(
            signal_id = %signal.id,
            ticker = %signal.ticker,
            country = %country,
            domestic = %domestic,
            "Non-domestic signal, not executing"
        );
        Some(ExecutionOutcome::Skipped(SkipReason::NonDomesticMarket))
    }

    /// Buy `floor(target / price)` shares, clamped to the affordable quantity,
    /// as a limit order at the signal price.
    pub async fn execute_buy(&self, signal: &Signal) -> ExecutionOutcome {
        let Some(desired) = desired_buy_quantity(self.config.target_buy_amount, signal.price)
        else {
            warn!(
                signal_id = %signal.id,
                ticker = %signal.ticker,
                price = %signal.price,
                "Buy without a positive price, skipping"
            );
            return ExecutionOutcome::Skipped(SkipReason::InvalidPrice);
        };

        let affordable = self.broker.get_withdrawable(&signal.ticker, signal.price).await;
        let quantity = desired.min(affordable.max_quantity);
        if quantity < desired {
            info!(
                ticker = %signal.ticker,
                desired,
                affordable = affordable.max_quantity,
                cash = %affordable.available_cash,
                "Buy quantity clamped to affordable"
            );
        }
        if quantity == 0 {
            warn!(
                signal_id = %signal.id,
                ticker = %signal.ticker,
                "Nothing affordable, skipping buy"
            );
            return ExecutionOutcome::Skipped(SkipReason::ZeroQuantity);
        }

        self.place(OrderRequest::new(OrderSide::Buy, &signal.ticker, quantity, signal.price))
            .await
    }

    /// Sell a portion of the holding, at market or at the stop price.
    pub async fn execute_sell(&self, signal: &Signal) -> ExecutionOutcome {
        let Some(portion) = signal.action.sell_portion() else {
            return ExecutionOutcome::Skipped(SkipReason::NotActionable);
        };

        let holding = self.broker.get_balance(&signal.ticker).await;
        if holding == 0 {
            info!(
                signal_id = %signal.id,
                ticker = %signal.ticker,
                action = %signal.action,
                "No holding, nothing to sell"
            );
            return ExecutionOutcome::Skipped(SkipReason::NoHolding);
        }

        let quantity = sell_quantity(holding, portion);
        let price = signal.stop_price.unwrap_or(Decimal::ZERO);
        info!(
            ticker = %signal.ticker,
            action = %signal.action,
            holding,
            quantity,
            "Sizing sell"
        );

        self.place(OrderRequest::new(OrderSide::Sell, &signal.ticker, quantity, price))
            .await
    }

    async fn place(&self, request: OrderRequest) -> ExecutionOutcome {
        let result = self.broker.submit(&request, true).await;
        ExecutionOutcome::Placed { request, result }
    }
}
