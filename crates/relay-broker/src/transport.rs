//! Broker transport trait.
//!
//! Abstracts the raw HTTP calls so the client's token and retry logic can be
//! exercised without a network:
//! - [`crate::RestTransport`] talks to the real REST API
//! - [`MockTransport`] replays scripted replies and records every call

use std::collections::{HashMap, VecDeque};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Credentials;
use crate::error::{BrokerError, BrokerResult};
use crate::wire::{Holding, OrderReply, OrderWire, Withdrawable, WithdrawableQuery};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Raw broker calls. Implementations never retry.
pub trait BrokerTransport: Send + Sync {
    /// Exchange credentials for a bearer token value.
    fn request_token(&self, credentials: Credentials) -> BoxFuture<'_, BrokerResult<String>>;

    /// Post one order.
    fn submit_order(
        &self,
        token: String,
        order: OrderWire,
    ) -> BoxFuture<'_, BrokerResult<OrderReply>>;

    /// Fetch all held positions.
    fn fetch_holdings(&self, token: String) -> BoxFuture<'_, BrokerResult<Vec<Holding>>>;

    /// Fetch affordability for one ticker at one price.
    fn fetch_withdrawable(
        &self,
        token: String,
        query: WithdrawableQuery,
    ) -> BoxFuture<'_, BrokerResult<Withdrawable>>;
}

/// Arc wrapper for BrokerTransport trait objects.
pub type DynTransport = Arc<dyn BrokerTransport>;

/// Mock transport for testing.
///
/// Replies are consumed front to back; when a script runs dry the mock
/// answers with a fresh token or an accepted order.
#[derive(Debug, Default)]
pub struct MockTransport {
    token_replies: Mutex<VecDeque<BrokerResult<String>>>,
    order_replies: Mutex<VecDeque<BrokerResult<OrderReply>>>,
    holdings: Mutex<HashMap<String, u64>>,
    holdings_error: Mutex<Option<BrokerError>>,
    withdrawable: Mutex<HashMap<String, Withdrawable>>,
    withdrawable_error: Mutex<Option<BrokerError>>,
    /// Recorded (token, order) pairs.
    orders: Mutex<Vec<(String, OrderWire)>>,
    token_requests: AtomicU64,
    next_order_no: AtomicU64,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a token reply.
    pub fn push_token_reply(&self, reply: BrokerResult<String>) {
        self.token_replies.lock().push_back(reply);
    }

    /// Queue an order reply.
    pub fn push_order_reply(&self, reply: BrokerResult<OrderReply>) {
        self.order_replies.lock().push_back(reply);
    }

    /// Set the held quantity for a ticker.
    pub fn set_holding(&self, ticker: &str, quantity: u64) {
        self.holdings.lock().insert(ticker.to_string(), quantity);
    }

    /// Make every holdings query fail.
    pub fn fail_holdings(&self, error: BrokerError) {
        *self.holdings_error.lock() = Some(error);
    }

    /// Set the affordability answer for a ticker.
    pub fn set_withdrawable(&self, ticker: &str, withdrawable: Withdrawable) {
        self.withdrawable.lock().insert(ticker.to_string(), withdrawable);
    }

    /// Make every withdrawable query fail.
    pub fn fail_withdrawable(&self, error: BrokerError) {
        *self.withdrawable_error.lock() = Some(error);
    }

    /// Number of token requests received.
    pub fn token_requests(&self) -> u64 {
        self.token_requests.load(Ordering::SeqCst)
    }

    /// Recorded orders with the token they were sent with.
    pub fn orders(&self) -> Vec<(String, OrderWire)> {
        self.orders.lock().clone()
    }

    /// Recorded order bodies only.
    pub fn order_bodies(&self) -> Vec<OrderWire> {
        self.orders.lock().iter().map(|(_, o)| o.clone()).collect()
    }
}

impl BrokerTransport for MockTransport {
    fn request_token(&self, _credentials: Credentials) -> BoxFuture<'_, BrokerResult<String>> {
        Box::pin(async move {
            let n = self.token_requests.fetch_add(1, Ordering::SeqCst) + 1;
            self.token_replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(format!("mock-token-{n}")))
        })
    }

    fn submit_order(
        &self,
        token: String,
        order: OrderWire,
    ) -> BoxFuture<'_, BrokerResult<OrderReply>> {
        Box::pin(async move {
            self.orders.lock().push((token, order));
            self.order_replies.lock().pop_front().unwrap_or_else(|| {
                let n = self.next_order_no.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(OrderReply::accepted(format!("{n:07}")))
            })
        })
    }

    fn fetch_holdings(&self, _token: String) -> BoxFuture<'_, BrokerResult<Vec<Holding>>> {
        Box::pin(async move {
            if let Some(error) = self.holdings_error.lock().clone() {
                return Err(error);
            }
            Ok(self
                .holdings
                .lock()
                .iter()
                .map(|(ticker, quantity)| Holding {
                    ticker: ticker.clone(),
                    quantity: *quantity,
                })
                .collect())
        })
    }

    fn fetch_withdrawable(
        &self,
        _token: String,
        query: WithdrawableQuery,
    ) -> BoxFuture<'_, BrokerResult<Withdrawable>> {
        Box::pin(async move {
            if let Some(error) = self.withdrawable_error.lock().clone() {
                return Err(error);
            }
            Ok(self
                .withdrawable
                .lock()
                .get(&query.stk_cd)
                .copied()
                .unwrap_or_default())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::{OrderRequest, OrderSide};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_mock_defaults() {
        let mock = MockTransport::new();

        let token = mock.request_token(Credentials::default()).await.unwrap();
        assert_eq!(token, "mock-token-1");
        assert_eq!(mock.token_requests(), 1);

        let req = OrderRequest::new(OrderSide::Buy, "005930", 1, dec!(100));
        let reply = mock
            .submit_order(token.clone(), OrderWire::from_request(&req, "KRX"))
            .await
            .unwrap();
        assert!(reply.is_success());
        assert_eq!(mock.orders().len(), 1);
        assert_eq!(mock.orders()[0].0, token);
    }

    #[tokio::test]
    async fn test_mock_scripted_replies_are_consumed_in_order() {
        let mock = MockTransport::new();
        mock.push_order_reply(Ok(OrderReply::refused("8005", "expired")));
        mock.push_order_reply(Err(BrokerError::HttpClient("reset".to_string())));

        let req = OrderRequest::new(OrderSide::Sell, "005930", 1, dec!(0));
        let wire = OrderWire::from_request(&req, "KRX");

        let first = mock.submit_order("t".to_string(), wire.clone()).await;
        assert_eq!(first.unwrap().return_code, "8005");
        let second = mock.submit_order("t".to_string(), wire.clone()).await;
        assert!(second.is_err());
        let third = mock.submit_order("t".to_string(), wire).await;
        assert!(third.unwrap().is_success());
    }

    #[tokio::test]
    async fn test_mock_queries() {
        let mock = MockTransport::new();
        mock.set_holding("005930", 10);
        mock.set_withdrawable(
            "005930",
            Withdrawable {
                available_cash: dec!(750000),
                max_quantity: 15,
            },
        );

        let holdings = mock.fetch_holdings("t".to_string()).await.unwrap();
        assert_eq!(holdings.len(), 1);

        let w = mock
            .fetch_withdrawable("t".to_string(), WithdrawableQuery::buy("005930", dec!(50000)))
            .await
            .unwrap();
        assert_eq!(w.max_quantity, 15);

        mock.fail_holdings(BrokerError::Unauthorized);
        assert_eq!(
            mock.fetch_holdings("t".to_string()).await,
            Err(BrokerError::Unauthorized)
        );
    }
}
