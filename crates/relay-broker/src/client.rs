//! Authenticated broker client.
//!
//! Owns the bearer token lifecycle:
//! `absent -> acquired on first need -> invalidated on expiry -> re-acquired`.
//!
//! Order submission allows at most one retry, and only after the broker
//! reported an expired token. Every other failure is returned as-is.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use relay_core::{OrderRequest, OrderResult, OrderSide};
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use crate::config::{BrokerConfig, Credentials};
use crate::error::BrokerError;
use crate::transport::DynTransport;
use crate::wire::{OrderReply, OrderWire, Withdrawable, WithdrawableQuery};

/// A bearer token and when it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub value: String,
    pub acquired_at: DateTime<Utc>,
}

/// How the broker signals an expired token.
#[derive(Debug, Clone, Default)]
pub struct ExpiryRules {
    codes: Vec<String>,
    markers: Vec<String>,
}

impl ExpiryRules {
    pub fn new(codes: Vec<String>, markers: Vec<String>) -> Self {
        Self {
            codes,
            markers: markers.into_iter().map(|m| m.to_lowercase()).collect(),
        }
    }

    /// True if the code is an expiry code or the message contains a marker.
    pub fn is_expiry(&self, code: &str, msg: &str) -> bool {
        if self.codes.iter().any(|c| c == code) {
            return true;
        }
        let msg = msg.to_lowercase();
        self.markers.iter().any(|m| !m.is_empty() && msg.contains(m))
    }
}

/// Position in the bounded submit loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    First,
    Retried,
}

/// Classification of one transport answer.
enum Verdict {
    Done(OrderResult),
    Expired { code: String, msg: String },
}

/// Broker client shared by the worker.
pub struct BrokerClient {
    transport: DynTransport,
    credentials: Credentials,
    expiry: ExpiryRules,
    exchange: String,
    token: Mutex<Option<AuthToken>>,
    token_acquisitions: AtomicU64,
}

impl BrokerClient {
    pub fn new(transport: DynTransport, credentials: Credentials, config: &BrokerConfig) -> Self {
        Self {
            transport,
            credentials,
            expiry: ExpiryRules::new(config.expiry_codes.clone(), config.expiry_markers.clone()),
            exchange: config.exchange.clone(),
            token: Mutex::new(None),
            token_acquisitions: AtomicU64::new(0),
        }
    }

    /// Exchange credentials for a fresh token and cache it.
    ///
    /// Returns `None` on missing credentials or any failure. Never retries.
    pub async fn get_token(&self) -> Option<AuthToken> {
        if !self.credentials.can_authenticate() {
            let err = BrokerError::MissingCredentials(self.credentials.missing().join(", "));
            error!(error = %err, "Token acquisition skipped");
            return None;
        }

        match self.transport.request_token(self.credentials.clone()).await {
            Ok(value) if !value.is_empty() => {
                let token = AuthToken {
                    value,
                    acquired_at: Utc::now(),
                };
                *self.token.lock() = Some(token.clone());
                self.token_acquisitions.fetch_add(1, Ordering::Relaxed);
                info!("Token acquired");
                Some(token)
            }
            Ok(_) => {
                warn!("Token response was empty");
                None
            }
            Err(e) => {
                warn!(error = %e, "Token acquisition failed");
                None
            }
        }
    }

    /// Cached token value, acquiring one if absent.
    async fn current_token(&self) -> Option<String> {
        let cached = self.token.lock().as_ref().map(|t| t.value.clone());
        match cached {
            Some(value) => Some(value),
            None => self.get_token().await.map(|t| t.value),
        }
    }

    /// Drop the cached token so the next call re-acquires it.
    pub fn invalidate_token(&self) {
        if self.token.lock().take().is_some() {
            debug!("Token invalidated");
        }
    }

    /// Snapshot of the cached token.
    pub fn token(&self) -> Option<AuthToken> {
        self.token.lock().clone()
    }

    /// Number of successful token acquisitions since start.
    pub fn token_acquisitions(&self) -> u64 {
        self.token_acquisitions.load(Ordering::Relaxed)
    }

    /// Submit an order.
    ///
    /// A price of exactly zero is a market order. With `retry_on_expiry`, an
    /// expiry answer invalidates the token, re-acquires it and resubmits once;
    /// the resubmission itself never retries.
    pub async fn send_order(
        &self,
        side: OrderSide,
        ticker: &str,
        price: Decimal,
        quantity: u64,
        retry_on_expiry: bool,
    ) -> OrderResult {
        let request = OrderRequest::new(side, ticker, quantity, price);
        self.submit(&request, retry_on_expiry).await
    }

    /// Submit a prepared request. See [`Self::send_order`].
    ///
    /// A zero quantity is rejected locally without contacting the broker.
    pub async fn submit(&self, request: &OrderRequest, retry_on_expiry: bool) -> OrderResult {
        if request.quantity == 0 {
            warn!(order = %request, "Refusing order with zero quantity");
            return OrderResult::Rejected {
                code: OrderResult::INVALID_QUANTITY_CODE.to_string(),
                msg: "quantity must be positive".to_string(),
            };
        }

        let mut attempt = Attempt::First;
        loop {
            let Some(token) = self.current_token().await else {
                return OrderResult::auth_failure("token unavailable");
            };

            info!(order = %request, attempt = ?attempt, "Submitting order");
            let wire = OrderWire::from_request(request, &self.exchange);
            let reply = self.transport.submit_order(token, wire).await;

            match self.classify(reply) {
                Verdict::Done(result) => {
                    match &result {
                        OrderResult::Success { order_id } => {
                            info!(order = %request, order_id = %order_id, "Order accepted")
                        }
                        other => warn!(order = %request, result = %other, "Order failed"),
                    }
                    return result;
                }
                Verdict::Expired { code, msg } => {
                    self.invalidate_token();
                    if retry_on_expiry && attempt == Attempt::First {
                        warn!(
                            code = %code,
                            msg = %msg,
                            "Token expired, re-authenticating and retrying once"
                        );
                        attempt = Attempt::Retried;
                        continue;
                    }
                    warn!(
                        code = %code,
                        msg = %msg,
                        order = %request,
                        "Token expired, not retrying"
                    );
                    return OrderResult::Rejected { code, msg };
                }
            }
        }
    }

    fn classify(&self, reply: Result<OrderReply, BrokerError>) -> Verdict {
        match reply {
            Ok(reply) if reply.is_success() => Verdict::Done(OrderResult::Success {
                order_id: reply.order_id.unwrap_or_default(),
            }),
            Ok(reply) if self.expiry.is_expiry(&reply.return_code, &reply.return_msg) => {
                Verdict::Expired {
                    code: reply.return_code,
                    msg: reply.return_msg,
                }
            }
            Ok(reply) => Verdict::Done(OrderResult::Rejected {
                code: reply.return_code,
                msg: reply.return_msg,
            }),
            Err(BrokerError::Unauthorized) => Verdict::Expired {
                code: "401".to_string(),
                msg: "unauthorized".to_string(),
            },
            Err(BrokerError::Rejected { code, msg }) if self.expiry.is_expiry(&code, &msg) => {
                Verdict::Expired { code, msg }
            }
            Err(BrokerError::Rejected { code, msg }) => {
                Verdict::Done(OrderResult::Rejected { code, msg })
            }
            Err(e) => Verdict::Done(OrderResult::TransportError {
                detail: e.to_string(),
            }),
        }
    }

    /// Held quantity for a ticker.
    ///
    /// Returns 0 on any failure, so "no holding" and "query failed" look the same.
    pub async fn get_balance(&self, ticker: &str) -> u64 {
        let Some(token) = self.current_token().await else {
            return 0;
        };
        match self.transport.fetch_holdings(token).await {
            Ok(holdings) => holdings
                .iter()
                .find(|h| h.ticker == ticker)
                .map(|h| h.quantity)
                .unwrap_or(0),
            Err(e) => {
                self.note_query_failure("balance", &e);
                0
            }
        }
    }

    /// Affordable cash and quantity for a buy of `ticker` at `price`.
    ///
    /// Returns zeroed values on any failure.
    pub async fn get_withdrawable(&self, ticker: &str, price: Decimal) -> Withdrawable {
        let Some(token) = self.current_token().await else {
            return Withdrawable::default();
        };
        match self
            .transport
            .fetch_withdrawable(token, WithdrawableQuery::buy(ticker, price))
            .await
        {
            Ok(withdrawable) => withdrawable,
            Err(e) => {
                self.note_query_failure("withdrawable", &e);
                Withdrawable::default()
            }
        }
    }

    /// Log a failed query and drop the token if it was the cause.
    fn note_query_failure(&self, query: &'static str, error: &BrokerError) {
        warn!(query, error = %error, "Broker query failed, using zeroed defaults");
        let expired = match error {
            BrokerError::Unauthorized => true,
            BrokerError::Rejected { code, msg } => self.expiry.is_expiry(code, msg),
            _ => false,
        };
        if expired {
            self.invalidate_token();
        }
    }
}
