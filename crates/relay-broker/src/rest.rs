//! reqwest implementation of [`BrokerTransport`].

use std::time::Duration;

use relay_core::OrderSide;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{BrokerConfig, Credentials};
use crate::error::{BrokerError, BrokerResult};
use crate::transport::{BoxFuture, BrokerTransport};
use crate::wire::{
    parse_holdings, parse_withdrawable, Holding, OrderReply, OrderWire, Withdrawable,
    WithdrawableQuery,
};

const TOKEN_PATH: &str = "/oauth2/token";
const ORDER_PATH: &str = "/api/dostk/ordr";
const ACCOUNT_PATH: &str = "/api/dostk/acnt";

/// Operation id of a buy order.
const API_ID_BUY: &str = "kt10000";
/// Operation id of a sell order.
const API_ID_SELL: &str = "kt10001";
/// Operation id of the account balance query.
const API_ID_BALANCE: &str = "kt00018";
/// Operation id of the withdrawable-amount query.
const API_ID_WITHDRAWABLE: &str = "kt00010";

const CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// Token request body.
#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    appkey: &'a str,
    secretkey: &'a str,
}

/// Balance query body.
#[derive(Debug, Serialize)]
struct BalanceRequest<'a> {
    qry_tp: &'static str,
    dmst_stex_tp: &'a str,
}

/// REST transport for the broker API.
pub struct RestTransport {
    client: Client,
    base_url: String,
    exchange: String,
}

impl RestTransport {
    /// Create a new REST transport.
    pub fn new(config: &BrokerConfig) -> BrokerResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| BrokerError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            exchange: config.exchange.clone(),
        })
    }

    /// POST a JSON body and decode the JSON reply.
    ///
    /// HTTP 401 maps to [`BrokerError::Unauthorized`], any other non-success
    /// status to [`BrokerError::Status`].
    async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        api_id: Option<&str>,
        token: Option<&str>,
        body: &B,
    ) -> BrokerResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .json(body);
        if let Some(api_id) = api_id {
            request = request.header("api-id", api_id);
        }
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BrokerError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(BrokerError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BrokerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| BrokerError::Decode(format!("Failed to parse response: {e}")))
    }
}

impl BrokerTransport for RestTransport {
    fn request_token(&self, credentials: Credentials) -> BoxFuture<'_, BrokerResult<String>> {
        Box::pin(async move {
            let body = TokenRequest {
                grant_type: "client_credentials",
                appkey: credentials.app_key(),
                secretkey: credentials.expose_secret(),
            };
            let reply = match self.post_json(TOKEN_PATH, None, None, &body).await {
                Ok(reply) => reply,
                Err(BrokerError::Unauthorized) => {
                    return Err(BrokerError::Auth("credentials refused (HTTP 401)".to_string()))
                }
                Err(BrokerError::Status { status, body }) => {
                    return Err(BrokerError::Auth(format!("HTTP {status}: {body}")))
                }
                Err(e) => return Err(e),
            };

            let token = reply
                .get("token")
                .or_else(|| reply.get("access_token"))
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty());

            match token {
                Some(token) => {
                    debug!("Token response received");
                    Ok(token.to_string())
                }
                None => {
                    let msg = reply
                        .get("return_msg")
                        .and_then(Value::as_str)
                        .unwrap_or("no token in response");
                    warn!(msg = %msg, "Token response without token");
                    Err(BrokerError::Auth(msg.to_string()))
                }
            }
        })
    }

    fn submit_order(
        &self,
        token: String,
        order: OrderWire,
    ) -> BoxFuture<'_, BrokerResult<OrderReply>> {
        Box::pin(async move {
            let api_id = match order.side {
                OrderSide::Buy => API_ID_BUY,
                OrderSide::Sell => API_ID_SELL,
            };
            let reply = self
                .post_json(ORDER_PATH, Some(api_id), Some(&token), &order)
                .await?;
            OrderReply::from_value(&reply)
        })
    }

    fn fetch_holdings(&self, token: String) -> BoxFuture<'_, BrokerResult<Vec<Holding>>> {
        Box::pin(async move {
            let body = BalanceRequest {
                qry_tp: "1",
                dmst_stex_tp: &self.exchange,
            };
            let reply = self
                .post_json(ACCOUNT_PATH, Some(API_ID_BALANCE), Some(&token), &body)
                .await?;
            parse_holdings(&reply)
        })
    }

    fn fetch_withdrawable(
        &self,
        token: String,
        query: WithdrawableQuery,
    ) -> BoxFuture<'_, BrokerResult<Withdrawable>> {
        Box::pin(async move {
            let reply = self
                .post_json(ACCOUNT_PATH, Some(API_ID_WITHDRAWABLE), Some(&token), &query)
                .await?;
            parse_withdrawable(&reply)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_trailing_slash() {
        let config = BrokerConfig {
            base_url: "https://mockapi.kiwoom.com/".to_string(),
            ..BrokerConfig::default()
        };
        let transport = RestTransport::new(&config).unwrap();
        assert_eq!(transport.base_url, "https://mockapi.kiwoom.com");
        assert_eq!(transport.exchange, "KRX");
    }

    #[test]
    fn test_token_request_body_shape() {
        let creds = Credentials::new("key", "secret", "1234");
        let body = TokenRequest {
            grant_type: "client_credentials",
            appkey: creds.app_key(),
            secretkey: creds.expose_secret(),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["grant_type"], "client_credentials");
        assert_eq!(value["appkey"], "key");
        assert_eq!(value["secretkey"], "secret");
    }
}
