//! HTTP ingress using axum.
//!
//! - `POST /webhook`: parse an alert and hand it to the relay
//! - `GET /`: liveness text
//! - `GET /api/logs`: recent log lines as a JSON array

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use relay_core::parse_alert;
use relay_executor::Relay;
use relay_telemetry::RollingLogBuffer;
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    relay: Arc<Relay>,
    logs: Arc<RollingLogBuffer>,
}

impl AppState {
    pub fn new(relay: Arc<Relay>, logs: Arc<RollingLogBuffer>) -> Self {
        Self { relay, logs }
    }
}

/// Webhook reply body.
#[derive(Debug, Serialize)]
struct WebhookReply {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    signal_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    msg: Option<String>,
}

/// Create the axum router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/webhook", post(webhook))
        .route("/api/logs", get(recent_logs))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> &'static str {
    "Signal relay is running"
}

/// Accept one alert. Never waits for execution.
async fn webhook(State(state): State<AppState>, body: String) -> Response {
    match parse_alert(&body) {
        Ok(signal) => {
            let signal_id = signal.id.to_string();
            info!(
                signal_id = %signal_id,
                ticker = %signal.ticker,
                action = %signal.action,
                price = %signal.price,
                score = signal.score,
                "Alert received"
            );
            state.relay.submit(signal);
            (
                StatusCode::OK,
                Json(WebhookReply {
                    status: "success",
                    signal_id: Some(signal_id),
                    msg: None,
                }),
            )
                .into_response()
        }
        Err(e) => {
            warn!(error = %e, body_len = body.len(), "Rejected unparseable alert");
            (
                StatusCode::BAD_REQUEST,
                Json(WebhookReply {
                    status: "error",
                    signal_id: None,
                    msg: Some(e.to_string()),
                }),
            )
                .into_response()
        }
    }
}

async fn recent_logs(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.logs.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use relay_broker::{BrokerClient, BrokerConfig, Credentials, MockTransport};
    use relay_executor::{BatchConfig, ExecutionConfig};
    use relay_telemetry::LogSink;
    use tower::ServiceExt;

    fn state() -> AppState {
        let broker = Arc::new(BrokerClient::new(
            Arc::new(MockTransport::new()),
            Credentials::new("key", "secret", "81234567"),
            &BrokerConfig::default(),
        ));
        let relay = Relay::new(broker, BatchConfig::default(), ExecutionConfig::default()).unwrap();
        AppState::new(Arc::new(relay), Arc::new(RollingLogBuffer::new(10)))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_webhook(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/webhook")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_webhook_accepts_prefixed_alert() {
        let state = state();
        let relay = state.relay.clone();
        let app = create_router(state);

        let response = app
            .oneshot(post_webhook(
                "TradingView alert||{\"ticker\":\"KRX:005930\",\"action\":\"BUY\",\"price\":71000,\"score\":82}\n",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "success");
        assert!(json["signal_id"].as_str().unwrap().starts_with("sig_"));
        assert!(relay.is_worker_alive());
        relay.shutdown();
    }

    #[tokio::test]
    async fn test_webhook_rejects_garbage() {
        let app = create_router(state());

        let response = app.oneshot(post_webhook("not json at all")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["status"], "error");
        assert!(json.get("signal_id").is_none());
    }

    #[tokio::test]
    async fn test_webhook_rejects_empty_body() {
        let app = create_router(state());
        let response = app.oneshot(post_webhook("")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_logs_endpoint_returns_buffer() {
        let state = state();
        state.logs.append("[09:00:00] INFO relay: first".to_string());
        state.logs.append("[09:00:01] WARN relay: second".to_string());
        let app = create_router(state);

        let response = app
            .oneshot(Request::builder().uri("/api/logs").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(
            json,
            serde_json::json!(["[09:00:00] INFO relay: first", "[09:00:01] WARN relay: second"])
        );
    }

    #[tokio::test]
    async fn test_index_is_alive() {
        let app = create_router(state());
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
