//! Main application orchestration.
//!
//! Wires the broker client, the execution pipeline and the webhook server,
//! then serves until Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;

use relay_broker::{BrokerClient, DynTransport, RestTransport};
use relay_executor::Relay;
use relay_telemetry::RollingLogBuffer;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::webhook::{create_router, AppState};

/// Main application.
pub struct Application {
    config: AppConfig,
    relay: Arc<Relay>,
    logs: Arc<RollingLogBuffer>,
}

impl Application {
    /// Create the application against the real broker REST API.
    pub fn new(config: AppConfig, logs: Arc<RollingLogBuffer>) -> AppResult<Self> {
        let transport = RestTransport::new(&config.broker)?;
        Self::with_transport(config, Arc::new(transport), logs)
    }

    /// Create the application over any broker transport.
    pub fn with_transport(
        config: AppConfig,
        transport: DynTransport,
        logs: Arc<RollingLogBuffer>,
    ) -> AppResult<Self> {
        config.validate()?;

        let credentials = config.credentials();
        let missing = credentials.missing();
        if missing.is_empty() {
            info!(account = %credentials.masked_account(), "Credentials loaded");
        } else {
            warn!(
                missing = ?missing,
                "Credentials incomplete, orders will fail until they are set"
            );
        }

        let broker = Arc::new(BrokerClient::new(transport, credentials, &config.broker));
        let relay = Relay::new(broker, config.batching.clone(), config.execution.clone())?;

        Ok(Self {
            config,
            relay: Arc::new(relay),
            logs,
        })
    }

    pub fn relay(&self) -> &Arc<Relay> {
        &self.relay
    }

    pub fn router(&self) -> axum::Router {
        create_router(AppState::new(Arc::clone(&self.relay), Arc::clone(&self.logs)))
    }

    fn listen_addr(&self) -> AppResult<SocketAddr> {
        let server = &self.config.server;
        format!("{}:{}", server.bind, server.port)
            .parse()
            .map_err(|e| {
                AppError::Config(format!(
                    "Invalid listen address {}:{}: {e}",
                    server.bind, server.port
                ))
            })
    }

    /// Start the worker and serve webhooks until Ctrl-C.
    pub async fn run(self) -> AppResult<()> {
        let addr = self.listen_addr()?;
        self.relay.start();

        info!(%addr, base_url = %self.config.broker.base_url, "Starting webhook server");
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "Failed to listen for shutdown signal");
                    std::future::pending::<()>().await;
                }
                info!("Shutdown signal received");
            })
            .await?;

        info!(
            pending = self.relay.pending(),
            worker_restarts = self.relay.worker_restarts(),
            "Shutting down"
        );
        self.relay.shutdown();
        Ok(())
    }
}
