//! Application configuration.
//!
//! Non-secret settings come from a TOML file. Credentials may be given in
//! the `[credentials]` section but the `APP_KEY`, `APP_SECRET` and
//! `ACCOUNT_NO` environment variables take precedence.

use std::fmt;
use std::path::Path;

use relay_broker::{BrokerConfig, Credentials};
use relay_executor::{BatchConfig, ExecutionConfig};
use relay_telemetry::{DEFAULT_LOG_BUFFER_LINES, DEFAULT_LOG_FILTER};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Default config path when neither `--config` nor `RELAY_CONFIG` is set.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// HTTP ingress configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Port to listen on. Overridden by the `PORT` environment variable.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Lines kept for the `/api/logs` feed.
    #[serde(default = "default_log_buffer_lines")]
    pub log_buffer_lines: usize,
}

fn default_log_level() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

fn default_log_buffer_lines() -> usize {
    DEFAULT_LOG_BUFFER_LINES
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_buffer_lines: default_log_buffer_lines(),
        }
    }
}

/// Credentials as read from the file, before environment overrides.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub app_key: Option<String>,
    #[serde(default, skip_serializing)]
    pub app_secret: Option<String>,
    #[serde(default)]
    pub account_no: Option<String>,
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("app_key", &self.app_key)
            .field("app_secret", &self.app_secret.as_ref().map(|_| "<redacted>"))
            .field("account_no", &self.account_no.is_some())
            .finish()
    }
}

/// Result of [`AppConfig::load`].
///
/// Loading happens before logging is initialised, so problems found along
/// the way are returned for the caller to log.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: AppConfig,
    /// Whether the config file existed.
    pub found: bool,
    /// Ignored environment overrides.
    pub warnings: Vec<String>,
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Broker endpoint configuration.
    #[serde(default)]
    pub broker: BrokerConfig,
    /// Buy window and ranking configuration.
    #[serde(default)]
    pub batching: BatchConfig,
    /// Order sizing configuration.
    #[serde(default)]
    pub execution: ExecutionConfig,
    /// Webhook server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// API credentials.
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

impl AppConfig {
    /// Load from `path` if it exists, otherwise defaults; then apply the
    /// process environment.
    ///
    /// Nothing is logged here. See [`LoadedConfig`].
    pub fn load(path: &str) -> AppResult<LoadedConfig> {
        let found = Path::new(path).exists();
        let mut config = if found {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        let warnings = config.apply_env(|name| std::env::var(name).ok());
        Ok(LoadedConfig {
            config,
            found,
            warnings,
        })
    }

    /// Load from a specific file, without environment overrides.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Apply `APP_KEY`, `APP_SECRET`, `ACCOUNT_NO` and `PORT` overrides.
    ///
    /// Empty values are ignored. Unusable values are left unapplied and
    /// described in the returned list.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Vec<String> {
        let mut warnings = Vec::new();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("APP_KEY") {
            self.credentials.app_key = Some(v);
        }
        if let Some(v) = get("APP_SECRET") {
            self.credentials.app_secret = Some(v);
        }
        if let Some(v) = get("ACCOUNT_NO") {
            self.credentials.account_no = Some(v);
        }
        if let Some(v) = get("PORT") {
            match v.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(e) => warnings.push(format!("Ignoring invalid PORT {v:?}: {e}")),
            }
        }
        warnings
    }

    /// Broker credentials. Missing parts are empty strings.
    pub fn credentials(&self) -> Credentials {
        let c = &self.credentials;
        Credentials::new(
            c.app_key.clone().unwrap_or_default(),
            c.app_secret.clone().unwrap_or_default(),
            c.account_no.clone().unwrap_or_default(),
        )
    }

    /// Reject unusable batching, sizing and server values.
    ///
    /// Missing credentials are not an error here: the broker client fails
    /// closed on every order instead. See [`Self::missing_credentials`].
    pub fn validate(&self) -> AppResult<()> {
        self.batching.validate()?;
        self.execution.validate()?;
        if self.server.port == 0 {
            return Err(AppError::Config("server.port must be non-zero".to_string()));
        }
        if self.broker.base_url.trim().is_empty() {
            return Err(AppError::Config("broker.base_url must be set".to_string()));
        }
        Ok(())
    }

    /// Names of the credential parts that are absent.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        self.credentials().missing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.batching.max_buy_rank, 3);
        assert_eq!(config.telemetry.log_buffer_lines, 200);
        assert_eq!(
            config.missing_credentials(),
            vec!["app_key", "app_secret", "account_no"]
        );
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [batching]
            buffer_window_ms = 5000
            score_threshold = 40.0

            [execution]
            target_buy_amount = "500000"
            domestic_country = "KR"
            "#,
        )
        .unwrap();

        assert_eq!(config.batching.buffer_window_ms, 5000);
        assert_eq!(config.batching.poll_interval_ms, 500);
        assert_eq!(config.batching.score_threshold, 40.0);
        assert_eq!(config.execution.target_buy_amount, dec!(500000));
        assert_eq!(config.execution.domestic_country.as_deref(), Some("KR"));
        assert_eq!(config.broker.exchange, "KRX");
    }

    #[test]
    fn test_shipped_default_toml_matches_defaults() {
        let config =
            AppConfig::from_toml_str(include_str!("../../../config/default.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.batching.buffer_window_ms, 10_000);
        assert_eq!(config.execution.target_buy_amount, dec!(1000000));
        assert_eq!(config.broker.expiry_codes, vec!["8005".to_string()]);
        assert_eq!(config.telemetry.log_level, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = AppConfig::from_toml_str("batching = 3").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_invalid_batching_fails_validation() {
        let config = AppConfig::from_toml_str("[batching]\nmax_buy_rank = 0\n").unwrap();
        assert!(matches!(config.validate(), Err(AppError::Executor(_))));
    }

    #[test]
    fn test_env_overrides_file_credentials() {
        let mut config = AppConfig::from_toml_str(
            "[credentials]\napp_key = \"file-key\"\naccount_no = \"11112222\"\n",
        )
        .unwrap();
        let warnings = config.apply_env(env(&[
            ("APP_KEY", "env-key"),
            ("APP_SECRET", "env-secret"),
            ("ACCOUNT_NO", ""),
            ("PORT", "8080"),
        ]));

        let creds = config.credentials();
        assert_eq!(creds.app_key(), "env-key");
        assert_eq!(creds.expose_secret(), "env-secret");
        assert_eq!(creds.account_no(), "11112222");
        assert_eq!(config.server.port, 8080);
        assert!(config.missing_credentials().is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_invalid_port_is_reported_not_applied() {
        let mut config = AppConfig::default();
        let warnings = config.apply_env(env(&[("PORT", "http"), ("APP_KEY", "env-key")]));

        assert_eq!(config.server.port, 5000);
        assert_eq!(config.credentials().app_key(), "env-key");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("PORT"));
        assert!(warnings[0].contains("http"));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let loaded = AppConfig::load("does/not/exist.toml").unwrap();
        assert!(!loaded.found);
        assert_eq!(loaded.config.batching.max_buy_rank, 3);
    }

    #[test]
    fn test_secret_never_serialized_or_printed() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("APP_SECRET", "top-secret")]));

        let toml_str = toml::to_string(&config).unwrap();
        assert!(!toml_str.contains("top-secret"));
        assert!(toml_str.contains("buffer_window_ms"));
        assert!(!format!("{config:?}").contains("top-secret"));
    }
}
