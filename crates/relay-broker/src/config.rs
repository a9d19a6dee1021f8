//! Broker configuration and credentials.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

/// Broker endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// REST base URL (mock trading host by default).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request HTTP timeout (ms).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Domestic exchange code sent with every order.
    #[serde(default = "default_exchange")]
    pub exchange: String,
    /// Return codes that mean the bearer token is no longer valid.
    #[serde(default = "default_expiry_codes")]
    pub expiry_codes: Vec<String>,
    /// Case-insensitive message fragments that mean the token is no longer valid.
    #[serde(default = "default_expiry_markers")]
    pub expiry_markers: Vec<String>,
}

fn default_base_url() -> String {
    "https://mockapi.kiwoom.com".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_exchange() -> String {
    "KRX".to_string()
}

fn default_expiry_codes() -> Vec<String> {
    vec!["8005".to_string()]
}

fn default_expiry_markers() -> Vec<String> {
    vec![
        "token이 유효하지".to_string(),
        "invalid token".to_string(),
        "token expired".to_string(),
    ]
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
            exchange: default_exchange(),
            expiry_codes: default_expiry_codes(),
            expiry_markers: default_expiry_markers(),
        }
    }
}

/// API credentials for token exchange.
///
/// The secret is zeroed on drop and never printed by `Debug`.
#[derive(Clone, Default)]
pub struct Credentials {
    app_key: String,
    app_secret: Zeroizing<String>,
    account_no: String,
}

impl Credentials {
    pub fn new(
        app_key: impl Into<String>,
        app_secret: impl Into<String>,
        account_no: impl Into<String>,
    ) -> Self {
        Self {
            app_key: app_key.into(),
            app_secret: Zeroizing::new(app_secret.into()),
            account_no: account_no.into(),
        }
    }

    pub fn app_key(&self) -> &str {
        &self.app_key
    }

    /// Expose the secret for the token request body. Never log the result.
    pub fn expose_secret(&self) -> &str {
        self.app_secret.as_str()
    }

    pub fn account_no(&self) -> &str {
        &self.account_no
    }

    /// Names of the missing credential parts, empty when complete.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.app_key.trim().is_empty() {
            missing.push("app_key");
        }
        if self.app_secret.trim().is_empty() {
            missing.push("app_secret");
        }
        if self.account_no.trim().is_empty() {
            missing.push("account_no");
        }
        missing
    }

    /// True when key and secret are both present (enough to request a token).
    pub fn can_authenticate(&self) -> bool {
        !self.app_key.trim().is_empty() && !self.app_secret.trim().is_empty()
    }

    /// Account number with all but the last four characters masked.
    pub fn masked_account(&self) -> String {
        let chars: Vec<char> = self.account_no.chars().collect();
        let visible = chars.len().saturating_sub(4);
        chars
            .iter()
            .enumerate()
            .map(|(i, c)| if i < visible { '*' } else { *c })
            .collect()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("app_key", &self.app_key)
            .field("app_secret", &"<redacted>")
            .field("account_no", &self.masked_account())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secret() {
        let creds = Credentials::new("key", "super-secret", "81234567");
        let printed = format!("{creds:?}");
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("<redacted>"));
        assert!(printed.contains("****4567"));
    }

    #[test]
    fn test_missing_parts() {
        assert_eq!(
            Credentials::default().missing(),
            vec!["app_key", "app_secret", "account_no"]
        );
        let creds = Credentials::new("key", "secret", "");
        assert_eq!(creds.missing(), vec!["account_no"]);
        assert!(creds.can_authenticate());
        assert!(!Credentials::new("key", " ", "1").can_authenticate());
    }

    #[test]
    fn test_default_config() {
        let config = BrokerConfig::default();
        assert_eq!(config.exchange, "KRX");
        assert_eq!(config.expiry_codes, vec!["8005".to_string()]);
        assert_eq!(config.request_timeout_ms, 10_000);
    }
}
