//! GUI configuration
//!
//! Environment variables with defaults, read once at startup.

use crate::chat::supervisor::RetryPolicy;
use crate::chat::ChatConfig;
use std::env;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Assistant WebSocket endpoint
    pub assistant_ws_url: String,
    /// Base URL of the catalog REST API
    pub catalog_api_url: String,
    /// Ceiling on consecutive automatic reconnects
    pub reconnect_max_attempts: u32,
    /// Delay unit for reconnect backoff
    pub reconnect_base_delay_ms: u64,
    /// Reply timeout in seconds (0 = wait forever)
    pub reply_timeout_secs: u64,
    /// Require a signed-in identity before chatting
    pub require_identity: bool,
    /// Identity to sign in with at startup
    pub identity: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            assistant_ws_url: "ws://localhost:8000/ws".to_string(),
            catalog_api_url: "http://localhost:8000".to_string(),
            reconnect_max_attempts: 5,
            reconnect_base_delay_ms: 1000,
            reply_timeout_secs: 120,
            require_identity: false,
            identity: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            assistant_ws_url: lookup("ASSISTANT_WS_URL").unwrap_or(defaults.assistant_ws_url),
            catalog_api_url: lookup("CATALOG_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.catalog_api_url),
            reconnect_max_attempts: lookup("RECONNECT_MAX_ATTEMPTS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.reconnect_max_attempts),
            reconnect_base_delay_ms: lookup("RECONNECT_BASE_DELAY_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.reconnect_base_delay_ms),
            reply_timeout_secs: lookup("REPLY_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.reply_timeout_secs),
            require_identity: lookup("CHAT_REQUIRE_IDENTITY")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.require_identity),
            identity: lookup("CHAT_IDENTITY").filter(|v| !v.trim().is_empty()),
        }
    }

    /// Controller settings derived from this configuration
    pub fn chat_config(&self) -> ChatConfig {
        ChatConfig {
            endpoint: self.assistant_ws_url.clone(),
            retry: RetryPolicy {
                max_attempts: self.reconnect_max_attempts,
                base_delay: Duration::from_millis(self.reconnect_base_delay_ms),
            },
            reply_timeout: match self.reply_timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            require_identity: self.require_identity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_pairs(&[]);
        assert_eq!(config.assistant_ws_url, "ws://localhost:8000/ws");
        assert_eq!(config.catalog_api_url, "http://localhost:8000");

        let chat = config.chat_config();
        assert_eq!(chat.retry, RetryPolicy::default());
        assert_eq!(chat.reply_timeout, Some(Duration::from_secs(120)));
        assert!(!chat.require_identity);
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("ASSISTANT_WS_URL", "ws://shop.local/ws"),
            ("CATALOG_API_URL", "http://shop.local/"),
            ("RECONNECT_MAX_ATTEMPTS", "3"),
            ("RECONNECT_BASE_DELAY_MS", "250"),
            ("REPLY_TIMEOUT_SECS", "0"),
            ("CHAT_REQUIRE_IDENTITY", "true"),
            ("CHAT_IDENTITY", "shopper@example.com"),
        ]);
        assert_eq!(config.catalog_api_url, "http://shop.local");
        assert_eq!(config.identity.as_deref(), Some("shopper@example.com"));

        let chat = config.chat_config();
        assert_eq!(chat.endpoint, "ws://shop.local/ws");
        assert_eq!(chat.retry.max_attempts, 3);
        assert_eq!(chat.retry.base_delay, Duration::from_millis(250));
        assert_eq!(chat.reply_timeout, None);
        assert!(chat.require_identity);
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = from_pairs(&[("RECONNECT_MAX_ATTEMPTS", "many"), ("CHAT_IDENTITY", "  ")]);
        assert_eq!(config.reconnect_max_attempts, 5);
        assert!(config.identity.is_none());
    }
}
