//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults.

use std::env;

/// Default OpenAI-compatible completion endpoint
pub const DEFAULT_COMPLETION_API_URL: &str = "https://api.groq.com/openai/v1";
/// Default completion model
pub const DEFAULT_COMPLETION_MODEL: &str = "llama-3.3-70b-versatile";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Catalog database configuration
    pub database: DatabaseConfig,
    /// Completion service configuration
    pub completion: CompletionConfig,
    /// Assistant channel configuration
    pub chat: ChatConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
}

/// Catalog database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path of the SQLite file
    pub path: String,
}

/// Completion service configuration
#[derive(Clone)]
pub struct CompletionConfig {
    /// Base URL of the OpenAI-compatible API
    pub api_url: String,
    /// Bearer token (empty = not configured)
    pub api_key: String,
    /// Model name
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl std::fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Assistant channel configuration
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Maximum non-system messages kept per connection
    pub history_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                port: 8000,
                host: "0.0.0.0".to_string(),
            },
            database: DatabaseConfig {
                path: "data/catalog.db".to_string(),
            },
            completion: CompletionConfig {
                api_url: DEFAULT_COMPLETION_API_URL.to_string(),
                api_key: String::new(),
                model: DEFAULT_COMPLETION_MODEL.to_string(),
                timeout_secs: 60,
            },
            chat: ChatConfig { history_limit: 40 },
        }
    }
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(defaults.server.port),
                host: env::var("HOST").unwrap_or(defaults.server.host),
            },
            database: DatabaseConfig {
                path: env::var("DATABASE_PATH").unwrap_or(defaults.database.path),
            },
            completion: CompletionConfig {
                api_url: env::var("COMPLETION_API_URL")
                    .map(|url| url.trim_end_matches('/').to_string())
                    .unwrap_or(defaults.completion.api_url),
                api_key: env::var("COMPLETION_API_KEY").unwrap_or_default(),
                model: env::var("COMPLETION_MODEL").unwrap_or(defaults.completion.model),
                timeout_secs: env::var("COMPLETION_TIMEOUT_SECS")
                    .ok()
                    .and_then(|t| t.parse().ok())
                    .unwrap_or(defaults.completion.timeout_secs),
            },
            chat: ChatConfig {
                history_limit: env::var("CHAT_HISTORY_LIMIT")
                    .ok()
                    .and_then(|n| n.parse().ok())
                    .filter(|n| *n > 0)
                    .unwrap_or(defaults.chat.history_limit),
            },
        }
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server_addr(), "0.0.0.0:8000");
        assert_eq!(config.database.path, "data/catalog.db");
        assert_eq!(config.completion.model, "llama-3.3-70b-versatile");
        assert_eq!(config.chat.history_limit, 40);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let mut config = Config::default();
        config.completion.api_key = "gsk_secret".to_string();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("gsk_secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
