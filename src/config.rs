//! Configuration management for Parlance
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{ParlanceError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for Parlance
///
/// This structure holds all configuration needed for the client,
/// including the completion endpoint, chat behavior, and the local
/// account simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Completion endpoint configuration
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Chat behavior configuration
    #[serde(default)]
    pub chat: ChatConfig,

    /// Account simulation configuration
    #[serde(default)]
    pub account: AccountConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Completion endpoint configuration
///
/// The endpoint is treated as an opaque HTTP service: it accepts a JSON
/// body of `{"messages": [{"role", "content"}]}` and responds with a
/// streamed plain-text body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// URL of the completion endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Timeout for the whole completion request (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_endpoint() -> String {
    "http://localhost:8080/api/chat".to_string()
}

fn default_timeout() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_seconds: default_timeout(),
        }
    }
}

/// Chat behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Greeting shown as the first assistant message of a new conversation
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

fn default_greeting() -> String {
    "Hello! I'm your AI assistant. How can I help you today?".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            greeting: default_greeting(),
        }
    }
}

/// Account simulation configuration
///
/// Signup and login are a self-contained local simulation. The simulated
/// network latency mirrors a real authentication round-trip; tests set it
/// to zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Artificial delay applied before signup/login validation (milliseconds)
    #[serde(default = "default_auth_latency")]
    pub simulated_latency_ms: u64,
}

fn default_auth_latency() -> u64 {
    1000
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            simulated_latency_ms: default_auth_latency(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Override for the SQLite database path
    ///
    /// When unset, the platform data directory is used.
    #[serde(default)]
    pub db_path: Option<String>,
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// Layering order (later wins): file, environment variables, CLI flags.
    /// A missing config file is not an error; defaults are used.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the YAML configuration file
    /// * `cli` - Parsed CLI arguments carrying overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::debug!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ParlanceError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ParlanceError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(endpoint) = std::env::var("PARLANCE_ENDPOINT") {
            self.provider.endpoint = endpoint;
        }

        if let Ok(db_path) = std::env::var("PARLANCE_DB") {
            self.storage.db_path = Some(db_path);
        }

        if let Ok(greeting) = std::env::var("PARLANCE_GREETING") {
            self.chat.greeting = greeting;
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(endpoint) = &cli.endpoint {
            self.provider.endpoint = endpoint.clone();
        }

        if let Some(db_path) = &cli.db_path {
            self.storage.db_path = Some(db_path.clone());
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `ParlanceError::Config` if the endpoint is empty or not a
    /// well-formed HTTP(S) URL, or if the timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.provider.endpoint.trim().is_empty() {
            return Err(ParlanceError::Config("provider.endpoint is empty".to_string()).into());
        }

        if !self.provider.endpoint.starts_with("http://")
            && !self.provider.endpoint.starts_with("https://")
        {
            return Err(ParlanceError::Config(format!(
                "provider.endpoint must be an http(s) URL, got: {}",
                self.provider.endpoint
            ))
            .into());
        }

        if self.provider.timeout_seconds == 0 {
            return Err(
                ParlanceError::Config("provider.timeout_seconds must be > 0".to_string()).into(),
            );
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            chat: ChatConfig::default(),
            account: AccountConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn cli_with_no_overrides() -> crate::cli::Cli {
        crate::cli::Cli {
            config: None,
            endpoint: None,
            db_path: None,
            verbose: false,
            command: crate::cli::Commands::Logout,
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.provider.timeout_seconds, 120);
        assert!(config.chat.greeting.contains("AI assistant"));
    }

    #[test]
    fn test_validate_rejects_empty_endpoint() {
        let mut config = Config::default();
        config.provider.endpoint = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_http_endpoint() {
        let mut config = Config::default();
        config.provider.endpoint = "ftp://example.com/chat".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.provider.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_yaml_partial_fills_defaults() {
        let yaml = r#"
provider:
  endpoint: "https://api.example.com/chat"
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.provider.endpoint, "https://api.example.com/chat");
        assert_eq!(config.provider.timeout_seconds, 120);
        assert_eq!(config.account.simulated_latency_ms, 1000);
    }

    #[test]
    #[serial]
    fn test_env_var_overrides_endpoint() {
        std::env::set_var("PARLANCE_ENDPOINT", "https://env.example.com/chat");
        let mut config = Config::default();
        config.apply_env_vars();
        std::env::remove_var("PARLANCE_ENDPOINT");
        assert_eq!(config.provider.endpoint, "https://env.example.com/chat");
    }

    #[test]
    #[serial]
    fn test_cli_override_wins_over_env() {
        std::env::set_var("PARLANCE_ENDPOINT", "https://env.example.com/chat");
        let mut cli = cli_with_no_overrides();
        cli.endpoint = Some("https://cli.example.com/chat".to_string());

        let mut config = Config::default();
        config.apply_env_vars();
        config.apply_cli_overrides(&cli);
        std::env::remove_var("PARLANCE_ENDPOINT");

        assert_eq!(config.provider.endpoint, "https://cli.example.com/chat");
    }

    #[test]
    #[serial]
    fn test_load_missing_file_uses_defaults() {
        let cli = cli_with_no_overrides();
        let config = Config::load("/nonexistent/parlance.yaml", &cli).unwrap();
        assert_eq!(config.provider.endpoint, default_endpoint());
    }
}
