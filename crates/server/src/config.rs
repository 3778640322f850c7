//! Server configuration loaded from environment variables.
//!
//! Loaded once at process start and immutable for the run's lifetime.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPIFY_STORE` - Store domain (e.g., your-store.myshopify.com)
//! - `SHOPIFY_ADMIN_TOKEN` - Admin API access token
//!
//! ## Optional
//! - `TAGGER_HOST` - Bind address (default: 127.0.0.1)
//! - `TAGGER_PORT` - Listen port (default: 3000)
//! - `SHOPIFY_API_VERSION` - API version (default: 2024-07)
//! - `SHOPIFY_API_BASE` - Base URL override for the Admin API (points the
//!   client at a local mock during development)
//! - `TAGGER_MAX_CONCURRENT_REQUESTS` - In-flight request cap (default: 2)
//! - `TAGGER_MIN_REQUEST_INTERVAL_MS` - Global dispatch spacing (default: 500)
//! - `TAGGER_MAX_ATTEMPTS` - Attempts per request incl. retries (default: 5)
//! - `TAGGER_RETRY_BASE_DELAY_MS` - First retry delay (default: 1000)
//! - `TAGGER_BATCH_SIZE` - Concurrent customers per run (default: 5)
//! - `TAGGER_COUNT_STRATEGY` - `query` (default) or `position`
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use crate::shopify::RateLimitConfig;
use crate::sync::{CountStrategy, SyncOptions};

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Top-level server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Admin API configuration
    pub shopify: ShopifyConfig,
    /// Outbound request gate tunables
    pub rate_limit: RateLimitConfig,
    /// Synchronization driver tunables
    pub sync: SyncOptions,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Shopify Admin API configuration.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct ShopifyConfig {
    /// Store domain (e.g., your-store.myshopify.com)
    pub store: String,
    /// API version (e.g., 2024-07)
    pub api_version: String,
    /// Admin API access token
    pub access_token: SecretString,
    /// Base URL override; `https://{store}` when unset
    pub api_base: Option<String>,
}

impl std::fmt::Debug for ShopifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyConfig")
            .field("store", &self.store)
            .field("api_version", &self.api_version)
            .field("access_token", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid,
    /// or if the access token looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("TAGGER_HOST", "127.0.0.1")?;
        let port = parse_env("TAGGER_PORT", "3000")?;

        let shopify = ShopifyConfig::from_env()?;
        let rate_limit = RateLimitConfig {
            max_concurrent: parse_env("TAGGER_MAX_CONCURRENT_REQUESTS", "2")?,
            min_interval: Duration::from_millis(parse_env("TAGGER_MIN_REQUEST_INTERVAL_MS", "500")?),
            max_attempts: parse_env("TAGGER_MAX_ATTEMPTS", "5")?,
            retry_base_delay: Duration::from_millis(parse_env("TAGGER_RETRY_BASE_DELAY_MS", "1000")?),
        };
        let sync = SyncOptions {
            batch_size: parse_env("TAGGER_BATCH_SIZE", "5")?,
            count_strategy: parse_env("TAGGER_COUNT_STRATEGY", "query")?,
        };
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            host,
            port,
            shopify,
            rate_limit,
            sync,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl ShopifyConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            store: get_required_env("SHOPIFY_STORE")?,
            api_version: get_env_or_default("SHOPIFY_API_VERSION", "2024-07"),
            access_token: get_validated_secret("SHOPIFY_ADMIN_TOKEN")?,
            api_base: get_optional_env("SHOPIFY_API_BASE"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get and parse an environment variable, falling back to a default.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that a secret is not an obvious placeholder.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }
    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-admin-token-here", "TEST_VAR");
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InsecureSecret(_, _)
        ));
    }

    #[test]
    fn test_validate_secret_strength_changeme() {
        assert!(validate_secret_strength("changeme123", "TEST_VAR").is_err());
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        assert!(validate_secret_strength("shpat_a91f3c0d2b8e47f6", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            shopify: ShopifyConfig {
                store: "test.myshopify.com".to_string(),
                api_version: "2024-07".to_string(),
                access_token: SecretString::from("shpat_a91f3c0d2b8e47f6"),
                api_base: None,
            },
            rate_limit: RateLimitConfig::default(),
            sync: SyncOptions::default(),
            sentry_dsn: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_shopify_config_debug_redacts_token() {
        let config = ShopifyConfig {
            store: "test.myshopify.com".to_string(),
            api_version: "2024-07".to_string(),
            access_token: SecretString::from("shpat_super_secret_value"),
            api_base: None,
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("test.myshopify.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("shpat_super_secret_value"));
    }

    #[test]
    fn test_count_strategy_parses_through_parse_env_path() {
        // parse_env goes through FromStr, same as the env path.
        assert_eq!(
            "position".parse::<CountStrategy>().unwrap(),
            CountStrategy::Position
        );
    }
}
