//! Application configuration
//!
//! This module provides centralized configuration management using the `config` crate.
//! Configuration can be loaded from environment variables and config files.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// HTTP server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Public base URL used to build agent webhook URLs
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3002
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_public_base_url() -> String {
    "http://localhost:3002".to_string()
}

/// Database configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// Idle connection timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    2
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}

/// Settings for one in-process TTL cache
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct CacheTierConfig {
    /// Time-to-live of each entry in seconds
    pub ttl_secs: u64,

    /// Maximum number of keys held at once
    ///
    /// When full, the tenth of the keys closest to expiry is evicted. The
    /// organizations cache stores every organization under its id and its
    /// slug, so it holds about `max_keys / 2` organizations.
    pub max_keys: usize,

    /// Interval between background sweeps of expired entries
    pub check_period_secs: u64,
}

/// Process-local cache configuration
///
/// Entries are not shared between instances; in a multi-instance deployment
/// each instance may serve data up to one TTL old after a mutation elsewhere.
#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_org_cache")]
    pub organizations: CacheTierConfig,

    #[serde(default = "default_user_cache")]
    pub users: CacheTierConfig,

    #[serde(default = "default_metrics_cache")]
    pub metrics: CacheTierConfig,
}

fn default_org_cache() -> CacheTierConfig {
    CacheTierConfig {
        ttl_secs: 900, // 15 minutes
        max_keys: 1000,
        check_period_secs: 120,
    }
}

fn default_user_cache() -> CacheTierConfig {
    CacheTierConfig {
        ttl_secs: 300, // 5 minutes
        max_keys: 10_000,
        check_period_secs: 60,
    }
}

fn default_metrics_cache() -> CacheTierConfig {
    CacheTierConfig {
        ttl_secs: 60,
        max_keys: 500,
        check_period_secs: 30,
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            organizations: default_org_cache(),
            users: default_user_cache(),
            metrics: default_metrics_cache(),
        }
    }
}

/// Authentication configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Secret used to verify caller JWTs issued by the identity provider
    pub jwt_secret: String,
}

/// Inbound webhook configuration
#[derive(Debug, Deserialize, Clone)]
pub struct WebhookConfig {
    /// Shared HMAC secret; when absent signatures are not verified
    #[serde(default)]
    pub secret: Option<String>,

    /// Header names checked, in order, for the signature
    #[serde(default = "default_signature_headers")]
    pub signature_headers: Vec<String>,
}

fn default_signature_headers() -> Vec<String> {
    vec![
        "x-retell-signature".to_string(),
        "x-webhook-signature".to_string(),
    ]
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            secret: None,
            signature_headers: default_signature_headers(),
        }
    }
}

/// Voice-agent provider API configuration (used by backfill)
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Agent id assumed when a payload carries none
    #[serde(default)]
    pub default_agent_id: Option<String>,

    #[serde(default = "default_backfill_page_size")]
    pub backfill_page_size: u32,
}

fn default_provider_url() -> String {
    "https://api.retellai.com/v1".to_string()
}

fn default_backfill_page_size() -> u32 {
    100
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_provider_url(),
            api_key: None,
            default_agent_id: None,
            backfill_page_size: default_backfill_page_size(),
        }
    }
}

/// Metrics read-path configuration
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct MetricsConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: i64,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: i64,

    /// Overview window used when the caller gives no `from`
    #[serde(default = "default_window_days")]
    pub default_window_days: i64,
}

fn default_page_size() -> i64 {
    50
}

fn default_max_page_size() -> i64 {
    1000
}

fn default_window_days() -> i64 {
    30
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            default_window_days: default_window_days(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and optional config file
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3002)?
            .set_default("server.workers", num_cpus::get() as i64)?
            .set_default("server.public_base_url", "http://localhost:3002")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("provider.backfill_page_size", 100)?
            .set_default("metrics.default_page_size", 50)?
            .set_default("metrics.max_page_size", 1000)?
            .set_default("metrics.default_window_days", 30)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables with VOX_ prefix
            .add_source(
                Environment::with_prefix("VOX")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("VOX").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Get the server bind address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cache_config() {
        let config = CacheConfig::default();
        assert_eq!(config.organizations.ttl_secs, 900);
        assert_eq!(config.users.max_keys, 10_000);
        assert_eq!(config.metrics.ttl_secs, 60);
        assert!(config.metrics.ttl_secs < config.users.ttl_secs);
        assert!(config.users.ttl_secs < config.organizations.ttl_secs);
    }

    #[test]
    fn test_default_webhook_config() {
        let config = WebhookConfig::default();
        assert!(config.secret.is_none());
        assert_eq!(config.signature_headers[0], "x-retell-signature");
    }

    #[test]
    fn test_default_metrics_config() {
        let config = MetricsConfig::default();
        assert_eq!(config.default_page_size, 50);
        assert_eq!(config.max_page_size, 1000);
    }
}
