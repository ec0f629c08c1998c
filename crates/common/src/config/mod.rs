//! Configuration management for shelter services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Database URL that selects the in-memory store
pub const MEMORY_DATABASE_URL: &str = "memory://";

/// Shortest accepted token signing secret
const MIN_SECRET_LEN: usize = 32;

/// Sample values that ship in docs and must never sign real tokens
const PLACEHOLDER_SECRETS: [&str; 2] = ["change-me", "replace-with-a-long-random-secret"];

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Redis configuration (view memoization)
    #[serde(default)]
    pub redis: RedisConfig,

    /// Session token configuration
    pub auth: AuthConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Image storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum request body in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Primary database URL (for writes), or `memory://`
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Give up retrying the initial connection after this many seconds
    #[serde(default = "default_connect_retry")]
    pub connect_retry_secs: u64,

    /// Apply pending migrations at startup
    #[serde(default = "default_enabled")]
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    /// Redis URL; memoization is disabled when absent
    pub url: Option<String>,

    /// Default TTL in seconds
    #[serde(default = "default_redis_ttl")]
    pub default_ttl_secs: u64,

    /// Key prefix for namespacing
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Secret for session token signing; required, never defaulted
    #[serde(default)]
    pub jwt_secret: String,

    /// Token lifetime in seconds
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log filter directive (debug, info, shelter_common=debug, ...)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Serve Prometheus metrics on /metrics
    #[serde(default = "default_enabled")]
    pub metrics_enabled: bool,

    /// Service name for logs
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory uploaded images are written under
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// URL prefix the upload directory is served from
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// Largest accepted image in bytes
    #[serde(default = "default_max_upload")]
    pub max_upload_bytes: usize,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 30 }
fn default_body_limit() -> usize { 12 * 1024 * 1024 }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_connect_retry() -> u64 { 30 }
fn default_redis_ttl() -> u64 { 120 }
fn default_key_prefix() -> String { "shelter".to_string() }
fn default_jwt_expiration() -> u64 { 3600 * 12 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_service_name() -> String { "shelter-gateway".to_string() }
fn default_rate_limit() -> u32 { 50 }
fn default_burst() -> u32 { 100 }
fn default_enabled() -> bool { true }
fn default_upload_dir() -> PathBuf { PathBuf::from("public/uploads") }
fn default_public_base_url() -> String { "/uploads".to_string() }
fn default_max_upload() -> usize { 10 * 1024 * 1024 }

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_enabled: default_enabled(),
            service_name: default_service_name(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: None,
            default_ttl_secs: default_redis_ttl(),
            key_prefix: default_key_prefix(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: default_enabled(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            public_base_url: default_public_base_url(),
            max_upload_bytes: default_max_upload(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?

            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service must not start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let secret = self.auth.jwt_secret.trim();
        if secret.is_empty() {
            return Err(ConfigError::Message(
                "auth.jwt_secret is not set (APP__AUTH__JWT_SECRET)".to_string(),
            ));
        }
        if PLACEHOLDER_SECRETS.contains(&secret) || secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Message(format!(
                "auth.jwt_secret must be a random value of at least {} characters",
                MIN_SECRET_LEN
            )));
        }
        Ok(())
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get the read database URL (falls back to primary)
    pub fn read_database_url(&self) -> &str {
        self.database.read_url.as_deref().unwrap_or(&self.database.url)
    }

    /// Whether the in-memory store was requested instead of Postgres
    pub fn uses_memory_store(&self) -> bool {
        self.database.url == MEMORY_DATABASE_URL
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                request_timeout_secs: default_request_timeout(),
                body_limit_bytes: default_body_limit(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/shelter".to_string(),
                read_url: None,
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
                connect_retry_secs: default_connect_retry(),
                run_migrations: default_enabled(),
            },
            redis: RedisConfig::default(),
            auth: AuthConfig {
                jwt_secret: String::new(),
                jwt_expiration_secs: default_jwt_expiration(),
            },
            observability: ObservabilityConfig::default(),
            rate_limit: RateLimitConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}
