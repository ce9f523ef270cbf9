//! Configuration management for the Fleet Safety Management Platform
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with FSM_ prefix
//!
//! The environment name is validated at startup; production-only secrets
//! (LINE channel credentials, scheduler secret) are Options here and the
//! endpoints that need them fail closed when they are absent.

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// LINE channel configuration
    pub line: LineConfig,

    /// Scheduled-job trigger configuration
    pub scheduler: SchedulerConfig,

    /// Public-endpoint rate limiter configuration
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens
    pub secret: String,

    /// Access token expiration in seconds
    pub access_token_expiry: i64,

    /// Refresh token expiration in seconds
    pub refresh_token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LineConfig {
    /// LINE Login channel ID, used to verify LIFF ID tokens
    pub channel_id: Option<String>,

    /// Messaging API channel secret, used to verify webhook signatures
    pub channel_secret: Option<String>,

    /// Messaging API access token for webhook replies
    pub messaging_token: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    /// Shared secret presented by the external cron trigger
    pub cron_secret: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    /// Hard cap on tracked keys before nearest-to-expiry eviction
    pub max_entries: usize,

    /// Minimum seconds between opportunistic cleanup passes
    pub cleanup_interval_secs: u64,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("FSM_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        // Explicit mode switch: an unknown environment is a startup error,
        // never a silent fallback to a less secure mode.
        if environment != "development" && environment != "production" {
            return Err(ConfigError::Message(format!(
                "unknown environment '{}', expected 'development' or 'production'",
                environment
            )));
        }

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("jwt.access_token_expiry", 3600)?
            .set_default("jwt.refresh_token_expiry", 604800)?
            .set_default("rate_limit.max_entries", 10000)?
            .set_default("rate_limit.cleanup_interval_secs", 60)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (FSM_ prefix)
            .add_source(
                Environment::with_prefix("FSM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}
