//! Configuration management for the Storefront backend
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with STOREFRONT_ prefix

use config::builder::{ConfigBuilder, DefaultState};
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

    /// Order notification delivery
    pub notifications: NotificationConfig,

    /// Mobile-money gateway configuration
    pub payments: PaymentConfig,
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

    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,

    /// Milliseconds a ledger transaction waits on a locked row before failing
    pub lock_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key used to verify JWT tokens
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    /// Webhook receiving new-order summaries for staff
    pub order_webhook_url: Option<String>,

    /// Webhook relaying buyer SMS confirmations
    pub buyer_sms_webhook_url: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentConfig {
    /// Prefix for checkout ids minted by the sandbox gateway
    pub checkout_prefix: String,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("STOREFRONT_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = Self::defaults(&environment)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (STOREFRONT_ prefix)
            .add_source(
                Environment::with_prefix("STOREFRONT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    fn defaults(environment: &str) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        config::Config::builder()
            .set_default("environment", environment)?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("database.lock_timeout_ms", 5000)?
            .set_default("notifications.timeout_secs", 5)?
            .set_default("payments.checkout_prefix", "ws_CO")
    }

    /// Address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(builder: ConfigBuilder<DefaultState>) -> Config {
        builder
            .set_override("database.url", "postgres://localhost/storefront")
            .unwrap()
            .set_override("jwt.secret", "secret")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn defaults_fill_everything_but_secrets() {
        let config = build(Config::defaults("test").unwrap());
        assert_eq!(config.environment, "test");
        assert_eq!(config.database.lock_timeout_ms, 5000);
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
    }

    #[test]
    fn lock_timeout_can_be_overridden() {
        let builder = Config::defaults("test")
            .unwrap()
            .set_override("database.lock_timeout_ms", 250)
            .unwrap();
        assert_eq!(build(builder).database.lock_timeout_ms, 250);
    }
}
