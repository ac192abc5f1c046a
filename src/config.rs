//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::{Balance, DEFAULT_INITIAL_BALANCE};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Upper bound for any single store call, in milliseconds
    pub store_timeout_ms: u64,

    /// Attempts per transfer before a conflict or transient failure surfaces
    pub transfer_max_attempts: u32,

    /// Balance granted to newly opened accounts
    pub initial_balance: i64,

    /// Shared secret expected in `X-API-Key` from the upstream gateway
    pub gateway_api_key: Option<String>,
}

/// Knobs the ledger handlers need at runtime
#[derive(Debug, Clone)]
pub struct LedgerSettings {
    pub store_timeout: Duration,
    pub max_attempts: u32,
    /// Base delay between retries; attempt `n` waits `n * retry_backoff` plus jitter
    pub retry_backoff: Duration,
    pub initial_balance: Balance,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_millis(5_000),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(50),
            initial_balance: Balance::new(DEFAULT_INITIAL_BALANCE).unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = parse_or("DATABASE_MAX_CONNECTIONS", 10)?;
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_or("PORT", 3000)?;
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let store_timeout_ms = parse_or("STORE_TIMEOUT_MS", 5_000)?;
        let transfer_max_attempts = parse_or("TRANSFER_MAX_ATTEMPTS", 3)?;
        let initial_balance = parse_or("INITIAL_BALANCE", DEFAULT_INITIAL_BALANCE)?;
        let gateway_api_key = env::var("GATEWAY_API_KEY").ok().filter(|k| !k.is_empty());

        let config = Self {
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            store_timeout_ms,
            transfer_max_attempts,
            initial_balance,
            gateway_api_key,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.transfer_max_attempts == 0 {
            return Err(ConfigError::InvalidValue("TRANSFER_MAX_ATTEMPTS"));
        }
        if self.store_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue("STORE_TIMEOUT_MS"));
        }
        if self.initial_balance < 0 {
            return Err(ConfigError::InvalidValue("INITIAL_BALANCE"));
        }
        Ok(())
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn ledger_settings(&self) -> Result<LedgerSettings, ConfigError> {
        let initial_balance = Balance::new(self.initial_balance)
            .map_err(|_| ConfigError::InvalidValue("INITIAL_BALANCE"))?;

        Ok(LedgerSettings {
            store_timeout: Duration::from_millis(self.store_timeout_ms),
            max_attempts: self.transfer_max_attempts,
            initial_balance,
            ..LedgerSettings::default()
        })
    }
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            database_url: "postgres://localhost/ledger".to_string(),
            database_max_connections: 10,
            host: "127.0.0.1".to_string(),
            port: 3000,
            environment: "development".to_string(),
            store_timeout_ms: 250,
            transfer_max_attempts: 4,
            initial_balance: 500,
            gateway_api_key: None,
        }
    }

    #[test]
    fn test_ledger_settings_from_config() {
        let settings = config().ledger_settings().unwrap();
        assert_eq!(settings.store_timeout, Duration::from_millis(250));
        assert_eq!(settings.max_attempts, 4);
        assert_eq!(settings.initial_balance.value(), 500);
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let config = Config {
            transfer_max_attempts: 0,
            ..config()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue("TRANSFER_MAX_ATTEMPTS"))
        ));
    }

    #[test]
    fn test_default_settings() {
        let settings = LedgerSettings::default();
        assert_eq!(settings.initial_balance.value(), DEFAULT_INITIAL_BALANCE);
        assert_eq!(settings.max_attempts, 3);
        assert!(!config().is_production());
    }
}
