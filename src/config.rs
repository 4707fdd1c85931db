//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL (e.g. `sqlite://data/coins.db`)
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// How long a transaction waits for the write lock before aborting
    pub database_busy_timeout_ms: u64,

    /// Largest coin amount a single teacher adjustment may move
    pub max_adjustment: i64,

    /// Longest accepted adjustment reason, in characters
    pub max_reason_length: usize,

    /// Largest page returned by history queries
    pub ledger_page_limit: i64,

    /// Environment (development, production)
    pub environment: String,

    /// Log output format: `text` or `json`
    pub log_format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = parse_or("DATABASE_MAX_CONNECTIONS", 10)?;
        let database_busy_timeout_ms = parse_or("DATABASE_BUSY_TIMEOUT_MS", 5_000)?;
        let max_adjustment: i64 = parse_or("MAX_ADJUSTMENT", 10_000)?;
        if max_adjustment <= 0 {
            return Err(ConfigError::InvalidValue("MAX_ADJUSTMENT"));
        }
        let max_reason_length = parse_or("MAX_REASON_LENGTH", 500)?;
        let ledger_page_limit: i64 = parse_or("LEDGER_PAGE_LIMIT", 100)?;
        if ledger_page_limit <= 0 {
            return Err(ConfigError::InvalidValue("LEDGER_PAGE_LIMIT"));
        }

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

        Ok(Self {
            database_url,
            database_max_connections,
            database_busy_timeout_ms,
            max_adjustment,
            max_reason_length,
            ledger_page_limit,
            environment,
            log_format,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.database_busy_timeout_ms)
    }

    /// Business limits handed to the handlers
    pub fn ledger_settings(&self) -> LedgerSettings {
        LedgerSettings {
            max_adjustment: self.max_adjustment,
            max_reason_length: self.max_reason_length,
            ledger_page_limit: self.ledger_page_limit,
        }
    }
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue(name)),
        Err(_) => Ok(default),
    }
}

/// Business limits enforced by the ledger handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSettings {
    pub max_adjustment: i64,
    pub max_reason_length: usize,
    pub ledger_page_limit: i64,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            max_adjustment: 10_000,
            max_reason_length: 500,
            ledger_page_limit: 100,
        }
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

    #[test]
    fn test_default_ledger_settings() {
        let settings = LedgerSettings::default();
        assert_eq!(settings.max_adjustment, 10_000);
        assert_eq!(settings.max_reason_length, 500);
    }

    #[test]
    fn test_parse_or_falls_back_when_unset() {
        let value: u32 = parse_or("CLASSROOM_COINS_TEST_UNSET_VARIABLE", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_ledger_settings_follow_config() {
        let config = Config {
            database_url: "sqlite::memory:".to_string(),
            database_max_connections: 1,
            database_busy_timeout_ms: 250,
            max_adjustment: 50,
            max_reason_length: 80,
            ledger_page_limit: 20,
            environment: "production".to_string(),
            log_format: "json".to_string(),
        };

        assert!(config.is_production());
        assert_eq!(config.busy_timeout(), Duration::from_millis(250));
        assert_eq!(
            config.ledger_settings(),
            LedgerSettings {
                max_adjustment: 50,
                max_reason_length: 80,
                ledger_page_limit: 20,
            }
        );
    }
}
