use std::env;
use std::str::FromStr;
use std::time::Duration;

use guess_core::{DEFAULT_GUESS_TTL, LedgerConfig, RetryPolicy, StatsRefresh};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// SQLite database; the in-memory store is used when unset
    pub database_url: Option<String>,
    pub guess_ttl_seconds: u64,
    pub store_max_attempts: u32,
    pub store_retry_base_delay_ms: u64,
    pub store_retry_max_delay_ms: u64,
    pub stats_refresh: StatsRefresh,
    pub expiry_sweep_seconds: u64,
}

fn env_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        Err(_) => Ok(default),
    }
}

fn parse_stats_refresh(value: &str) -> Result<StatsRefresh, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "background" => Ok(StatsRefresh::Background),
        "inline" => Ok(StatsRefresh::Inline),
        _ => Err(ConfigError::InvalidValue {
            name: "STATS_REFRESH",
            value: value.to_string(),
        }),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env_or("PORT", defaults.port)?,
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty()),
            guess_ttl_seconds: env_or("GUESS_TTL_SECONDS", defaults.guess_ttl_seconds)?,
            store_max_attempts: env_or("STORE_MAX_ATTEMPTS", defaults.store_max_attempts)?,
            store_retry_base_delay_ms: env_or(
                "STORE_RETRY_BASE_DELAY_MS",
                defaults.store_retry_base_delay_ms,
            )?,
            store_retry_max_delay_ms: env_or(
                "STORE_RETRY_MAX_DELAY_MS",
                defaults.store_retry_max_delay_ms,
            )?,
            stats_refresh: match env::var("STATS_REFRESH") {
                Ok(value) => parse_stats_refresh(&value)?,
                Err(_) => defaults.stats_refresh,
            },
            expiry_sweep_seconds: env_or("EXPIRY_SWEEP_SECONDS", defaults.expiry_sweep_seconds)?,
        })
    }

    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            guess_ttl: Duration::from_secs(self.guess_ttl_seconds),
            retry: RetryPolicy::new(
                self.store_max_attempts,
                Duration::from_millis(self.store_retry_base_delay_ms),
                Duration::from_millis(self.store_retry_max_delay_ms),
            ),
            stats_refresh: self.stats_refresh,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_url: None,
            guess_ttl_seconds: DEFAULT_GUESS_TTL.as_secs(),
            store_max_attempts: 3,
            store_retry_base_delay_ms: 50,
            store_retry_max_delay_ms: 1000,
            stats_refresh: StatsRefresh::Background,
            expiry_sweep_seconds: 60,
        }
    }
}
