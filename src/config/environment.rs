use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::services::monitor::executor::{DEFAULT_PROBE_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::services::webhook::RetryConfig;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Environment configuration
/// Loads and validates environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: String,
    pub tick_interval: Duration,
    pub probe_timeout: Duration,
    pub probe_user_agent: String,
    pub notify_timeout_secs: u64,
    pub notify_max_attempts: u32,
    pub notify_base_delay_secs: u64,
    pub notification_queue_capacity: usize,
    pub heartbeat_retention_days: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let tick_interval_ms: u64 = parse_or(&lookup, "TICK_INTERVAL_MS", 1000)?;
        if tick_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                name: "TICK_INTERVAL_MS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            database_url,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            tick_interval: Duration::from_millis(tick_interval_ms),
            probe_timeout: Duration::from_secs(parse_or(
                &lookup,
                "PROBE_TIMEOUT_SECS",
                DEFAULT_PROBE_TIMEOUT_SECS,
            )?),
            probe_user_agent: lookup("PROBE_USER_AGENT")
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            notify_timeout_secs: parse_or(&lookup, "NOTIFY_TIMEOUT_SECS", 10)?,
            notify_max_attempts: parse_or(&lookup, "NOTIFY_MAX_ATTEMPTS", 3)?,
            notify_base_delay_secs: parse_or(&lookup, "NOTIFY_BASE_DELAY_SECS", 2)?,
            notification_queue_capacity: parse_or(&lookup, "NOTIFY_QUEUE_CAPACITY", 256)?,
            heartbeat_retention_days: parse_or(&lookup, "HEARTBEAT_RETENTION_DAYS", 30)?,
        })
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            base_delay_secs: self.notify_base_delay_secs,
            max_attempts: self.notify_max_attempts,
            timeout_secs: self.notify_timeout_secs,
            ..RetryConfig::default()
        }
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}
