use crate::domain::{Symbol, UserId};
use crate::orchestration::RunMode;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub orders_path: String,
    /// Empty means every user present in the order file.
    pub users: Vec<UserId>,
    pub lookback_days: u32,
    pub symbol: Option<Symbol>,
    pub run_mode: RunMode,
    pub as_of: NaiveDate,
    pub retry_max_elapsed: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let orders_path = env_map
            .get("ORDERS_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("ORDERS_PATH".to_string()))?;

        let users = parse_users(&env_map);

        let lookback_days = env_map
            .get("LOOKBACK_DAYS")
            .map(|s| s.as_str())
            .unwrap_or("365")
            .parse::<u32>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "LOOKBACK_DAYS".to_string(),
                    "must be a non-negative integer".to_string(),
                )
            })?;

        let symbol = env_map
            .get("SYMBOL")
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(Symbol::new);

        let run_mode = match env_map
            .get("RUN_MODE")
            .map(|s| s.as_str())
            .unwrap_or("full")
        {
            "full" => RunMode::Full,
            "incremental" => RunMode::Incremental,
            other => {
                return Err(ConfigError::InvalidValue(
                    "RUN_MODE".to_string(),
                    format!("must be full or incremental, got {}", other),
                ))
            }
        };

        let as_of = match env_map.get("AS_OF") {
            Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
                ConfigError::InvalidValue(
                    "AS_OF".to_string(),
                    format!("must be a YYYY-MM-DD date, got {}", s),
                )
            })?,
            None => Utc::now().date_naive(),
        };

        let retry_max_elapsed = env_map
            .get("RETRY_MAX_ELAPSED_SECS")
            .map(|s| s.as_str())
            .unwrap_or("30")
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "RETRY_MAX_ELAPSED_SECS".to_string(),
                    "must be a valid u64".to_string(),
                )
            })?;

        Ok(Config {
            orders_path,
            users,
            lookback_days,
            symbol,
            run_mode,
            as_of,
            retry_max_elapsed,
        })
    }
}

fn parse_users(env_map: &HashMap<String, String>) -> Vec<UserId> {
    env_map
        .get("USERS")
        .map(|users| {
            users
                .split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(UserId::new)
                .collect()
        })
        .unwrap_or_default()
}
