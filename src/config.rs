use std::{str::FromStr, time::Duration};

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub max_connections: u32,
    pub session_idle: Duration,
    /// Fixes the candidate shuffle. Unset means OS entropy.
    pub shuffle_seed: Option<u64>,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        Ok(Config {
            database_url: var_or("DATABASE_URL", "sqlite://soulmates.db"),
            bind_addr: var_or("BIND_ADDR", "0.0.0.0:8080"),
            max_connections: parse_or("DB_MAX_CONNECTIONS", 16)?,
            session_idle: Duration::from_secs(parse_or::<u64>("SESSION_IDLE_MINUTES", 30)? * 60),
            shuffle_seed: dotenv::var("SHUFFLE_SEED")
                .ok()
                .map(|seed| seed.parse().context("SHUFFLE_SEED must be an unsigned integer"))
                .transpose()?,
            rust_log: var_or("RUST_LOG", "soulmates=info,tower_http=info"),
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    dotenv::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match dotenv::var(key) {
        Ok(raw) => raw.parse().with_context(|| format!("{key} has an invalid value `{raw}`")),
        Err(_) => Ok(default),
    }
}
