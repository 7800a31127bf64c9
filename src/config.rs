//! Process configuration, read from the environment (and `.env` via dotenvy).

use anyhow::{Context, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// `None` runs against the in-memory store.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub nats_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());
        let port = match non_empty("PORT") {
            Some(v) => v.parse().with_context(|| format!("PORT must be a valid port number, got {v:?}"))?,
            None => 5000,
        };
        let max_connections = match non_empty("DATABASE_MAX_CONNECTIONS") {
            Some(v) => v.parse().with_context(|| format!("DATABASE_MAX_CONNECTIONS must be a positive integer, got {v:?}"))?,
            None => 10,
        };
        Ok(Self {
            host: non_empty("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            database_url: non_empty("DATABASE_URL"),
            max_connections,
            nats_url: non_empty("NATS_URL"),
        })
    }

    pub fn bind_addr(&self) -> String { format!("{}:{}", self.host, self.port) }
}
