//! Service configuration.
//!
//! # Purpose
//! Reads configuration from `RECORDS_*` environment variables, then applies
//! an optional YAML override file named by `RECORDS_CONFIG`.
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_METRICS_BIND: &str = "0.0.0.0:9090";
pub const DEFAULT_EVENT_CAPACITY: usize = 256;
pub const DEFAULT_PG_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_PG_ACQUIRE_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

impl StorageBackend {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "postgres" => Ok(Self::Postgres),
            other => bail!("unknown storage backend: {other}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostgresConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

fn default_max_connections() -> u32 {
    DEFAULT_PG_MAX_CONNECTIONS
}

fn default_acquire_timeout_ms() -> u64 {
    DEFAULT_PG_ACQUIRE_TIMEOUT_MS
}

#[derive(Debug, Clone)]
pub struct RecordsConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    pub storage: StorageBackend,
    pub postgres: Option<PostgresConfig>,
    /// Period of the in-process expiry sweep; `None` leaves scheduling to operators.
    pub sweep_interval: Option<Duration>,
    pub event_capacity: usize,
}

#[derive(Debug, Deserialize)]
struct RecordsConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    storage: Option<StorageBackend>,
    postgres: Option<PostgresConfig>,
    sweep_interval_secs: Option<u64>,
    event_capacity: Option<usize>,
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("parse {key}")),
        Err(_) => Ok(None),
    }
}

impl RecordsConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = std::env::var("RECORDS_BIND")
            .unwrap_or_else(|_| DEFAULT_BIND.to_string())
            .parse()
            .with_context(|| "parse RECORDS_BIND")?;
        let metrics_bind = std::env::var("RECORDS_METRICS_BIND")
            .unwrap_or_else(|_| DEFAULT_METRICS_BIND.to_string())
            .parse()
            .with_context(|| "parse RECORDS_METRICS_BIND")?;
        let storage = match std::env::var("RECORDS_STORAGE") {
            Ok(raw) => StorageBackend::parse(&raw)?,
            Err(_) => StorageBackend::Memory,
        };
        let postgres = match std::env::var("RECORDS_POSTGRES_URL") {
            Ok(url) => Some(PostgresConfig {
                url,
                max_connections: env_parse("RECORDS_POSTGRES_MAX_CONNECTIONS")?
                    .unwrap_or(DEFAULT_PG_MAX_CONNECTIONS),
                acquire_timeout_ms: env_parse("RECORDS_POSTGRES_ACQUIRE_TIMEOUT_MS")?
                    .unwrap_or(DEFAULT_PG_ACQUIRE_TIMEOUT_MS),
            }),
            Err(_) => None,
        };
        let sweep_interval = env_parse::<u64>("RECORDS_SWEEP_INTERVAL_SECS")?
            .map(Duration::from_secs);
        let event_capacity =
            env_parse("RECORDS_EVENT_CAPACITY")?.unwrap_or(DEFAULT_EVENT_CAPACITY);
        let config = Self {
            bind_addr,
            metrics_bind,
            storage,
            postgres,
            sweep_interval,
            event_capacity,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("RECORDS_CONFIG") {
            let contents =
                fs::read_to_string(&path).with_context(|| format!("read RECORDS_CONFIG: {path}"))?;
            config.apply_yaml(&contents)?;
        }
        Ok(config)
    }

    fn apply_yaml(&mut self, contents: &str) -> Result<()> {
        let override_cfg: RecordsConfigOverride =
            serde_yaml::from_str(contents).with_context(|| "parse records config yaml")?;
        if let Some(value) = override_cfg.bind_addr {
            self.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
        }
        if let Some(value) = override_cfg.metrics_bind {
            self.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
        }
        if let Some(value) = override_cfg.storage {
            self.storage = value;
        }
        if let Some(value) = override_cfg.postgres {
            self.postgres = Some(value);
        }
        if let Some(value) = override_cfg.sweep_interval_secs {
            self.sweep_interval = Some(Duration::from_secs(value));
        }
        if let Some(value) = override_cfg.event_capacity {
            self.event_capacity = value;
        }
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        if self.event_capacity == 0 {
            bail!("event capacity must be greater than zero");
        }
        if self.sweep_interval == Some(Duration::ZERO) {
            bail!("sweep interval must be greater than zero");
        }
        Ok(())
    }
}
