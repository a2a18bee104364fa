//! Server configuration, read from the environment.

use std::net::{AddrParseError, SocketAddr};

use thiserror::Error;

pub const BIND_ENV: &str = "TASKGATE_BIND";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const WORKERS_ENV: &str = "TASKGATE_WORKERS";
pub const QUEUE_CAPACITY_ENV: &str = "TASKGATE_QUEUE_CAPACITY";

const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEV_JWT_SECRET: &str = "dev-secret";
const DEFAULT_WORKERS: &[&str] = &["log", "konnector", "service", "sendmail", "thumbnail", "unzip"];
const DEFAULT_QUEUE_CAPACITY: usize = 1000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TASKGATE_BIND: invalid socket address {value:?}: {source}")]
    InvalidBind {
        value: String,
        #[source]
        source: AddrParseError,
    },

    #[error("TASKGATE_QUEUE_CAPACITY: expected a positive integer, got {0:?}")]
    InvalidQueueCapacity(String),

    #[error("TASKGATE_WORKERS: no worker types configured")]
    NoWorkers,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// Worker types the broker accepts jobs for.
    pub workers: Vec<String>,
    /// Maximum number of queued jobs per tenant and worker type.
    pub queue_capacity: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            workers: DEFAULT_WORKERS.iter().map(|w| w.to_string()).collect(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind = lookup(BIND_ENV).unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr: SocketAddr = bind
            .parse()
            .map_err(|source| ConfigError::InvalidBind { value: bind.clone(), source })?;

        let jwt_secret = match lookup(JWT_SECRET_ENV).filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => {
                tracing::warn!("{JWT_SECRET_ENV} not set; using insecure dev default");
                DEV_JWT_SECRET.to_string()
            }
        };

        let workers = match lookup(WORKERS_ENV) {
            Some(list) => {
                let workers: Vec<String> = list
                    .split(',')
                    .map(str::trim)
                    .filter(|w| !w.is_empty())
                    .map(str::to_string)
                    .collect();
                if workers.is_empty() {
                    return Err(ConfigError::NoWorkers);
                }
                workers
            }
            None => DEFAULT_WORKERS.iter().map(|w| w.to_string()).collect(),
        };

        let queue_capacity = match lookup(QUEUE_CAPACITY_ENV) {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::InvalidQueueCapacity(raw)),
            },
            None => DEFAULT_QUEUE_CAPACITY,
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            workers,
            queue_capacity,
        })
    }
}
