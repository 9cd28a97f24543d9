//! Configuration management.
//!
//! Configuration can be set via environment variables:
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `8000`.
//! - `TASK_STORE` - Optional. Storage backend, `memory` or `sqlite`. Defaults to `sqlite`.
//! - `DATA_DIR` - Optional. Directory for the sqlite database. Defaults to `./data`.
//! - `SEED_TASKS` - Optional. Number of sample tasks inserted into an empty
//!   store at startup. Defaults to `5`; `0` disables seeding.

use std::path::PathBuf;
use thiserror::Error;

use crate::store::TaskStoreKind;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Task store backend
    pub store_kind: TaskStoreKind,

    /// Directory holding persistent data (sqlite backend)
    pub data_dir: PathBuf,

    /// Sample tasks inserted into an empty store at startup
    pub seed_tasks: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let store_kind = std::env::var("TASK_STORE")
            .map(|s| TaskStoreKind::parse(&s))
            .unwrap_or_default();

        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        let seed_tasks = std::env::var("SEED_TASKS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("SEED_TASKS".to_string(), format!("{}", e)))?;

        Ok(Self {
            host,
            port,
            store_kind,
            data_dir,
            seed_tasks,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(host: String, port: u16) -> Self {
        Self {
            host,
            port,
            store_kind: TaskStoreKind::Memory,
            data_dir: PathBuf::from("./data"),
            seed_tasks: 0,
        }
    }
}
