//! Process configuration read from the environment.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `STOCKLEDGER_BIND_ADDR` | `0.0.0.0:8080` | HTTP listen address |
//! | `STOCKLEDGER_DATABASE_URL` | unset | `sqlite://…` or `sqlite::memory:`; unset keeps everything in memory |
//! | `STOCKLEDGER_LOG_FORMAT` | `json` | `json` or `pretty` |

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;

use stockledger_observability::LogFormat;

use crate::store::{InMemoryLedgerStore, LedgerStore, SqliteLedgerStore, StoreError};

pub const BIND_ADDR_VAR: &str = "STOCKLEDGER_BIND_ADDR";
pub const DATABASE_URL_VAR: &str = "STOCKLEDGER_DATABASE_URL";
pub const LOG_FORMAT_VAR: &str = "STOCKLEDGER_LOG_FORMAT";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("STOCKLEDGER_BIND_ADDR is not a socket address: '{0}'")]
    InvalidBindAddr(String),

    #[error("STOCKLEDGER_DATABASE_URL must be a sqlite URL, got '{0}'")]
    UnsupportedDatabaseUrl(String),

    #[error("STOCKLEDGER_LOG_FORMAT: {0}")]
    InvalidLogFormat(String),
}

/// Which ledger store backs the process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StoreConfig {
    #[default]
    InMemory,
    Sqlite {
        url: String,
    },
}

impl StoreConfig {
    /// Open the configured store (bootstrapping the SQLite schema if needed).
    pub async fn open(&self) -> Result<Arc<dyn LedgerStore>, StoreError> {
        match self {
            StoreConfig::InMemory => Ok(Arc::new(InMemoryLedgerStore::new())),
            StoreConfig::Sqlite { url } => Ok(Arc::new(SqliteLedgerStore::connect(url).await?)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub bind_addr: SocketAddr,
    pub store: StoreConfig,
    pub log_format: LogFormat,
}

impl LedgerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup. Blank values count
    /// as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = var(BIND_ADDR_VAR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidBindAddr(bind_addr.clone()))?;

        let store = match var(DATABASE_URL_VAR) {
            None => StoreConfig::InMemory,
            Some(url) if url.starts_with("sqlite:") => StoreConfig::Sqlite { url },
            Some(other) => return Err(ConfigError::UnsupportedDatabaseUrl(other)),
        };

        let log_format = match var(LOG_FORMAT_VAR) {
            None => LogFormat::default(),
            Some(raw) => raw
                .parse()
                .map_err(|e: stockledger_observability::UnknownLogFormat| ConfigError::InvalidLogFormat(e.to_string()))?,
        };

        Ok(Self {
            bind_addr,
            store,
            log_format,
        })
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            store: StoreConfig::default(),
            log_format: LogFormat::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<LedgerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LedgerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_in_memory_json_on_8080() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg, LedgerConfig::default());
        assert_eq!(cfg.bind_addr.port(), 8080);
    }

    #[test]
    fn reads_sqlite_url_and_pretty_logs() {
        let cfg = config(&[
            (DATABASE_URL_VAR, "sqlite://ledger.db"),
            (LOG_FORMAT_VAR, "pretty"),
            (BIND_ADDR_VAR, "127.0.0.1:9000"),
        ])
        .unwrap();
        assert_eq!(
            cfg.store,
            StoreConfig::Sqlite {
                url: "sqlite://ledger.db".to_string()
            }
        );
        assert_eq!(cfg.log_format, LogFormat::Pretty);
        assert_eq!(cfg.bind_addr.to_string(), "127.0.0.1:9000");
    }

    #[test]
    fn blank_database_url_means_in_memory() {
        assert_eq!(config(&[(DATABASE_URL_VAR, "  ")]).unwrap().store, StoreConfig::InMemory);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            config(&[(BIND_ADDR_VAR, "localhost")]),
            Err(ConfigError::InvalidBindAddr(_))
        ));
        assert!(matches!(
            config(&[(DATABASE_URL_VAR, "postgres://db")]),
            Err(ConfigError::UnsupportedDatabaseUrl(_))
        ));
        assert!(matches!(
            config(&[(LOG_FORMAT_VAR, "xml")]),
            Err(ConfigError::InvalidLogFormat(_))
        ));
    }
}
