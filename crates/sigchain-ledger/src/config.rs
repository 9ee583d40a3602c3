//! Server configuration
//!
//! Read from the environment:
//!
//! | Variable | Default |
//! |---|---|
//! | `SIGCHAIN_PORT` | `8080` |
//! | `SIGCHAIN_LOG_LEVEL` | `info` |
//! | `SIGCHAIN_NODE_NAME` | `sigchain-<uuid>` |
//! | `SIGCHAIN_MAX_CLOCK_SKEW_SECS` | `3600` |

use std::env;
use thiserror::Error;
use tracing::Level;

/// Allowed distance between a caller timestamp and the transaction time
pub const DEFAULT_MAX_CLOCK_SKEW_SECS: i64 = 3600;

/// Largest skew a `chrono::Duration` can hold in whole seconds
pub const MAX_CLOCK_SKEW_SECS: i64 = i64::MAX / 1000;

pub const DEFAULT_PORT: u16 = 8080;

/// Error raised for unusable configuration values
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Settings of the ledger server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub port: u16,
    pub log_level: Level,
    /// Name reported by `/ready`
    pub node_name: String,
    pub max_clock_skew_secs: i64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            log_level: Level::INFO,
            node_name: default_node_name(),
            max_clock_skew_secs: DEFAULT_MAX_CLOCK_SKEW_SECS,
        }
    }
}

impl LedgerConfig {
    /// Read configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to its value
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("SIGCHAIN_PORT") {
            config.port = value.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "SIGCHAIN_PORT",
                expected: "a valid port number",
                value,
            })?;
        }

        // Unknown levels fall back to INFO
        if let Some(value) = lookup("SIGCHAIN_LOG_LEVEL") {
            config.log_level = value.trim().parse().unwrap_or(Level::INFO);
        }

        if let Some(value) = lookup("SIGCHAIN_NODE_NAME") {
            if !value.trim().is_empty() {
                config.node_name = value.trim().to_string();
            }
        }

        if let Some(value) = lookup("SIGCHAIN_MAX_CLOCK_SKEW_SECS") {
            config.max_clock_skew_secs = match value.trim().parse::<i64>() {
                Ok(secs) if (0..=MAX_CLOCK_SKEW_SECS).contains(&secs) => secs,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "SIGCHAIN_MAX_CLOCK_SKEW_SECS",
                        expected: "a number of seconds between 0 and 9223372036854775",
                        value,
                    })
                }
            };
        }

        Ok(config)
    }
}

fn default_node_name() -> String {
    format!("sigchain-{}", uuid::Uuid::new_v4())
}
