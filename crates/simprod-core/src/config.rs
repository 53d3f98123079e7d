// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for the reconciliation daemon.

use std::path::PathBuf;
use std::time::Duration;

/// Daemon configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Request database URL (SQLite)
    pub database_url: String,
    /// Delay between reconciliation passes
    pub poll_interval: Duration,
    /// Grid middleware bridge executable
    pub backend_bin: PathBuf,
    /// Timeout for a single bridge invocation
    pub backend_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("SIMPROD_DATABASE_URL")
            .unwrap_or_else(|| "sqlite:requests.db?mode=rwc".to_string());

        let poll_interval = parse_secs(&lookup, "SIMPROD_POLL_INTERVAL_SECS", 60)?;
        if poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "SIMPROD_POLL_INTERVAL_SECS",
                value: "0".to_string(),
            });
        }

        let backend_bin =
            PathBuf::from(lookup("SIMPROD_BACKEND_BIN").unwrap_or_else(|| "ganga-bridge".to_string()));

        let backend_timeout = parse_secs(&lookup, "SIMPROD_BACKEND_TIMEOUT_SECS", 120)?;
        if backend_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "SIMPROD_BACKEND_TIMEOUT_SECS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            database_url,
            poll_interval,
            backend_bin,
            backend_timeout,
        })
    }
}

fn parse_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: u64,
) -> Result<Duration, ConfigError> {
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(Duration::from_secs(default)),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable holds a value that cannot be used.
    #[error("Invalid value for {key}: {value}")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Rejected value.
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.database_url, "sqlite:requests.db?mode=rwc");
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.backend_bin, PathBuf::from("ganga-bridge"));
        assert_eq!(config.backend_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("SIMPROD_DATABASE_URL", "sqlite::memory:"),
            ("SIMPROD_POLL_INTERVAL_SECS", "5"),
            ("SIMPROD_BACKEND_BIN", "/opt/grid/bridge"),
        ]))
        .unwrap();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.backend_bin, PathBuf::from("/opt/grid/bridge"));
    }

    #[test]
    fn test_invalid_interval() {
        let err = Config::from_lookup(lookup_from(&[("SIMPROD_POLL_INTERVAL_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { key: "SIMPROD_POLL_INTERVAL_SECS", .. }
        ));

        assert!(Config::from_lookup(lookup_from(&[("SIMPROD_POLL_INTERVAL_SECS", "0")])).is_err());
    }

    #[test]
    fn test_zero_backend_timeout_rejected() {
        let err = Config::from_lookup(lookup_from(&[("SIMPROD_BACKEND_TIMEOUT_SECS", "0")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { key: "SIMPROD_BACKEND_TIMEOUT_SECS", .. }
        ));

        let config =
            Config::from_lookup(lookup_from(&[("SIMPROD_BACKEND_TIMEOUT_SECS", "30")])).unwrap();
        assert_eq!(config.backend_timeout, Duration::from_secs(30));
    }
}
