// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for the tags service.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::PathBuf;

/// Default number of rendered listings kept in memory.
pub const DEFAULT_CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(50) {
    Some(n) => n,
    None => unreachable!(),
};

/// Which subdirectory of the macro repository holds each application's macros.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDirectories {
    dirs: BTreeMap<String, String>,
}

impl Default for MacroDirectories {
    fn default() -> Self {
        Self::from_pairs([
            ("LUXSim", "BackgroundMacros"),
            ("BACCARAT", "BaccValidationMacros"),
        ])
    }
}

impl MacroDirectories {
    /// Build a mapping from `(app, directory)` pairs.
    pub fn from_pairs<I, A, D>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, D)>,
        A: Into<String>,
        D: Into<String>,
    {
        Self {
            dirs: pairs
                .into_iter()
                .map(|(app, dir)| (app.into(), dir.into()))
                .collect(),
        }
    }

    /// Parse `App=Dir,App=Dir`.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let mut dirs = BTreeMap::new();
        for entry in value.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (app, dir) = entry
                .split_once('=')
                .map(|(a, d)| (a.trim(), d.trim()))
                .filter(|(a, d)| !a.is_empty() && !d.is_empty())
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: "SIMPROD_MACRO_DIRS",
                    value: value.to_string(),
                })?;
            dirs.insert(app.to_string(), dir.to_string());
        }
        if dirs.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "SIMPROD_MACRO_DIRS",
                value: value.to_string(),
            });
        }
        Ok(Self { dirs })
    }

    /// Macro directory for `app`, if the app is known.
    pub fn get(&self, app: &str) -> Option<&str> {
        self.dirs.get(app).map(String::as_str)
    }

    /// Known application names.
    pub fn apps(&self) -> impl Iterator<Item = &str> {
        self.dirs.keys().map(String::as_str)
    }
}

/// Tags service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct TagsConfig {
    /// Upstream macro repository
    pub git_repo: String,
    /// Local working tree
    pub git_dir: PathBuf,
    /// HTTP listen address
    pub bind_addr: SocketAddr,
    /// Number of rendered listings kept in memory
    pub cache_capacity: NonZeroUsize,
    /// App to macro directory mapping
    pub macro_dirs: MacroDirectories,
}

impl TagsConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let git_repo = lookup("SIMPROD_GIT_REPO")
            .unwrap_or_else(|| "git@lz-git.ua.edu:sim/TDRAnalysis.git".to_string());

        let git_dir =
            PathBuf::from(lookup("SIMPROD_GIT_DIR").unwrap_or_else(|| "git/TDRAnalysis".to_string()));

        let bind_addr = match lookup("SIMPROD_TAGS_ADDR") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "SIMPROD_TAGS_ADDR",
                    value,
                })?,
            None => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };

        let cache_capacity = match lookup("SIMPROD_TAG_CACHE_CAPACITY") {
            Some(value) => value
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(NonZeroUsize::new)
                .ok_or(ConfigError::InvalidValue {
                    key: "SIMPROD_TAG_CACHE_CAPACITY",
                    value,
                })?,
            None => DEFAULT_CACHE_CAPACITY,
        };

        let macro_dirs = match lookup("SIMPROD_MACRO_DIRS") {
            Some(value) => MacroDirectories::parse(&value)?,
            None => MacroDirectories::default(),
        };

        Ok(Self {
            git_repo,
            git_dir,
            bind_addr,
            cache_capacity,
            macro_dirs,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable is set to something unusable.
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Value found.
        value: String,
    },
}
