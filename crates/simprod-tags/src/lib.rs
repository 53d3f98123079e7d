// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Simprod Tags - Macro Repository Lookup
//!
//! Serves the tags of the macro repository and, per tag and application,
//! the run macros it contains. Listings are rendered from a single shared
//! git working tree and kept in a bounded LRU cache.
//!
//! # Configuration
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `SIMPROD_GIT_REPO` | No | `git@lz-git.ua.edu:sim/TDRAnalysis.git` | Upstream repository |
//! | `SIMPROD_GIT_DIR` | No | `git/TDRAnalysis` | Local working tree |
//! | `SIMPROD_TAGS_ADDR` | No | `0.0.0.0:8080` | HTTP listen address |
//! | `SIMPROD_TAG_CACHE_CAPACITY` | No | `50` | Cached listings |
//! | `SIMPROD_MACRO_DIRS` | No | `BACCARAT=BaccValidationMacros,LUXSim=BackgroundMacros` | App to macro directory mapping |

#![deny(missing_docs)]

/// Tag macro listing cache.
pub mod cache;

/// Service configuration loaded from environment variables.
pub mod config;

/// Error types for simprod-tags.
pub mod error;

/// HTTP routes.
pub mod http;

/// Runnable macro file generation.
pub mod macro_file;

/// Natural ordering of tag names.
pub mod natural;

/// Macro repository access and the working-tree lock.
pub mod repository;

pub use cache::TagMacroCache;
pub use config::{MacroDirectories, TagsConfig};
pub use error::{Error, Result};
pub use macro_file::MacroGenerator;
pub use repository::{GitRepository, MacroRepository, MockRepository, WorkingTree};
