// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for simprod-tags.

use thiserror::Error;

/// Errors raised by the macro repository, cache and generator.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration loading failed.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// A git command failed.
    #[error("git {command} failed: {details}")]
    Git {
        /// Subcommand that failed.
        command: &'static str,
        /// Captured stderr or spawn failure.
        details: String,
    },

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested macro does not exist in the tag.
    #[error("Macro file '{path}' doesn't exist in tag {tag}")]
    MacroNotFound {
        /// Tag that was checked out.
        tag: String,
        /// Macro path relative to the repository root.
        path: String,
    },

    /// The tag name cannot be passed to git.
    #[error("Invalid tag: {0:?}")]
    InvalidTag(String),

    /// The macro path points outside the repository.
    #[error("Invalid macro path: {0:?}")]
    InvalidMacroPath(String),
}

/// Result type using simprod-tags Error.
pub type Result<T> = std::result::Result<T, Error>;
