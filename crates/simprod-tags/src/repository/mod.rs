// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Macro repository access.
//!
//! A [`MacroRepository`] is one shared working tree. Checking out a tag
//! changes the files every reader sees, so mutating operations are only
//! reachable through a [`CheckoutGuard`], obtained from
//! [`WorkingTree::lock`].

pub mod git;
pub mod mock;

use std::path::{Component, Path};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};

use crate::error::{Error, Result};

pub use git::GitRepository;
pub use mock::MockRepository;

/// Version-controlled directory of run macros.
#[async_trait]
pub trait MacroRepository: Send + Sync {
    /// Root of the working tree.
    fn root(&self) -> &Path;

    /// Refresh remote refs.
    async fn fetch(&self) -> Result<()>;

    /// Switch the working tree to `tag`.
    async fn checkout(&self, tag: &str) -> Result<()>;

    /// Names of all tags, unordered.
    async fn tags(&self) -> Result<Vec<String>>;
}

/// Reject tag names git could read as an option or that are unusable as refs.
pub fn validate_tag(tag: &str) -> Result<()> {
    if tag.is_empty()
        || tag.starts_with('-')
        || tag.chars().any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(Error::InvalidTag(tag.to_string()));
    }
    Ok(())
}

/// Reject macro paths that are absolute or climb out of the working tree.
pub fn validate_macro_path(path: &str) -> Result<()> {
    let valid = !path.is_empty()
        && Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !valid {
        return Err(Error::InvalidMacroPath(path.to_string()));
    }
    Ok(())
}

/// A macro repository plus the lock serializing changes to its working tree.
pub struct WorkingTree {
    repo: Arc<dyn MacroRepository>,
    lock: Mutex<()>,
}

impl WorkingTree {
    /// Wrap a repository.
    pub fn new(repo: Arc<dyn MacroRepository>) -> Self {
        Self {
            repo,
            lock: Mutex::new(()),
        }
    }

    /// Root of the working tree.
    pub fn root(&self) -> &Path {
        self.repo.root()
    }

    /// Tag names. Reads refs only, so no lock is taken.
    pub async fn tags(&self) -> Result<Vec<String>> {
        self.repo.tags().await
    }

    /// Wait for exclusive access to the working tree.
    pub async fn lock(&self) -> CheckoutGuard<'_> {
        CheckoutGuard {
            repo: self.repo.as_ref(),
            _guard: self.lock.lock().await,
        }
    }
}

/// Exclusive access to the working tree; released on drop.
pub struct CheckoutGuard<'a> {
    repo: &'a dyn MacroRepository,
    _guard: MutexGuard<'a, ()>,
}

impl CheckoutGuard<'_> {
    /// Root of the working tree.
    pub fn root(&self) -> &Path {
        self.repo.root()
    }

    /// Refresh remote refs.
    pub async fn fetch(&self) -> Result<()> {
        self.repo.fetch().await
    }

    /// Validate `tag` and check it out.
    pub async fn checkout(&self, tag: &str) -> Result<()> {
        validate_tag(tag)?;
        self.repo.checkout(tag).await
    }
}
