// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mock repository for testing.
//!
//! Tags are defined in memory; checking one out rewrites a real directory
//! so directory walks behave as they would on a git working tree.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::MacroRepository;
use crate::error::{Error, Result};

/// In-memory tags materialised into a directory on checkout.
pub struct MockRepository {
    root: PathBuf,
    tags: Mutex<HashMap<String, BTreeMap<String, String>>>,
    checkout_delay: Duration,
    checkouts: AtomicUsize,
    fetches: AtomicUsize,
    current: Mutex<Option<String>>,
}

impl MockRepository {
    /// Create a repository whose working tree is `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tags: Mutex::new(HashMap::new()),
            checkout_delay: Duration::ZERO,
            checkouts: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
            current: Mutex::new(None),
        }
    }

    /// Make every checkout take `delay`.
    pub fn with_checkout_delay(mut self, delay: Duration) -> Self {
        self.checkout_delay = delay;
        self
    }

    /// Define (or redefine) a tag as a set of `(path, contents)` files.
    pub fn add_tag<I, P, C>(&self, tag: &str, files: I)
    where
        I: IntoIterator<Item = (P, C)>,
        P: Into<String>,
        C: Into<String>,
    {
        let files = files
            .into_iter()
            .map(|(p, c)| (p.into(), c.into()))
            .collect();
        self.lock_tags().insert(tag.to_string(), files);
    }

    /// Number of checkouts performed.
    pub fn checkouts(&self) -> usize {
        self.checkouts.load(Ordering::SeqCst)
    }

    /// Number of fetches performed.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Tag currently checked out.
    pub fn current_tag(&self) -> Option<String> {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn lock_tags(&self) -> std::sync::MutexGuard<'_, HashMap<String, BTreeMap<String, String>>> {
        self.tags.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl MacroRepository for MockRepository {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn fetch(&self) -> Result<()> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn checkout(&self, tag: &str) -> Result<()> {
        self.checkouts.fetch_add(1, Ordering::SeqCst);
        if !self.checkout_delay.is_zero() {
            tokio::time::sleep(self.checkout_delay).await;
        }

        let files = self.lock_tags().get(tag).cloned().ok_or_else(|| Error::Git {
            command: "checkout",
            details: format!("pathspec '{}' did not match any file(s) known to git", tag),
        })?;

        if tokio::fs::try_exists(&self.root).await? {
            tokio::fs::remove_dir_all(&self.root).await?;
        }
        tokio::fs::create_dir_all(&self.root).await?;
        for (path, contents) in files {
            let full = self.root.join(&path);
            if let Some(parent) = full.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&full, contents).await?;
        }

        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(tag.to_string());
        Ok(())
    }

    async fn tags(&self) -> Result<Vec<String>> {
        Ok(self.lock_tags().keys().cloned().collect())
    }
}
