// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Per-tag macro listings with an LRU cache in front of the working tree.
//!
//! A listing is rendered by checking the tag out and walking the app's macro
//! directory, which is slow and needs exclusive use of the working tree.
//! Rendered listings are kept keyed by `app::tag` and never expire by time:
//! a published tag is treated as immutable, so if a tag is moved upstream
//! the old listing is served until it is evicted or the process restarts.
//!
//! Cache hits only take the map lock. Misses take the working-tree lock and
//! look in the cache again once they hold it, so callers racing on the same
//! key cause a single checkout.

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;

use lru::LruCache;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::MacroDirectories;
use crate::error::Result;
use crate::natural;
use crate::repository::WorkingTree;

/// Extension of run macro files.
const MACRO_EXTENSION: &str = "mac";

/// One macro file in a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroEntry {
    /// File stem.
    pub name: String,
    /// Path relative to the working-tree root, `/`-separated.
    pub path: String,
}

/// Render entries as `name<TAB>path` lines.
pub fn render(entries: &[MacroEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("{}\t{}\n", e.name, e.path))
        .collect()
}

/// Recursively collect `.mac` files below `root/subdir`, sorted by path.
///
/// A missing subdirectory yields no entries.
pub async fn collect_macros(root: &Path, subdir: &str) -> Result<Vec<MacroEntry>> {
    let mut entries = Vec::new();
    let mut pending = vec![root.join(subdir)];

    while let Some(dir) = pending.pop() {
        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = read_dir.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                pending.push(path);
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(MACRO_EXTENSION) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            entries.push(MacroEntry {
                name: name.to_string(),
                path: relative,
            });
        }
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

fn cache_key(app: &str, tag: &str) -> String {
    format!("{}::{}", app, tag)
}

/// Macro listings per `(app, tag)`, backed by the shared working tree.
pub struct TagMacroCache {
    tree: Arc<WorkingTree>,
    macro_dirs: MacroDirectories,
    entries: Mutex<LruCache<String, String>>,
}

impl TagMacroCache {
    /// Create a cache holding at most `capacity` listings.
    pub fn new(tree: Arc<WorkingTree>, macro_dirs: MacroDirectories, capacity: NonZeroUsize) -> Self {
        Self {
            tree,
            macro_dirs,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// All tags, naturally sorted with the highest version first. Not cached.
    pub async fn list_tags(&self) -> Result<Vec<String>> {
        let mut tags = self.tree.tags().await?;
        natural::sort_descending(&mut tags);
        Ok(tags)
    }

    /// Rendered macro listing for `app` at `tag`.
    ///
    /// Unknown apps yield an empty listing, which is not cached. Failures
    /// are returned as-is and leave the cache untouched.
    pub async fn list_macros(&self, app: &str, tag: &str) -> Result<String> {
        let Some(subdir) = self.macro_dirs.get(app) else {
            debug!(app, tag, "Unknown app, returning empty macro listing");
            return Ok(String::new());
        };

        let key = cache_key(app, tag);
        if let Some(listing) = self.cached(&key).await {
            debug!(app, tag, "Macro listing cache hit");
            return Ok(listing);
        }

        let tree = self.tree.lock().await;

        // Another caller may have rendered it while we waited.
        if let Some(listing) = self.cached(&key).await {
            debug!(app, tag, "Macro listing rendered while waiting for checkout");
            return Ok(listing);
        }

        tree.checkout(tag).await?;
        let macros = collect_macros(tree.root(), subdir).await?;
        let listing = render(&macros);

        self.entries.lock().await.put(key, listing.clone());
        drop(tree);

        info!(app, tag, macros = macros.len(), "Rendered macro listing");
        Ok(listing)
    }

    /// Whether a listing is cached, without touching its recency.
    pub async fn contains(&self, app: &str, tag: &str) -> bool {
        self.entries.lock().await.contains(&cache_key(app, tag))
    }

    /// Number of cached listings.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    async fn cached(&self, key: &str) -> Option<String> {
        self.entries.lock().await.get(key).cloned()
    }
}
