// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Eviction and concurrency tests for the tag macro cache.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use simprod_tags::cache::TagMacroCache;
use simprod_tags::config::MacroDirectories;
use simprod_tags::repository::{MockRepository, WorkingTree};

const CAPACITY: usize = 50;

fn repo_with_tags(temp: &TempDir, count: usize) -> MockRepository {
    let repo = MockRepository::new(temp.path().join("tree"));
    for i in 0..count {
        repo.add_tag(&format!("v{}", i), [(format!("BackgroundMacros/m{}.mac", i), "")]);
    }
    repo
}

fn cache_over(repo: Arc<MockRepository>) -> TagMacroCache {
    TagMacroCache::new(
        Arc::new(WorkingTree::new(repo)),
        MacroDirectories::default(),
        NonZeroUsize::new(CAPACITY).unwrap(),
    )
}

#[tokio::test]
async fn test_51st_key_evicts_least_recently_used() {
    let temp = TempDir::new().unwrap();
    let repo = Arc::new(repo_with_tags(&temp, CAPACITY + 1));
    let cache = cache_over(repo.clone());

    for i in 0..CAPACITY {
        cache.list_macros("LUXSim", &format!("v{}", i)).await.unwrap();
    }
    assert_eq!(cache.len().await, CAPACITY);

    cache.list_macros("LUXSim", &format!("v{}", CAPACITY)).await.unwrap();

    assert_eq!(cache.len().await, CAPACITY);
    assert!(!cache.contains("LUXSim", "v0").await);
    for i in 1..=CAPACITY {
        assert!(cache.contains("LUXSim", &format!("v{}", i)).await);
    }

    // The evicted key needs a fresh checkout.
    let checkouts = repo.checkouts();
    let listing = cache.list_macros("LUXSim", "v0").await.unwrap();
    assert_eq!(listing, "m0\tBackgroundMacros/m0.mac\n");
    assert_eq!(repo.checkouts(), checkouts + 1);
}

#[tokio::test]
async fn test_access_refreshes_recency() {
    let temp = TempDir::new().unwrap();
    let repo = Arc::new(repo_with_tags(&temp, CAPACITY + 1));
    let cache = cache_over(repo.clone());

    for i in 0..CAPACITY {
        cache.list_macros("LUXSim", &format!("v{}", i)).await.unwrap();
    }

    // Touch v0 so v1 becomes the least recently used.
    cache.list_macros("LUXSim", "v0").await.unwrap();
    cache.list_macros("LUXSim", &format!("v{}", CAPACITY)).await.unwrap();

    assert!(cache.contains("LUXSim", "v0").await);
    assert!(!cache.contains("LUXSim", "v1").await);
    assert_eq!(repo.checkouts(), CAPACITY + 1);
}

#[tokio::test]
async fn test_concurrent_misses_check_out_once() {
    let temp = TempDir::new().unwrap();
    let repo = Arc::new(
        repo_with_tags(&temp, 1).with_checkout_delay(Duration::from_millis(50)),
    );
    let cache = Arc::new(cache_over(repo.clone()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.list_macros("LUXSim", "v0").await.unwrap() })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), "m0\tBackgroundMacros/m0.mac\n");
    }
    assert_eq!(repo.checkouts(), 1);
}

#[tokio::test]
async fn test_different_tags_are_serialized() {
    let temp = TempDir::new().unwrap();
    let repo = Arc::new(
        repo_with_tags(&temp, 4).with_checkout_delay(Duration::from_millis(20)),
    );
    let cache = Arc::new(cache_over(repo.clone()));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.list_macros("LUXSim", &format!("v{}", i)).await.unwrap() })
        })
        .collect();

    // Each listing matches its own tag, so no walk saw another checkout.
    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(
            handle.await.unwrap(),
            format!("m{}\tBackgroundMacros/m{}.mac\n", i, i)
        );
    }
    assert_eq!(repo.checkouts(), 4);
}
