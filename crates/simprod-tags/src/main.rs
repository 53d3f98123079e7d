// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Simprod Tags - Macro Repository Lookup Server
//!
//! Clones or refreshes the macro repository, then serves tag and macro
//! listings over HTTP until interrupted.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use simprod_tags::cache::TagMacroCache;
use simprod_tags::config::TagsConfig;
use simprod_tags::http::{AppState, router};
use simprod_tags::macro_file::MacroGenerator;
use simprod_tags::repository::{GitRepository, WorkingTree};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "simprod_tags=info,tower_http=info".into()),
        )
        .init();

    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file loaded: {}", e);
    }

    let config = TagsConfig::from_env()?;

    info!(
        git_repo = %config.git_repo,
        git_dir = %config.git_dir.display(),
        addr = %config.bind_addr,
        cache_capacity = config.cache_capacity.get(),
        "Starting simprod tags service"
    );

    let repo = GitRepository::open_or_clone(&config.git_repo, &config.git_dir).await?;
    info!("Macro repository ready");

    let tree = Arc::new(WorkingTree::new(Arc::new(repo)));
    let state = AppState {
        cache: Arc::new(TagMacroCache::new(
            tree.clone(),
            config.macro_dirs.clone(),
            config.cache_capacity,
        )),
        generator: Arc::new(MacroGenerator::new(tree)),
    };

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "Tags service ready");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
        })
        .await?;

    info!("Simprod tags service shut down");

    Ok(())
}
