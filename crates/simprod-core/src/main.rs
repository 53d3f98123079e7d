// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Simprod Daemon - Request/Job Reconciliation
//!
//! Polls the request database and keeps each request's status in line with
//! its grid job until interrupted.

use std::sync::Arc;
use tracing::{info, warn};

use simprod_core::backend::{CommandBackend, JobBackend};
use simprod_core::completion::LogCompletionHandler;
use simprod_core::config::Config;
use simprod_core::reconciler::{Reconciler, ReconcilerConfig};
use simprod_core::store::RequestStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "simprod_core=info".into()),
        )
        .init();

    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file loaded: {}", e);
    }

    let config = Config::from_env()?;

    info!(
        database_url = %config.database_url,
        poll_interval_secs = config.poll_interval.as_secs(),
        backend_bin = %config.backend_bin.display(),
        "Starting simprod daemon"
    );

    let store = RequestStore::connect(&config.database_url).await?;
    info!("Request database ready");

    let backend = Arc::new(CommandBackend::new(&config.backend_bin).with_timeout(config.backend_timeout));
    info!(backend_type = backend.backend_type(), "Backend initialized");

    let reconciler = Arc::new(Reconciler::new(
        store,
        backend,
        Arc::new(LogCompletionHandler),
        ReconcilerConfig {
            poll_interval: config.poll_interval,
        },
    ));
    let shutdown = reconciler.shutdown_handle();

    let worker = {
        let reconciler = reconciler.clone();
        tokio::spawn(async move { reconciler.run().await })
    };

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    // notify_one stores a permit, so a pass in progress still sees it.
    shutdown.notify_one();
    worker.await?;

    info!("Simprod daemon shut down");

    Ok(())
}
