// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Post-completion handling for finished jobs.
//!
//! Runs before the request is marked `Completed`, with no database
//! transaction open. A failing handler leaves the request in its previous
//! status so the handling is retried on the next pass.

use async_trait::async_trait;
use tracing::info;

use crate::backend::Job;
use crate::error::Result;
use crate::request::Request;

/// Hook invoked when a request's backend job has completed.
#[async_trait]
pub trait CompletionHandler: Send + Sync {
    /// Handle the results of a completed job.
    async fn on_completed(&self, request: &Request, job: &Job) -> Result<()>;
}

/// Handler that only records the completion in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogCompletionHandler;

#[async_trait]
impl CompletionHandler for LogCompletionHandler {
    async fn on_completed(&self, request: &Request, job: &Job) -> Result<()> {
        info!(
            request_id = request.id,
            job_id = %job.job_id,
            tag = %request.tag,
            app_version = %request.app_version,
            "Job completed"
        );
        Ok(())
    }
}
