// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Background worker reconciling requests against backend jobs.
//!
//! Each pass loads every request that is neither `New` nor `Completed`,
//! splits them into `Approved`, `Paused` and `Running`, and handles each
//! request on its own:
//!
//! | Request | Backend job | Action |
//! |---------|-------------|--------|
//! | Approved | none | parse macros, create job, record job id and status |
//! | Approved | exists | log, mirror the job's status (no second job) |
//! | Paused | not paused | mirror the job's status |
//! | Running | running | nothing |
//! | Running | paused | mark paused |
//! | Running | completed | run completion handling, mark completed |
//! | Running | anything else | `UnexpectedJobState` |
//!
//! Every request is handled on its own. Backend calls happen first, then a
//! single status-guarded write records the result. A failure leaves the
//! row as it was, destroys a job created during the failed attempt, and is
//! recorded in the [`PassReport`]; the remaining requests are still
//! processed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::backend::{Job, JobBackend, JobSpec, JobStatus};
use crate::completion::CompletionHandler;
use crate::error::{Error, Result};
use crate::macro_spec::MacroSpec;
use crate::request::{Request, RequestStatus};
use crate::store::RequestStore;

/// Configuration for the reconciler.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// How long to wait between passes.
    pub poll_interval: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
        }
    }
}

/// What happened to a single request during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A backend job was created and recorded.
    Created,
    /// The request status was updated to mirror its job.
    Synced,
    /// The job completed and the request was marked `Completed`.
    Completed,
    /// Nothing needed changing.
    Unchanged,
}

/// A request that could not be reconciled in a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFailure {
    /// Request that failed.
    pub request_id: i64,
    /// Status the request was left in.
    pub status: RequestStatus,
    /// Error description.
    pub error: String,
    /// Whether the failure is expected to clear up by itself.
    pub transient: bool,
}

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Requests loaded for this pass.
    pub examined: usize,
    /// Jobs created.
    pub created: usize,
    /// Requests whose status was synced from their job.
    pub synced: usize,
    /// Requests marked completed.
    pub completed: usize,
    /// Requests left as they were.
    pub unchanged: usize,
    /// Requests that failed.
    pub failed: usize,
    /// Details for each failed request.
    pub failures: Vec<RequestFailure>,
}

impl PassReport {
    fn record(&mut self, request: &Request, result: Result<Outcome>) {
        match result {
            Ok(Outcome::Created) => self.created += 1,
            Ok(Outcome::Synced) => self.synced += 1,
            Ok(Outcome::Completed) => self.completed += 1,
            Ok(Outcome::Unchanged) => self.unchanged += 1,
            Err(e) => {
                let transient = e.is_transient();
                if transient {
                    warn!(
                        request_id = request.id,
                        status = %request.status,
                        error = %e,
                        "Request not reconciled, will retry next pass"
                    );
                } else {
                    error!(
                        request_id = request.id,
                        status = %request.status,
                        error = %e,
                        "Failed to reconcile request"
                    );
                }
                self.failed += 1;
                self.failures.push(RequestFailure {
                    request_id: request.id,
                    status: request.status,
                    error: e.to_string(),
                    transient,
                });
            }
        }
    }

    /// Whether the pass changed anything or hit any failure.
    pub fn is_quiet(&self) -> bool {
        self.created == 0 && self.synced == 0 && self.completed == 0 && self.failed == 0
    }
}

/// Background worker that keeps request statuses in line with backend jobs.
pub struct Reconciler {
    store: RequestStore,
    backend: Arc<dyn JobBackend>,
    completion: Arc<dyn CompletionHandler>,
    config: ReconcilerConfig,
    shutdown: Arc<Notify>,
}

impl Reconciler {
    /// Create a new reconciler.
    pub fn new(
        store: RequestStore,
        backend: Arc<dyn JobBackend>,
        completion: Arc<dyn CompletionHandler>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            store,
            backend,
            completion,
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Get a handle that can be used to signal shutdown.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Run the reconciliation loop until shutdown is signalled.
    ///
    /// A pass runs immediately, then once per poll interval. Passes never
    /// overlap; shutdown takes effect between passes.
    pub async fn run(&self) {
        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            backend = self.backend.backend_type(),
            "Reconciler started"
        );

        self.run_pass().await;

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.notified() => {
                    info!("Reconciler received shutdown signal");
                    break;
                }

                _ = tokio::time::sleep(self.config.poll_interval) => {
                    self.run_pass().await;
                }
            }
        }

        info!("Reconciler stopped");
    }

    async fn run_pass(&self) {
        match self.reconcile_once().await {
            Ok(report) if report.is_quiet() => {
                debug!(examined = report.examined, "Reconciliation pass found nothing to do");
            }
            Ok(report) => {
                info!(
                    examined = report.examined,
                    created = report.created,
                    synced = report.synced,
                    completed = report.completed,
                    failed = report.failed,
                    "Reconciliation pass finished"
                );
            }
            Err(e) => {
                error!(error = %e, "Reconciliation pass failed");
            }
        }
    }

    /// Run a single reconciliation pass.
    ///
    /// Only failing to load the monitored requests is returned as an error;
    /// per-request failures are collected in the report.
    pub async fn reconcile_once(&self) -> Result<PassReport> {
        let requests = self.store.list_monitored().await?;

        let mut report = PassReport {
            examined: requests.len(),
            ..PassReport::default()
        };

        let mut approved = Vec::new();
        let mut paused = Vec::new();
        let mut running = Vec::new();
        for request in requests {
            match request.status {
                RequestStatus::Approved => approved.push(request),
                RequestStatus::Paused => paused.push(request),
                RequestStatus::Running => running.push(request),
                RequestStatus::New | RequestStatus::Completed => {}
            }
        }

        for request in &approved {
            let result = self.reconcile_approved(request).await;
            report.record(request, result);
        }

        for request in &paused {
            let result = self.reconcile_paused(request).await;
            report.record(request, result);
        }

        for request in &running {
            let result = self.reconcile_running(request).await;
            report.record(request, result);
        }

        Ok(report)
    }

    /// Create the job for an approved request, or sync from the one that exists.
    async fn reconcile_approved(&self, request: &Request) -> Result<Outcome> {
        let request = self.store.current(request.id, RequestStatus::Approved).await?;

        if let Some(job) = self.backend.find(request.id).await? {
            let status = self.backend.status(&job).await?;
            if status == JobStatus::Approved && request.job_id.as_deref() == Some(job.job_id.as_str())
            {
                return Ok(Outcome::Unchanged);
            }

            warn!(
                request_id = request.id,
                job_id = %job.job_id,
                job_status = %status,
                "Approved request already has a backend job, syncing status"
            );
            self.store
                .record_job(&request, &job.job_id, status.to_request_status())
                .await?;
            return Ok(Outcome::Synced);
        }

        let macros = MacroSpec::parse(&request.selected_macros).map_err(|source| {
            Error::MalformedRequest {
                request_id: request.id,
                source,
            }
        })?;
        let spec = JobSpec::for_request(&request, macros);

        let job = self.backend.create(&spec).await?;
        info!(
            request_id = request.id,
            job_id = %job.job_id,
            job_status = %job.status,
            units = spec.macros.len(),
            total_jobs = spec.macros.total_jobs(),
            "Created backend job"
        );

        if let Err(e) = self
            .store
            .record_job(&request, &job.job_id, job.status.to_request_status())
            .await
        {
            self.teardown(&job).await;
            return Err(e);
        }

        Ok(Outcome::Created)
    }

    /// Destroy a job whose creation could not be recorded.
    async fn teardown(&self, job: &Job) {
        match self.backend.destroy(job, true).await {
            Ok(()) => {
                info!(
                    request_id = job.request_id,
                    job_id = %job.job_id,
                    "Destroyed job created in failed reconciliation"
                );
            }
            Err(e) => {
                // The next pass finds the job and syncs the request from it.
                error!(
                    request_id = job.request_id,
                    job_id = %job.job_id,
                    error = %e,
                    "Failed to destroy job created in failed reconciliation"
                );
            }
        }
    }

    /// Propagate the job's status once it is no longer paused.
    async fn reconcile_paused(&self, request: &Request) -> Result<Outcome> {
        let Some(job) = self.backend.find(request.id).await? else {
            warn!(request_id = request.id, "Paused request has no backend job");
            return Ok(Outcome::Unchanged);
        };

        let status = self.backend.status(&job).await?;
        if status == JobStatus::Paused {
            return Ok(Outcome::Unchanged);
        }

        self.apply_job_status(request, &job, status).await
    }

    /// Check a running request's job and follow it to paused or completed.
    async fn reconcile_running(&self, request: &Request) -> Result<Outcome> {
        let job = self
            .backend
            .find(request.id)
            .await?
            .ok_or(Error::MissingJob {
                request_id: request.id,
                request_status: request.status,
            })?;

        let status = self.backend.status(&job).await?;
        match status {
            JobStatus::Running => Ok(Outcome::Unchanged),
            JobStatus::Paused | JobStatus::Completed => {
                self.apply_job_status(request, &job, status).await
            }
            JobStatus::Approved => Err(Error::UnexpectedJobState {
                request_id: request.id,
                request_status: request.status,
                job_id: job.job_id,
                job_status: status,
            }),
        }
    }

    /// Mirror `status` onto the request, running completion handling first
    /// when the job has completed.
    async fn apply_job_status(
        &self,
        request: &Request,
        job: &Job,
        status: JobStatus,
    ) -> Result<Outcome> {
        let request = self.store.current(request.id, request.status).await?;

        if status == JobStatus::Completed {
            self.completion
                .on_completed(&request, job)
                .await
                .map_err(|e| match e {
                    Error::Completion { .. } => e,
                    other => Error::Completion {
                        request_id: request.id,
                        details: other.to_string(),
                    },
                })?;
        }

        self.store
            .transition(&request, status.to_request_status())
            .await?;

        debug!(
            request_id = request.id,
            from = %request.status,
            to = %status,
            "Request status synced from job"
        );

        Ok(if status == JobStatus::Completed {
            Outcome::Completed
        } else {
            Outcome::Synced
        })
    }
}
