// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mock backend for testing.
//!
//! Keeps jobs in memory and lets tests drive their statuses and inject
//! failures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::traits::*;

/// Mock job state.
#[derive(Debug, Clone)]
struct MockJob {
    job: Job,
    spec: Option<JobSpec>,
}

/// Record of a `destroy` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestroyedJob {
    /// Job that was destroyed.
    pub job_id: String,
    /// Request the job belonged to.
    pub request_id: i64,
    /// Whether submitted grid tasks were removed too.
    pub removed_tasks: bool,
}

/// In-memory job backend.
pub struct MockBackend {
    jobs: Mutex<HashMap<String, MockJob>>,
    destroyed: Mutex<Vec<DestroyedJob>>,
    next_id: AtomicU64,
    create_calls: AtomicU64,
    created_status: JobStatus,
    unavailable: AtomicBool,
    fail_create: AtomicBool,
    fail_configure: AtomicBool,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a new mock backend whose jobs start out running.
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            destroyed: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            create_calls: AtomicU64::new(0),
            created_status: JobStatus::Running,
            unavailable: AtomicBool::new(false),
            fail_create: AtomicBool::new(false),
            fail_configure: AtomicBool::new(false),
        }
    }

    /// Set the status newly created jobs report.
    pub fn with_created_status(mut self, status: JobStatus) -> Self {
        self.created_status = status;
        self
    }

    /// Make every call fail with [`BackendError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make `create` fail before allocating anything.
    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Make `create` fail after allocating a job.
    ///
    /// The half-built job is discarded before returning, as a real backend
    /// must do to keep `create` atomic.
    pub fn set_fail_configure(&self, fail: bool) {
        self.fail_configure.store(fail, Ordering::SeqCst);
    }

    /// Register a job that already exists on the backend.
    pub async fn insert_job(&self, request_id: i64, status: JobStatus) -> Job {
        let job = Job {
            job_id: self.allocate_id(),
            request_id,
            status,
        };
        self.jobs.lock().await.insert(
            job.job_id.clone(),
            MockJob {
                job: job.clone(),
                spec: None,
            },
        );
        job
    }

    /// Change the status of the job belonging to a request.
    pub async fn set_status(&self, request_id: i64, status: JobStatus) {
        let mut jobs = self.jobs.lock().await;
        if let Some(mock) = jobs.values_mut().find(|m| m.job.request_id == request_id) {
            mock.job.status = status;
        }
    }

    /// Number of times `create` was called, successful or not.
    pub fn create_calls(&self) -> u64 {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of live jobs.
    pub async fn job_count(&self) -> usize {
        self.jobs.lock().await.len()
    }

    /// Jobs that exist for a request.
    pub async fn jobs_for_request(&self, request_id: i64) -> Vec<Job> {
        self.jobs
            .lock()
            .await
            .values()
            .filter(|m| m.job.request_id == request_id)
            .map(|m| m.job.clone())
            .collect()
    }

    /// Spec a job was created from.
    pub async fn spec_for_request(&self, request_id: i64) -> Option<JobSpec> {
        self.jobs
            .lock()
            .await
            .values()
            .find(|m| m.job.request_id == request_id)
            .and_then(|m| m.spec.clone())
    }

    /// All `destroy` calls so far.
    pub async fn destroyed(&self) -> Vec<DestroyedJob> {
        self.destroyed.lock().await.clone()
    }

    fn allocate_id(&self) -> String {
        format!("mock_{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("mock backend offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl JobBackend for MockBackend {
    fn backend_type(&self) -> &'static str {
        "mock"
    }

    async fn find(&self, request_id: i64) -> Result<Option<Job>> {
        self.check_available()?;
        let jobs = self.jobs.lock().await;
        Ok(jobs
            .values()
            .find(|m| m.job.request_id == request_id)
            .map(|m| m.job.clone()))
    }

    async fn create(&self, spec: &JobSpec) -> Result<Job> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        if self.fail_create.load(Ordering::SeqCst) {
            return Err(BackendError::CreateFailed("mock create failure".to_string()));
        }

        let job = Job {
            job_id: self.allocate_id(),
            request_id: spec.request_id,
            status: self.created_status,
        };

        let mut jobs = self.jobs.lock().await;
        jobs.insert(
            job.job_id.clone(),
            MockJob {
                job: job.clone(),
                spec: Some(spec.clone()),
            },
        );

        if self.fail_configure.load(Ordering::SeqCst) {
            jobs.remove(&job.job_id);
            return Err(BackendError::CreateFailed(format!(
                "mock configuration failure for {}",
                job.job_id
            )));
        }

        Ok(job)
    }

    async fn status(&self, job: &Job) -> Result<JobStatus> {
        self.check_available()?;
        let jobs = self.jobs.lock().await;
        jobs.get(&job.job_id)
            .map(|m| m.job.status)
            .ok_or_else(|| BackendError::JobNotFound(job.job_id.clone()))
    }

    async fn destroy(&self, job: &Job, remove_submitted_tasks: bool) -> Result<()> {
        self.check_available()?;
        self.jobs.lock().await.remove(&job.job_id);
        self.destroyed.lock().await.push(DestroyedJob {
            job_id: job.job_id.clone(),
            request_id: job.request_id,
            removed_tasks: remove_submitted_tasks,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macro_spec::MacroSpec;

    fn test_spec(request_id: i64) -> JobSpec {
        JobSpec {
            request_id,
            app_version: "4.1.0".to_string(),
            reduction_version: "2.0".to_string(),
            tag: "v1.2".to_string(),
            macros: MacroSpec::parse("a.mac 1 10 5").unwrap(),
            max_active_units: DEFAULT_MAX_ACTIVE_UNITS,
        }
    }

    #[tokio::test]
    async fn test_create_then_find() {
        let backend = MockBackend::new();
        let job = backend.create(&test_spec(3)).await.unwrap();

        assert_eq!(job.request_id, 3);
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(backend.find(3).await.unwrap(), Some(job.clone()));
        assert_eq!(backend.find(4).await.unwrap(), None);
        assert_eq!(backend.spec_for_request(3).await, Some(test_spec(3)));
    }

    #[tokio::test]
    async fn test_status_follows_set_status() {
        let backend = MockBackend::new();
        let job = backend.insert_job(9, JobStatus::Running).await;

        backend.set_status(9, JobStatus::Paused).await;

        assert_eq!(backend.status(&job).await.unwrap(), JobStatus::Paused);
    }

    #[tokio::test]
    async fn test_failed_configuration_leaves_nothing_behind() {
        let backend = MockBackend::new();
        backend.set_fail_configure(true);

        let result = backend.create(&test_spec(1)).await;

        assert!(matches!(result, Err(BackendError::CreateFailed(_))));
        assert_eq!(backend.job_count().await, 0);
        assert_eq!(backend.create_calls(), 1);
    }

    #[tokio::test]
    async fn test_destroy_records_call() {
        let backend = MockBackend::new();
        let job = backend.insert_job(2, JobStatus::Approved).await;

        backend.destroy(&job, true).await.unwrap();

        assert_eq!(backend.job_count().await, 0);
        assert_eq!(
            backend.destroyed().await,
            vec![DestroyedJob {
                job_id: job.job_id.clone(),
                request_id: 2,
                removed_tasks: true
            }]
        );
        assert!(matches!(
            backend.status(&job).await,
            Err(BackendError::JobNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unavailable() {
        let backend = MockBackend::new();
        backend.set_unavailable(true);

        assert!(matches!(
            backend.find(1).await,
            Err(BackendError::Unavailable(_))
        ));
    }
}
