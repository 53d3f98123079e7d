// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Job backend trait definitions.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::macro_spec::MacroSpec;
use crate::request::{Request, RequestStatus};

/// Default cap on simultaneously active units of one job.
pub const DEFAULT_MAX_ACTIVE_UNITS: u32 = 100;

/// Errors from backend operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BackendError {
    /// The backend could not be reached; retry on the next pass.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Job creation failed and nothing was created.
    #[error("Job creation failed: {0}")]
    CreateFailed(String),

    /// The referenced job does not exist.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// The backend reported a status outside the known set.
    #[error("Invalid job status: {0}")]
    InvalidStatus(String),

    /// The backend replied with something that could not be understood.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for backend operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Status of a backend job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum JobStatus {
    /// Created but not yet running.
    Approved,
    /// Paused by an operator or the backend.
    Paused,
    /// Units are being processed.
    Running,
    /// All units finished.
    Completed,
}

impl JobStatus {
    /// Capitalized form, matching the request status it maps to.
    pub fn as_str(&self) -> &'static str {
        self.to_request_status().as_str()
    }

    /// The request status mirroring this job status.
    pub fn to_request_status(self) -> RequestStatus {
        match self {
            JobStatus::Approved => RequestStatus::Approved,
            JobStatus::Paused => RequestStatus::Paused,
            JobStatus::Running => RequestStatus::Running,
            JobStatus::Completed => RequestStatus::Completed,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = BackendError;

    /// Backends report statuses in lowercase; matching is case-insensitive.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approved" => Ok(JobStatus::Approved),
            "paused" => Ok(JobStatus::Paused),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            _ => Err(BackendError::InvalidStatus(s.to_string())),
        }
    }
}

impl TryFrom<String> for JobStatus {
    type Error = BackendError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_ascii_lowercase()
    }
}

/// Handle for a backend job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Backend identifier for the job.
    pub job_id: String,
    /// Request this job was created for (`requestdb_id` on the backend).
    pub request_id: i64,
    /// Status as of when the handle was obtained.
    pub status: JobStatus,
}

/// Everything the backend needs to create a job for a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Request the job belongs to.
    pub request_id: i64,
    /// Simulation application version.
    pub app_version: String,
    /// Reduction version.
    pub reduction_version: String,
    /// Macro repository tag.
    pub tag: String,
    /// Column-aligned macro/njobs/nevents/seed lists.
    pub macros: MacroSpec,
    /// Maximum number of units the backend runs at once.
    pub max_active_units: u32,
}

impl JobSpec {
    /// Build a job spec from a request and its parsed macros.
    pub fn for_request(request: &Request, macros: MacroSpec) -> Self {
        Self {
            request_id: request.id,
            app_version: request.app_version.clone(),
            reduction_version: request.reduction_version.clone(),
            tag: request.tag.clone(),
            macros,
            max_active_units: DEFAULT_MAX_ACTIVE_UNITS,
        }
    }
}

/// Trait for job backends.
///
/// Backends do NOT access the request database; recording job ids and
/// statuses on requests is the caller's job.
#[async_trait]
pub trait JobBackend: Send + Sync {
    /// Backend type identifier (e.g., "command", "mock").
    fn backend_type(&self) -> &'static str;

    /// Find the job created for a request, if any.
    async fn find(&self, request_id: i64) -> Result<Option<Job>>;

    /// Create and submit a job.
    ///
    /// Atomic from the caller's point of view: either a fully configured
    /// job is returned or nothing exists on the backend.
    async fn create(&self, spec: &JobSpec) -> Result<Job>;

    /// Current status of a job.
    async fn status(&self, job: &Job) -> Result<JobStatus>;

    /// Destroy a job, optionally removing the grid tasks it submitted.
    async fn destroy(&self, job: &Job, remove_submitted_tasks: bool) -> Result<()>;
}
