// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for simprod-core.

use thiserror::Error;

use crate::backend::{BackendError, JobStatus};
use crate::request::RequestStatus;

/// Errors raised while storing or reconciling requests.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration loading failed.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Applying migrations failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The request's macro specification cannot be turned into a job.
    #[error("Malformed request {request_id}: {source}")]
    MalformedRequest {
        /// Request whose macros are malformed.
        request_id: i64,
        /// What is wrong with them.
        #[source]
        source: crate::macro_spec::MacroSpecError,
    },

    /// The backend job is in a state not allowed for the request's status.
    #[error("Request {request_id} is {request_status} but its job {job_id} is {job_status}")]
    UnexpectedJobState {
        /// Request being reconciled.
        request_id: i64,
        /// Status the request is in.
        request_status: RequestStatus,
        /// Backend job identifier.
        job_id: String,
        /// Status the job reported.
        job_status: JobStatus,
    },

    /// A request that should have a backend job has none.
    #[error("Request {request_id} is {request_status} but has no backend job")]
    MissingJob {
        /// Request being reconciled.
        request_id: i64,
        /// Status the request is in.
        request_status: RequestStatus,
    },

    /// The job backend could not be reached; retried on the next pass.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Any other backend failure.
    #[error("Backend error: {0}")]
    Backend(BackendError),

    /// The request row changed underneath the reconciler.
    #[error("Request {request_id} was modified concurrently (expected status {expected})")]
    ConcurrentModification {
        /// Request that changed.
        request_id: i64,
        /// Status the reconciler expected to find.
        expected: RequestStatus,
    },

    /// Request was not found.
    #[error("Request not found: {0}")]
    RequestNotFound(i64),

    /// A stored row could not be decoded.
    #[error("Corrupt request row {request_id}: {details}")]
    CorruptRow {
        /// Offending request.
        request_id: i64,
        /// Decoding failure.
        details: String,
    },

    /// Post-completion handling failed.
    #[error("Completion handling failed for request {request_id}: {details}")]
    Completion {
        /// Request whose results could not be handled.
        request_id: i64,
        /// Failure details.
        details: String,
    },
}

impl From<BackendError> for Error {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Unavailable(details) => Error::BackendUnavailable(details),
            other => Error::Backend(other),
        }
    }
}

impl Error {
    /// Whether the failure is transient and the request should simply be
    /// retried on the next pass.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::BackendUnavailable(_) | Error::ConcurrentModification { .. }
        )
    }
}

/// Result type using simprod-core Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_backend_maps_to_transient_error() {
        let err: Error = BackendError::Unavailable("grid down".to_string()).into();
        assert!(matches!(err, Error::BackendUnavailable(ref d) if d == "grid down"));
        assert!(err.is_transient());
    }

    #[test]
    fn test_other_backend_errors_are_not_transient() {
        let err: Error = BackendError::CreateFailed("no quota".to_string()).into();
        assert!(matches!(err, Error::Backend(BackendError::CreateFailed(_))));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_unexpected_job_state_message() {
        let err = Error::UnexpectedJobState {
            request_id: 5,
            request_status: RequestStatus::Running,
            job_id: "t5".to_string(),
            job_status: JobStatus::Approved,
        };
        assert_eq!(
            err.to_string(),
            "Request 5 is Running but its job t5 is Approved"
        );
    }
}
