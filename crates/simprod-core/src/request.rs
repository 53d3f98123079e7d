// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Production request model.
//!
//! # Request Status State Machine
//!
//! ```text
//!      ┌─────┐  approve   ┌──────────┐  job created  ┌─────────┐  job done  ┌───────────┐
//!      │ New │───────────►│ Approved │──────────────►│ Running │───────────►│ Completed │
//!      └─────┘            └────┬─────┘               └────┬────┘            └───────────┘
//!                              │ ▲                        │ ▲
//!                        pause │ │ resume           pause │ │ resume
//!                              ▼ │                        ▼ │
//!                           ┌────────┐               ┌────────┐
//!                           │ Paused │               │ Paused │
//!                           └────────┘               └────────┘
//! ```
//!
//! `New` requests have not been approved yet and `Completed` is terminal;
//! neither is polled by the reconciler.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a production request.
///
/// Persisted as the capitalized variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    /// Submitted, awaiting approval.
    New,
    /// Approved, a backend job should exist or be created.
    Approved,
    /// Backend job paused.
    Paused,
    /// Backend job running.
    Running,
    /// Backend job finished and results were handled.
    Completed,
}

impl RequestStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [RequestStatus; 5] = [
        RequestStatus::New,
        RequestStatus::Approved,
        RequestStatus::Paused,
        RequestStatus::Running,
        RequestStatus::Completed,
    ];

    /// The persisted string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::New => "New",
            RequestStatus::Approved => "Approved",
            RequestStatus::Paused => "Paused",
            RequestStatus::Running => "Running",
            RequestStatus::Completed => "Completed",
        }
    }

    /// Whether the reconciler polls requests in this status.
    pub fn is_monitored(&self) -> bool {
        !matches!(self, RequestStatus::New | RequestStatus::Completed)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored status string is not a known status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown request status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for RequestStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequestStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// A production request as stored in the `requests` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Unique request identifier.
    pub id: i64,
    /// Current lifecycle status.
    pub status: RequestStatus,
    /// Simulation application version.
    pub app_version: String,
    /// Reduction (analysis) version.
    pub reduction_version: String,
    /// Macro repository tag the macros are taken from.
    pub tag: String,
    /// Newline-delimited `macro njobs nevents seed` lines.
    pub selected_macros: String,
    /// Backend job identifier, once a job has been created.
    pub job_id: Option<String>,
    /// When the request was submitted.
    pub created_at: DateTime<Utc>,
    /// When the request row was last modified.
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied by the submission path when inserting a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRequest {
    /// Initial status (normally `New`).
    pub status: RequestStatus,
    /// Simulation application version.
    pub app_version: String,
    /// Reduction (analysis) version.
    pub reduction_version: String,
    /// Macro repository tag.
    pub tag: String,
    /// Newline-delimited macro spec lines.
    pub selected_macros: String,
}
