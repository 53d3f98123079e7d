// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Simprod Core - Request/Job Reconciliation
//!
//! Keeps simulation production requests in step with the jobs that run them
//! on the grid. The front end writes requests; this crate polls them and
//! drives the job backend.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐        ┌──────────────────────┐
//! │  Submission front end│        │  Grid job middleware │
//! │  (writes requests)   │        │  (bridge executable) │
//! └──────────┬───────────┘        └──────────▲───────────┘
//!            │                               │ find / create / status / destroy
//!            ▼                               │
//! ┌──────────────────────┐  poll   ┌─────────┴────────────┐
//! │   SQLite requests    │◄───────►│      Reconciler      │
//! └──────────────────────┘   tx    └──────────────────────┘
//! ```
//!
//! # Configuration
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `SIMPROD_DATABASE_URL` | No | `sqlite:requests.db?mode=rwc` | Request database |
//! | `SIMPROD_POLL_INTERVAL_SECS` | No | `60` | Delay between passes |
//! | `SIMPROD_BACKEND_BIN` | No | `ganga-bridge` | Bridge executable |
//! | `SIMPROD_BACKEND_TIMEOUT_SECS` | No | `120` | Per-invocation bridge timeout |
//!
//! # Modules
//!
//! - [`backend`]: Job backend trait and adapters
//! - [`completion`]: Hook run when a job completes
//! - [`config`]: Daemon configuration from environment variables
//! - [`error`]: Error types
//! - [`macro_spec`]: Parsing of selected macro lines
//! - [`reconciler`]: The polling reconciliation worker
//! - [`request`]: Request model and status state machine
//! - [`store`]: SQLite request persistence

#![deny(missing_docs)]

/// Database migrations for the request table.
pub mod migrations;

/// Job backend trait and adapters.
pub mod backend;

/// Hook run when a job completes.
pub mod completion;

/// Daemon configuration loaded from environment variables.
pub mod config;

/// Error types for simprod-core.
pub mod error;

/// Parsing of selected macro lines.
pub mod macro_spec;

/// Background worker reconciling requests against backend jobs.
pub mod reconciler;

/// Request model and status state machine.
pub mod request;

/// SQLite request persistence.
pub mod store;

pub use backend::{Job, JobBackend, JobSpec, JobStatus};
pub use completion::{CompletionHandler, LogCompletionHandler};
pub use error::{Error, Result};
pub use macro_spec::{MacroSpec, MacroSpecError};
pub use reconciler::{PassReport, Reconciler, ReconcilerConfig, RequestFailure};
pub use request::{NewRequest, Request, RequestStatus};
pub use store::RequestStore;
