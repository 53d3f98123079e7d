// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SQLite-backed request store.
//!
//! Every status change is a single `UPDATE` guarded by the status the
//! caller last read, so a concurrent writer makes the update fail instead
//! of being overwritten. Nothing holds a transaction open while the
//! reconciler waits on the job backend.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{Error, Result};
use crate::request::{NewRequest, Request, RequestStatus};

/// Row as stored; `status` is decoded separately.
#[derive(Debug, sqlx::FromRow)]
struct RequestRow {
    id: i64,
    status: String,
    app_version: String,
    reduction_version: String,
    tag: String,
    selected_macros: String,
    job_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RequestRow> for Request {
    type Error = Error;

    fn try_from(row: RequestRow) -> Result<Self> {
        let status = row.status.parse().map_err(|e| Error::CorruptRow {
            request_id: row.id,
            details: format!("{}", e),
        })?;
        Ok(Request {
            id: row.id,
            status,
            app_version: row.app_version,
            reduction_version: row.reduction_version,
            tag: row.tag,
            selected_macros: row.selected_macros,
            job_id: row.job_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_REQUEST: &str = r#"
    SELECT id, status, app_version, reduction_version, tag, selected_macros,
           job_id, created_at, updated_at
    FROM requests
"#;

/// Persistent table of production requests.
#[derive(Clone)]
pub struct RequestStore {
    pool: SqlitePool,
}

impl RequestStore {
    /// Create a store over an existing, already migrated pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to `database_url` and apply migrations.
    ///
    /// File databases are opened in WAL mode so the submission front end can
    /// keep writing while the reconciler reads.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        crate::migrations::run(&pool).await?;
        Ok(Self { pool })
    }

    /// Open (creating if needed) a database file and apply migrations.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Self::connect(&format!("sqlite:{}?mode=rwc", path.to_string_lossy())).await
    }

    /// Underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert a request as submitted by the front end.
    pub async fn insert(&self, new: &NewRequest) -> Result<Request> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO requests
                (status, app_version, reduction_version, tag, selected_macros, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.status.as_str())
        .bind(&new.app_version)
        .bind(&new.reduction_version)
        .bind(&new.tag)
        .bind(&new.selected_macros)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get(id).await?.ok_or(Error::RequestNotFound(id))
    }

    /// Get a request by id.
    pub async fn get(&self, id: i64) -> Result<Option<Request>> {
        let row = sqlx::query_as::<_, RequestRow>(&format!("{} WHERE id = ?", SELECT_REQUEST))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Request::try_from).transpose()
    }

    /// Requests the reconciler polls: everything not `New` and not `Completed`.
    pub async fn list_monitored(&self) -> Result<Vec<Request>> {
        let rows = sqlx::query_as::<_, RequestRow>(&format!(
            "{} WHERE status NOT IN ('New', 'Completed') ORDER BY id",
            SELECT_REQUEST
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Request::try_from).collect()
    }

    /// Re-read a request and check it is still in `expected`.
    ///
    /// Fails with [`Error::ConcurrentModification`] if the row has moved on
    /// since it was polled.
    pub async fn current(&self, request_id: i64, expected: RequestStatus) -> Result<Request> {
        let request = self
            .get(request_id)
            .await?
            .ok_or(Error::RequestNotFound(request_id))?;

        if request.status != expected {
            return Err(Error::ConcurrentModification {
                request_id,
                expected,
            });
        }

        Ok(request)
    }

    /// Move `request` to `status`, provided the row is still in the status
    /// `request` was read with.
    ///
    /// This is a single autocommit statement, so no read snapshot is held
    /// while the caller talks to the backend.
    pub async fn transition(&self, request: &Request, status: RequestStatus) -> Result<Request> {
        self.update(request, status, None).await
    }

    /// Record the backend job created for `request` along with its status.
    pub async fn record_job(
        &self,
        request: &Request,
        job_id: &str,
        status: RequestStatus,
    ) -> Result<Request> {
        self.update(request, status, Some(job_id)).await
    }

    async fn update(
        &self,
        request: &Request,
        status: RequestStatus,
        job_id: Option<&str>,
    ) -> Result<Request> {
        let conflict = || Error::ConcurrentModification {
            request_id: request.id,
            expected: request.status,
        };

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE requests
            SET status = ?,
                job_id = COALESCE(?, job_id),
                updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(status.as_str())
        .bind(job_id)
        .bind(now)
        .bind(request.id)
        .bind(request.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| if is_busy(&e) { conflict() } else { e.into() })?;

        if result.rows_affected() == 0 {
            return Err(conflict());
        }

        debug!(
            request_id = request.id,
            from = %request.status,
            to = %status,
            "Request status updated"
        );

        let mut updated = request.clone();
        updated.status = status;
        if let Some(job_id) = job_id {
            updated.job_id = Some(job_id.to_string());
        }
        updated.updated_at = now;
        Ok(updated)
    }
}

/// SQLITE_BUSY, SQLITE_LOCKED and their extended codes (e.g. 517, BUSY_SNAPSHOT).
fn is_busy(err: &sqlx::Error) -> bool {
    let sqlx::Error::Database(db) = err else {
        return false;
    };
    db.code()
        .and_then(|code| code.parse::<i32>().ok())
        .is_some_and(|code| matches!(code & 0xff, 5 | 6))
}
