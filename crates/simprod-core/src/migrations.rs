// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Database migrations for simprod-core.
//!
//! # Example
//!
//! ```ignore
//! use sqlx::SqlitePool;
//! use simprod_core::migrations;
//!
//! let pool = SqlitePool::connect(&database_url).await?;
//! migrations::run(&pool).await?;
//! ```

use sqlx::migrate::MigrateError;

/// SQLite migrator with the request schema embedded.
pub static SQLITE: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Run SQLite migrations.
///
/// Safe to call multiple times; already-applied migrations are skipped.
pub async fn run(pool: &sqlx::SqlitePool) -> Result<(), MigrateError> {
    SQLITE.run(pool).await
}
