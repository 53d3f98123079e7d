// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP front end for the tag macro cache.
//!
//! | Route | Response |
//! |-------|----------|
//! | `GET /health` | `ok` |
//! | `GET /tags` | JSON array of tags, highest version first |
//! | `GET /tags/{tag}?app=<app>` | `text/plain` macro listing (`app` defaults to `LUXSim`) |
//! | `GET /tags/{tag}/macro?path=<path>&nevents=<n>&app=<app>` | `text/plain` runnable macro |
//!
//! Errors are returned as JSON `{"error": "..."}`.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::cache::TagMacroCache;
use crate::error::Error;
use crate::macro_file::MacroGenerator;

const DEFAULT_APP: &str = "LUXSim";
const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Tag macro listings.
    pub cache: Arc<TagMacroCache>,
    /// Runnable macro generation.
    pub generator: Arc<MacroGenerator>,
}

/// JSON error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponseBody {
    /// Error description.
    pub error: String,
}

/// Handler error; maps [`Error`] to a status code.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::InvalidTag(_) | Error::InvalidMacroPath(_) => StatusCode::BAD_REQUEST,
            Error::MacroNotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }
        (
            status,
            Json(ErrorResponseBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
struct ListingQuery {
    app: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MacroQuery {
    path: String,
    nevents: u64,
    app: Option<String>,
}

async fn health() -> &'static str {
    "ok"
}

async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.cache.list_tags().await?))
}

async fn list_macros(
    State(state): State<AppState>,
    Path(tag): Path<String>,
    Query(query): Query<ListingQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let app = query.app.as_deref().unwrap_or(DEFAULT_APP);
    let listing = state.cache.list_macros(app, &tag).await?;
    Ok(([(CONTENT_TYPE, TEXT_PLAIN)], listing))
}

async fn macro_file(
    State(state): State<AppState>,
    Path(tag): Path<String>,
    Query(query): Query<MacroQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let app = query.app.as_deref().unwrap_or(DEFAULT_APP);
    let file = state
        .generator
        .render(&tag, &query.path, app, query.nevents)
        .await?;
    let contents = tokio::fs::read_to_string(file.path())
        .await
        .map_err(Error::from)?;
    Ok(([(CONTENT_TYPE, TEXT_PLAIN)], contents))
}

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tags", get(list_tags))
        .route("/tags/{tag}", get(list_macros))
        .route("/tags/{tag}/macro", get(macro_file))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
