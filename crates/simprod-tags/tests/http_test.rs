// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP router tests against a mock macro repository.

use std::num::NonZeroUsize;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header::CONTENT_TYPE};
use tempfile::TempDir;
use tower::ServiceExt;

use simprod_tags::cache::TagMacroCache;
use simprod_tags::config::MacroDirectories;
use simprod_tags::http::{AppState, ErrorResponseBody, router};
use simprod_tags::macro_file::MacroGenerator;
use simprod_tags::repository::{MockRepository, WorkingTree};

struct TestApp {
    _temp: TempDir,
    repo: Arc<MockRepository>,
    router: Router,
}

fn test_app() -> TestApp {
    let temp = TempDir::new().unwrap();
    let repo = Arc::new(MockRepository::new(temp.path().join("TDRAnalysis")));
    repo.add_tag(
        "v1.2",
        [
            ("BackgroundMacros/Kr85.mac", "/run/initialize\n"),
            ("BackgroundMacros/Radon/Rn222.mac", "/run/initialize\n"),
            ("BaccValidationMacros/Cs137.mac", "/run/initialize\n"),
        ],
    );
    repo.add_tag("v1.10", [("BackgroundMacros/Kr85.mac", "")]);
    repo.add_tag("v1.1", [("BackgroundMacros/Kr85.mac", "")]);

    let tree = Arc::new(WorkingTree::new(repo.clone()));
    let state = AppState {
        cache: Arc::new(TagMacroCache::new(
            tree.clone(),
            MacroDirectories::default(),
            NonZeroUsize::new(50).unwrap(),
        )),
        generator: Arc::new(MacroGenerator::new(tree)),
    };

    TestApp {
        _temp: temp,
        repo,
        router: router(state),
    }
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Option<String>, String) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_health() {
    let app = test_app();
    let (status, _, body) = get(&app.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_list_tags() {
    let app = test_app();

    let (status, content_type, body) = get(&app.router, "/tags").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    let tags: Vec<String> = serde_json::from_str(&body).unwrap();
    assert_eq!(tags, vec!["v1.10", "v1.2", "v1.1"]);
}

#[tokio::test]
async fn test_list_macros_defaults_to_luxsim() {
    let app = test_app();

    let (status, content_type, body) = get(&app.router, "/tags/v1.2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/plain; charset=utf-8"));
    assert_eq!(
        body,
        "Kr85\tBackgroundMacros/Kr85.mac\nRn222\tBackgroundMacros/Radon/Rn222.mac\n"
    );
}

#[tokio::test]
async fn test_list_macros_for_app() {
    let app = test_app();

    let (_, _, body) = get(&app.router, "/tags/v1.2?app=BACCARAT").await;
    assert_eq!(body, "Cs137\tBaccValidationMacros/Cs137.mac\n");

    let (status, _, body) = get(&app.router, "/tags/v1.2?app=Geant4").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "");
}

#[tokio::test]
async fn test_repeated_listing_is_served_from_cache() {
    let app = test_app();

    let (_, _, first) = get(&app.router, "/tags/v1.2").await;
    let (_, _, second) = get(&app.router, "/tags/v1.2").await;

    assert_eq!(first, second);
    assert_eq!(app.repo.checkouts(), 1);
}

#[tokio::test]
async fn test_unknown_tag_is_server_error() {
    let app = test_app();

    let (status, _, body) = get(&app.router, "/tags/v9.9").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error: ErrorResponseBody = serde_json::from_str(&body).unwrap();
    assert!(error.error.contains("git checkout failed"));
}

#[tokio::test]
async fn test_generated_macro() {
    let app = test_app();

    let (status, _, body) = get(
        &app.router,
        "/tags/v1.2/macro?path=BaccValidationMacros/Cs137.mac&app=BACCARAT&nevents=250",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        "/run/initialize\n\n/control/getEnv SEED\n/Bacc/randomSeed {SEED}\n/Bacc/beamOn 250\nexit\n"
    );
    assert_eq!(app.repo.fetches(), 1);
}

#[tokio::test]
async fn test_generated_macro_errors() {
    let app = test_app();

    let (status, _, _) = get(
        &app.router,
        "/tags/v1.2/macro?path=BackgroundMacros/Missing.mac&nevents=1",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = get(&app.router, "/tags/v1.2/macro?path=/etc/passwd&nevents=1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
