use std::net::SocketAddr;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::Router;
use pagesmith_checker::{create_router, CallbackChecker};
use serde_json::{json, Value};
use tower::ServiceExt;

/// Serves repository files under `/<owner>/<repo>/main/...` and a site at
/// `/site/`.
async fn spawn_origin() -> SocketAddr {
    let app = Router::new()
        .route(
            "/alice/mit/main/LICENSE",
            get(|| async { "MIT License\n\nCopyright (c) 2026 alice" }),
        )
        .route(
            "/alice/apache/main/LICENSE",
            get(|| async { "Apache License\nVersion 2.0" }),
        )
        .route("/site/", get(|| async { "<h1>hello</h1>" }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn evaluate(body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/evaluate_callback")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = create_router(CallbackChecker::new())
        .oneshot(request)
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn license_without_mit_fails() {
    let addr = spawn_origin().await;

    let (status, body) = evaluate(json!({ "repo_url": format!("http://{addr}/alice/apache") })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["results"],
        json!([{ "check": "MIT LICENSE", "status": "FAIL" }])
    );
}

#[tokio::test]
async fn published_site_passes_both_checks_in_order() {
    let addr = spawn_origin().await;

    let (status, body) = evaluate(json!({
        "email": "student@example.com",
        "task": "portfolio",
        "round": 1,
        "nonce": "n-1",
        "commit_sha": "a".repeat(40),
        "repo_url": format!("http://{addr}/alice/mit"),
        "pages_url": format!("http://{addr}/site/"),
    }))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["results"],
        json!([
            { "check": "MIT LICENSE", "status": "PASS" },
            { "check": "Pages reachable (200)", "status": "PASS" }
        ])
    );
}

#[tokio::test]
async fn missing_files_and_pages_fail() {
    let addr = spawn_origin().await;

    let (_, body) = evaluate(json!({
        "repo_url": format!("http://{addr}/alice/missing"),
        "pages_url": format!("http://{addr}/nowhere/"),
    }))
    .await;

    assert_eq!(
        body["results"],
        json!([
            { "check": "MIT LICENSE", "status": "FAIL" },
            { "check": "Pages reachable (200)", "status": "FAIL" }
        ])
    );
}

#[tokio::test]
async fn only_present_fields_are_checked() {
    let addr = spawn_origin().await;

    let (_, body) = evaluate(json!({ "pages_url": format!("http://{addr}/site/") })).await;

    assert_eq!(
        body["results"],
        json!([{ "check": "Pages reachable (200)", "status": "PASS" }])
    );
}

#[tokio::test]
async fn unreachable_host_counts_as_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (status, body) = evaluate(json!({ "pages_url": format!("http://{addr}/") })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["status"], "FAIL");
}

#[tokio::test]
async fn non_json_body_is_rejected() {
    let request = Request::builder()
        .method("POST")
        .uri("/evaluate_callback")
        .body(Body::from("repo_url=x"))
        .unwrap();

    let response = create_router(CallbackChecker::new())
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
