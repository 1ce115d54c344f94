use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use pagesmith_core::{BuildError, GitHubClient, RepositoryHost};
use serde_json::{json, Value};

#[derive(Clone, Default)]
struct Recorder {
    requests: Arc<Mutex<Vec<(String, HeaderMap, Value)>>>,
}

async fn create_repo(
    State(rec): State<Recorder>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let name = body["name"].as_str().unwrap_or_default().to_string();
    rec.requests
        .lock()
        .unwrap()
        .push(("/user/repos".to_string(), headers, body));
    if name == "taken" {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "message": "name already exists on this account" })),
        );
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "name": name,
            "html_url": format!("https://github.com/alice/{name}"),
            "clone_url": format!("https://github.com/alice/{name}.git"),
            "owner": { "login": "alice" },
            "private": false
        })),
    )
}

async fn enable_pages(
    State(rec): State<Recorder>,
    Path((owner, repo)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    rec.requests
        .lock()
        .unwrap()
        .push((format!("/repos/{owner}/{repo}/pages"), headers, body));
    if repo == "already" {
        StatusCode::CONFLICT
    } else {
        StatusCode::CREATED
    }
}

async fn spawn_api(rec: Recorder) -> SocketAddr {
    let app = Router::new()
        .route("/user/repos", post(create_repo))
        .route("/repos/:owner/:repo/pages", post(enable_pages))
        .with_state(rec);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn creates_public_repository_with_token() {
    let rec = Recorder::default();
    let addr = spawn_api(rec.clone()).await;
    let client = GitHubClient::new(&format!("http://{addr}/"), Some("ghp_abc")).unwrap();

    let created = client
        .create_repository("site-1", "Auto-created for task site")
        .await
        .unwrap();

    assert_eq!(created.owner, "alice");
    assert_eq!(created.name, "site-1");
    assert_eq!(created.html_url, "https://github.com/alice/site-1");
    assert_eq!(created.clone_url, "https://github.com/alice/site-1.git");

    let requests = rec.requests.lock().unwrap();
    let (_, headers, body) = &requests[0];
    assert_eq!(headers["authorization"], "Bearer ghp_abc");
    assert_eq!(headers["accept"], "application/vnd.github+json");
    assert!(headers["user-agent"].to_str().unwrap().starts_with("pagesmith/"));
    assert_eq!(body["private"], false);
    assert_eq!(body["description"], "Auto-created for task site");
}

#[tokio::test]
async fn rejected_creation_is_a_hosting_error() {
    let addr = spawn_api(Recorder::default()).await;
    let client = GitHubClient::new(&format!("http://{addr}"), Some("ghp_abc")).unwrap();

    let err = client.create_repository("taken", "d").await.unwrap_err();

    assert!(matches!(err, BuildError::Hosting(_)));
    assert!(err.to_string().contains("422"));
}

#[tokio::test]
async fn enables_pages_on_main_branch_root() {
    let rec = Recorder::default();
    let addr = spawn_api(rec.clone()).await;
    let client = GitHubClient::new(&format!("http://{addr}"), Some("ghp_abc")).unwrap();

    client.enable_pages("alice", "site-1").await.unwrap();
    let conflict = client.enable_pages("alice", "already").await;

    assert!(matches!(conflict, Err(BuildError::Hosting(_))));
    let requests = rec.requests.lock().unwrap();
    assert_eq!(requests[0].0, "/repos/alice/site-1/pages");
    assert_eq!(
        requests[0].2,
        json!({ "source": { "branch": "main", "path": "/" } })
    );
}

#[tokio::test]
async fn missing_token_fails_before_any_request() {
    let rec = Recorder::default();
    let addr = spawn_api(rec.clone()).await;
    let client = GitHubClient::new(&format!("http://{addr}"), None).unwrap();

    assert!(!client.has_credentials());
    let err = client.create_repository("site", "d").await.unwrap_err();

    assert!(matches!(err, BuildError::MissingCredentials(_)));
    assert!(rec.requests.lock().unwrap().is_empty());
}
