use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use pagesmith_core::{CommitSha, HttpNotifier, NotificationPayload, RetryPolicy};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct Evaluator {
    hits: Arc<AtomicU32>,
    arrivals: Arc<Mutex<Vec<Instant>>>,
    bodies: Arc<Mutex<Vec<serde_json::Value>>>,
    succeed_on: Option<u32>,
}

impl Evaluator {
    fn new(succeed_on: Option<u32>) -> Self {
        Self {
            hits: Arc::default(),
            arrivals: Arc::default(),
            bodies: Arc::default(),
            succeed_on,
        }
    }
}

async fn receive(State(state): State<Evaluator>, Json(body): Json<serde_json::Value>) -> StatusCode {
    let hit = state.hits.fetch_add(1, Ordering::SeqCst) + 1;
    state.arrivals.lock().unwrap().push(Instant::now());
    state.bodies.lock().unwrap().push(body);
    match state.succeed_on {
        Some(n) if hit >= n => StatusCode::OK,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    }
}

async fn spawn_evaluator(state: Evaluator) -> SocketAddr {
    let app = Router::new()
        .route("/notify", post(receive))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 6,
        initial_delay: Duration::from_millis(10),
        attempt_timeout: Duration::from_secs(5),
    }
}

fn payload() -> NotificationPayload {
    NotificationPayload {
        email: Some("student@example.com".to_string()),
        task: "portfolio".to_string(),
        round: 1,
        nonce: "abc".to_string(),
        repo_url: "https://github.com/alice/portfolio".to_string(),
        commit_sha: CommitSha::try_from("f".repeat(40)).unwrap(),
        pages_url: "https://alice.github.io/portfolio/".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Retry behaviour
// ---------------------------------------------------------------------------

#[tokio::test]
async fn always_failing_endpoint_gets_exactly_six_attempts() {
    let evaluator = Evaluator::new(None);
    let addr = spawn_evaluator(evaluator.clone()).await;
    let notifier = HttpNotifier::new(fast_policy());

    let report = notifier
        .deliver(&format!("http://{addr}/notify"), &payload())
        .await;

    assert!(!report.delivered);
    assert_eq!(report.attempts, 6);
    assert_eq!(evaluator.hits.load(Ordering::SeqCst), 6);

    // Each gap is at least the backoff delay for that attempt, and the
    // backoff itself strictly increases.
    let arrivals = evaluator.arrivals.lock().unwrap().clone();
    let policy = fast_policy();
    for (i, pair) in arrivals.windows(2).enumerate() {
        let gap = pair[1] - pair[0];
        let expected = policy.delay_after(i as u32 + 1);
        assert!(gap >= expected, "gap {i} was {gap:?}, expected >= {expected:?}");
    }
    let delays: Vec<Duration> = policy.delays().collect();
    assert!(delays.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn success_on_third_attempt_stops_retrying() {
    let evaluator = Evaluator::new(Some(3));
    let addr = spawn_evaluator(evaluator.clone()).await;
    let notifier = HttpNotifier::new(fast_policy());

    let report = notifier
        .deliver(&format!("http://{addr}/notify"), &payload())
        .await;

    assert!(report.delivered);
    assert_eq!(report.attempts, 3);
    assert_eq!(evaluator.hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn payload_is_posted_as_json() {
    let evaluator = Evaluator::new(Some(1));
    let addr = spawn_evaluator(evaluator.clone()).await;
    let notifier = HttpNotifier::new(fast_policy());

    assert!(
        pagesmith_core::EvaluatorNotifier::notify(
            &notifier,
            &format!("http://{addr}/notify"),
            &payload()
        )
        .await
    );

    let bodies = evaluator.bodies.lock().unwrap().clone();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["nonce"], "abc");
    assert_eq!(bodies[0]["round"], 1);
    assert_eq!(bodies[0]["commit_sha"], "f".repeat(40));
}

#[tokio::test]
async fn unreachable_endpoint_exhausts_attempts() {
    // Bind then drop a listener so the port is closed.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let policy = RetryPolicy {
        max_attempts: 3,
        initial_delay: Duration::from_millis(1),
        attempt_timeout: Duration::from_secs(2),
    };
    let report = HttpNotifier::new(policy)
        .deliver(&format!("http://{addr}/notify"), &payload())
        .await;

    assert!(!report.delivered);
    assert_eq!(report.attempts, 3);
}
