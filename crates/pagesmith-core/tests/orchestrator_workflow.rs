use std::sync::Arc;

use pagesmith_core::fakes::{
    FakeGenerator, FakeHost, FakePublisher, PublishCall, ScriptedNotifier, ScriptedProbe,
};
use pagesmith_core::{
    BuildError, BuildOrchestrator, BuildRequest, BuildState, Collaborators, GitHubConfig,
    NotificationPayload, ServiceConfig,
};
use tempfile::TempDir;

const SECRET: &str = "s3cret";
const EVALUATOR: &str = "https://evaluator.example.com/notify";

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    generator: Arc<FakeGenerator>,
    host: Arc<FakeHost>,
    publisher: Arc<FakePublisher>,
    probe: Arc<ScriptedProbe>,
    notifier: Arc<ScriptedNotifier>,
    scratch: TempDir,
    orchestrator: BuildOrchestrator,
}

impl Harness {
    fn new() -> Self {
        Self::with(
            FakeHost::new("alice"),
            FakePublisher::new("alice"),
            ScriptedNotifier::delivering(),
        )
    }

    fn with(host: FakeHost, publisher: FakePublisher, notifier: ScriptedNotifier) -> Self {
        Self::build(host, publisher, notifier, ScriptedProbe::live_on(1))
    }

    fn with_probe(probe: ScriptedProbe) -> Self {
        Self::build(
            FakeHost::new("alice"),
            FakePublisher::new("alice"),
            ScriptedNotifier::delivering(),
            probe,
        )
    }

    fn build(
        host: FakeHost,
        publisher: FakePublisher,
        notifier: ScriptedNotifier,
        probe: ScriptedProbe,
    ) -> Self {
        let scratch = TempDir::new().unwrap();
        let mut config = ServiceConfig::new(SECRET);
        config.github = GitHubConfig::default().with_token("ghp_test").with_user("alice");
        config.scratch_root = Some(scratch.path().to_path_buf());

        let generator = Arc::new(FakeGenerator::new());
        let host = Arc::new(host);
        let publisher = Arc::new(publisher);
        let probe = Arc::new(probe);
        let notifier = Arc::new(notifier);

        let orchestrator = BuildOrchestrator::new(
            &config,
            Collaborators {
                generator: generator.clone(),
                publisher: publisher.clone(),
                host: host.clone(),
                probe: probe.clone(),
                notifier: notifier.clone(),
            },
        );

        Self {
            generator,
            host,
            publisher,
            probe,
            notifier,
            scratch,
            orchestrator,
        }
    }

    fn scratch_is_empty(&self) -> bool {
        std::fs::read_dir(self.scratch.path()).unwrap().next().is_none()
    }
}

fn round_one() -> BuildRequest {
    BuildRequest {
        secret: Some(SECRET.to_string()),
        email: Some("student@example.com".to_string()),
        task: Some("portfolio".to_string()),
        round: Some(1),
        nonce: Some("n-1".to_string()),
        brief: Some("A personal portfolio".to_string()),
        evaluation_url: Some(EVALUATOR.to_string()),
        repo_url: None,
    }
}

fn round_two(repo_url: &str) -> BuildRequest {
    BuildRequest {
        round: Some(2),
        nonce: Some("n-2".to_string()),
        brief: Some("Add a contact section".to_string()),
        repo_url: Some(repo_url.to_string()),
        ..round_one()
    }
}

// ---------------------------------------------------------------------------
// Happy paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn round_one_creates_publishes_and_notifies() {
    let h = Harness::new();

    let run = h.orchestrator.handle_with_history(&round_one()).await;
    let payload = run.result.unwrap();

    use BuildState::*;
    assert_eq!(
        run.history,
        vec![Received, Authenticated, Created, Generated, Published, Activated, Notified, Done]
    );

    let calls = h.publisher.calls();
    assert_eq!(calls.len(), 1);
    let PublishCall::Create { repo_name, files } = &calls[0] else {
        panic!("expected a create call, got {calls:?}");
    };
    assert!(repo_name.starts_with("portfolio-"));
    assert!(repo_name.len() <= 50);
    assert_eq!(files, &["LICENSE", "README.md", "index.html"]);

    assert_eq!(payload.task, "portfolio");
    assert_eq!(payload.round, 1);
    assert_eq!(payload.nonce, "n-1");
    assert_eq!(payload.repo_url, format!("https://github.com/alice/{repo_name}"));
    assert_eq!(payload.pages_url, format!("https://alice.github.io/{repo_name}/"));
    assert_eq!(payload.commit_sha.as_str().len(), 40);

    assert_eq!(h.generator.briefs(), vec!["A personal portfolio".to_string()]);
    assert_eq!(h.host.pages_calls(), vec![("alice".to_string(), repo_name.clone())]);
    assert_eq!(h.probe.probes(), 1);

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, EVALUATOR);
    assert_eq!(sent[0].1, payload);

    assert!(h.scratch_is_empty());
}

#[tokio::test]
async fn round_two_updates_existing_repository() {
    let h = Harness::new();
    let repo_url = "https://github.com/alice/portfolio-20260101-0000-ab12";

    let run = h.orchestrator.handle_with_history(&round_two(repo_url)).await;
    let payload = run.result.unwrap();

    use BuildState::*;
    assert_eq!(
        run.history,
        vec![Received, Authenticated, Cloned, Generated, Published, Activated, Notified, Done]
    );

    assert_eq!(
        h.publisher.calls(),
        vec![PublishCall::Update {
            repo_url: repo_url.to_string(),
            owner: "alice".to_string(),
            files: vec!["LICENSE".into(), "README.md".into(), "index.html".into()],
        }]
    );
    assert!(h.host.created().is_empty());
    assert_eq!(payload.round, 2);
    assert_eq!(payload.repo_url, repo_url);
    assert_eq!(
        payload.pages_url,
        "https://alice.github.io/portfolio-20260101-0000-ab12/"
    );
}

#[tokio::test(start_paused = true)]
async fn payload_fields_do_not_depend_on_round() {
    // Each round finds the site live on its first probe.
    let h = Harness::with_probe(ScriptedProbe::new([Some(200), Some(200)]));

    let first = h.orchestrator.handle(&round_one()).await.unwrap();
    let second = h
        .orchestrator
        .handle(&round_two(&first.repo_url))
        .await
        .unwrap();

    let keys = |p: &NotificationPayload| {
        let value = serde_json::to_value(p).unwrap();
        let mut keys: Vec<String> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    };
    assert_eq!(keys(&first), keys(&second));
    assert_ne!(first.commit_sha, second.commit_sha);
    assert_eq!(first.repo_url, second.repo_url);
    assert_eq!(h.probe.probes(), 2);
}

// ---------------------------------------------------------------------------
// Rejections cause no side effects
// ---------------------------------------------------------------------------

#[tokio::test]
async fn wrong_secret_is_rejected_before_anything_happens() {
    let h = Harness::new();
    let request = BuildRequest {
        secret: Some("nope".to_string()),
        ..round_one()
    };

    let run = h.orchestrator.handle_with_history(&request).await;

    assert!(matches!(run.result, Err(BuildError::Unauthorized)));
    assert_eq!(run.history, vec![BuildState::Received, BuildState::Aborted]);
    assert!(h.publisher.calls().is_empty());
    assert!(h.generator.briefs().is_empty());
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn round_two_without_repo_url_is_a_validation_error() {
    let h = Harness::new();
    let request = BuildRequest {
        repo_url: None,
        ..round_two("unused")
    };

    let err = h.orchestrator.handle(&request).await.unwrap_err();

    assert!(matches!(err, BuildError::Validation(_)));
    assert_eq!(err.status(), 400);
    assert!(h.publisher.calls().is_empty());
    assert!(h.host.created().is_empty());
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn non_positive_round_is_rejected() {
    let h = Harness::new();
    for round in [0, -3] {
        let request = BuildRequest {
            round: Some(round),
            ..round_one()
        };
        let err = h.orchestrator.handle(&request).await.unwrap_err();
        assert_eq!(err.status(), 400, "round {round}");
    }
    assert!(h.publisher.calls().is_empty());
}

#[tokio::test]
async fn missing_credentials_fail_without_side_effects() {
    let h = Harness::with(
        FakeHost::new("alice").without_credentials(),
        FakePublisher::new("alice"),
        ScriptedNotifier::delivering(),
    );

    let err = h.orchestrator.handle(&round_one()).await.unwrap_err();

    assert!(matches!(err, BuildError::MissingCredentials(_)));
    assert_eq!(err.status(), 500);
    assert!(h.publisher.calls().is_empty());
    assert!(h.generator.briefs().is_empty());
}

// ---------------------------------------------------------------------------
// Failures after side effects
// ---------------------------------------------------------------------------

#[tokio::test]
async fn publish_failure_aborts_after_generation() {
    let h = Harness::with(
        FakeHost::new("alice"),
        FakePublisher::new("alice").failing_with(BuildError::Tool {
            command: "push -u origin main".to_string(),
            stderr: "rejected".to_string(),
        }),
        ScriptedNotifier::delivering(),
    );

    let run = h.orchestrator.handle_with_history(&round_one()).await;

    assert!(matches!(run.result, Err(BuildError::Tool { .. })));
    assert_eq!(run.history.last(), Some(&BuildState::Aborted));
    assert_eq!(run.history[run.history.len() - 2], BuildState::Generated);
    assert!(h.host.pages_calls().is_empty());
    assert!(h.notifier.sent().is_empty());
    assert!(h.scratch_is_empty());
}

#[tokio::test]
async fn clone_failure_is_upstream_unavailable() {
    let h = Harness::with(
        FakeHost::new("alice"),
        FakePublisher::new("alice")
            .failing_with(BuildError::Upstream("repository not found".to_string())),
        ScriptedNotifier::delivering(),
    );

    let err = h
        .orchestrator
        .handle(&round_two("https://github.com/alice/gone"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "UPSTREAM_UNAVAILABLE");
    assert_eq!(err.status(), 500);
}

#[tokio::test]
async fn exhausted_notification_aborts_after_activation() {
    let h = Harness::with(
        FakeHost::new("alice"),
        FakePublisher::new("alice"),
        ScriptedNotifier::unreachable(),
    );

    let run = h.orchestrator.handle_with_history(&round_one()).await;

    match &run.result {
        Err(BuildError::NotifyExhausted { url, attempts }) => {
            assert_eq!(url, EVALUATOR);
            assert_eq!(*attempts, 6);
        }
        other => panic!("expected NotifyExhausted, got {other:?}"),
    }
    use BuildState::*;
    assert_eq!(&run.history[run.history.len() - 2..], &[Activated, Aborted]);
    assert_eq!(h.publisher.calls().len(), 1);
    assert_eq!(h.notifier.sent().len(), 1);
}

#[tokio::test]
async fn failed_pages_enable_still_completes() {
    let h = Harness::with(
        FakeHost::new("alice").failing_pages(),
        FakePublisher::new("alice"),
        ScriptedNotifier::delivering(),
    );

    let payload = h.orchestrator.handle(&round_one()).await.unwrap();

    assert!(payload.pages_url.starts_with("https://alice.github.io/portfolio-"));
    assert_eq!(h.notifier.sent().len(), 1);
}
