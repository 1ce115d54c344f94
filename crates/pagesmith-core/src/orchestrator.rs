//! Build-and-publish workflow.
//!
//! One request walks the states
//!
//! ```text
//! Received -> Authenticated -> Created | Cloned -> Generated -> Published
//!          -> Activated -> Notified -> Done
//! ```
//!
//! and may drop into `Aborted` from any non-terminal state. Nothing is
//! rolled back on abort; a repository created before the failure stays on
//! the hosting account.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tempfile::TempDir;
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::domain::error::{BuildError, Result};
use crate::domain::payload::NotificationPayload;
use crate::domain::repo::{PublishResult, RepositoryHandle};
use crate::domain::request::{authenticate_secret, BuildRequest, BuildTarget, ValidatedRequest};
use crate::generator::{ContentGenerator, GeminiGenerator};
use crate::git::{GitPublisher, RepositoryPublisher};
use crate::hosting::{GitHubClient, RepositoryHost};
use crate::metrics::METRICS;
use crate::naming::derive_repo_name;
use crate::notifier::{EvaluatorNotifier, HttpNotifier};
use crate::obs::{
    build_span, emit_build_aborted, emit_build_finished, emit_build_started, emit_transition,
};
use crate::pages::{AvailabilityProbe, HostingActivator, HttpProbe};

const SCRATCH_PREFIX: &str = "student_build_";
const CLONE_DIR: &str = "repo_clone";

/// Workflow states of a single build request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildState {
    Received,
    Authenticated,
    /// Round 1: a fresh repository name was derived.
    Created,
    /// Round > 1: the existing repository was resolved from its URL.
    Cloned,
    Generated,
    Published,
    Activated,
    Notified,
    Done,
    Aborted,
}

impl BuildState {
    pub fn is_terminal(self) -> bool {
        matches!(self, BuildState::Done | BuildState::Aborted)
    }

    /// Transition guard for the workflow graph.
    pub fn can_transition_to(self, next: BuildState) -> bool {
        use BuildState::*;
        match (self, next) {
            (from, Aborted) => !from.is_terminal(),
            (Received, Authenticated)
            | (Authenticated, Created)
            | (Authenticated, Cloned)
            | (Created, Generated)
            | (Cloned, Generated)
            | (Generated, Published)
            | (Published, Activated)
            | (Activated, Notified)
            | (Notified, Done) => true,
            _ => false,
        }
    }
}

/// Current state plus every state visited so far.
#[derive(Debug, Clone)]
pub struct BuildMachine {
    state: BuildState,
    history: Vec<BuildState>,
}

impl Default for BuildMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildMachine {
    pub fn new() -> Self {
        Self {
            state: BuildState::Received,
            history: vec![BuildState::Received],
        }
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    pub fn history(&self) -> &[BuildState] {
        &self.history
    }

    pub fn advance(&mut self, next: BuildState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(BuildError::Internal(format!(
                "illegal transition {:?} -> {:?}",
                self.state, next
            )));
        }
        emit_transition(self.state, next);
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    /// Move to `Aborted` unless already terminal.
    pub fn abort(&mut self) {
        if !self.state.is_terminal() {
            emit_transition(self.state, BuildState::Aborted);
            self.state = BuildState::Aborted;
            self.history.push(BuildState::Aborted);
        }
    }
}

/// A finished request: its result and the states it went through.
#[derive(Debug)]
pub struct BuildRun {
    pub result: Result<NotificationPayload>,
    pub history: Vec<BuildState>,
}

/// External collaborators of the workflow.
pub struct Collaborators {
    pub generator: Arc<dyn ContentGenerator>,
    pub publisher: Arc<dyn RepositoryPublisher>,
    pub host: Arc<dyn RepositoryHost>,
    pub probe: Arc<dyn AvailabilityProbe>,
    pub notifier: Arc<dyn EvaluatorNotifier>,
}

impl Collaborators {
    /// Production wiring: Gemini, git CLI, GitHub REST, HTTP probe and
    /// notifier.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let host: Arc<dyn RepositoryHost> = Arc::new(GitHubClient::from_config(&config.github)?);
        Ok(Self {
            generator: Arc::new(GeminiGenerator::new(config.gemini.clone())),
            publisher: Arc::new(GitPublisher::new(
                host.clone(),
                config.identity.clone(),
                config.github.token.clone(),
            )),
            host,
            probe: Arc::new(HttpProbe::new(config.pages.probe_timeout)),
            notifier: Arc::new(HttpNotifier::new(config.notify)),
        })
    }
}

/// Drives one request at a time through the workflow; holds no
/// per-request state, so one instance serves concurrent requests.
pub struct BuildOrchestrator {
    secret: String,
    owner: Option<String>,
    scratch_root: Option<PathBuf>,
    notify_attempts: u32,
    generator: Arc<dyn ContentGenerator>,
    publisher: Arc<dyn RepositoryPublisher>,
    host: Arc<dyn RepositoryHost>,
    activator: HostingActivator,
    notifier: Arc<dyn EvaluatorNotifier>,
}

impl BuildOrchestrator {
    pub fn new(config: &ServiceConfig, collaborators: Collaborators) -> Self {
        let Collaborators {
            generator,
            publisher,
            host,
            probe,
            notifier,
        } = collaborators;
        Self {
            secret: config.api_secret.clone(),
            owner: config.github.user.clone(),
            scratch_root: config.scratch_root.clone(),
            notify_attempts: config.notify.max_attempts,
            generator,
            publisher,
            activator: HostingActivator::new(host.clone(), probe, config.pages),
            host,
            notifier,
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        Ok(Self::new(config, Collaborators::from_config(config)?))
    }

    /// Check a secret taken from a body that has not been decoded yet.
    pub fn authenticate(&self, secret: Option<&str>) -> Result<()> {
        authenticate_secret(secret, &self.secret)
    }

    pub async fn handle(&self, request: &BuildRequest) -> Result<NotificationPayload> {
        self.handle_with_history(request).await.result
    }

    pub async fn handle_with_history(&self, request: &BuildRequest) -> BuildRun {
        let request_id = Uuid::new_v4().to_string();
        let span = build_span(
            &request_id,
            request.task.as_deref().unwrap_or_default(),
            request.round.unwrap_or(1),
        );
        self.run(request, request_id).instrument(span).await
    }

    async fn run(&self, request: &BuildRequest, request_id: String) -> BuildRun {
        let started = Instant::now();
        METRICS.inc_builds_started();
        emit_build_started(&request_id);

        let mut machine = BuildMachine::new();
        let result = self.drive(&mut machine, request).await;

        match &result {
            Ok(payload) => {
                METRICS.inc_builds_succeeded();
                emit_build_finished(
                    &payload.repo_url,
                    payload.commit_sha.as_str(),
                    &payload.pages_url,
                    started.elapsed().as_millis() as u64,
                );
            }
            Err(e) => {
                METRICS.inc_builds_aborted();
                emit_build_aborted(machine.state(), e.kind(), e);
                machine.abort();
            }
        }
        METRICS.flush();

        BuildRun {
            result,
            history: machine.history().to_vec(),
        }
    }

    async fn drive(
        &self,
        machine: &mut BuildMachine,
        request: &BuildRequest,
    ) -> Result<NotificationPayload> {
        request.authenticate(&self.secret)?;
        machine.advance(BuildState::Authenticated)?;

        let validated = request.validate()?;
        if !self.host.has_credentials() {
            return Err(BuildError::MissingCredentials(
                "Missing GitHub credentials".to_string(),
            ));
        }

        let scratch = self.scratch_dir()?;
        info!(workdir = %scratch.path().display(), "scratch directory ready");

        let pushed = match &validated.target {
            BuildTarget::Create => {
                let repo_name = derive_repo_name(&validated.task);
                let local_dir = scratch.path().join(&repo_name);
                machine.advance(BuildState::Created)?;

                let files = self.generator.generate(&validated.brief).await;
                machine.advance(BuildState::Generated)?;

                let description = format!("Auto-created for task {}", validated.task);
                self.publisher
                    .create_and_push(&local_dir, &repo_name, &description, &files)
                    .await?
            }
            BuildTarget::Update { repo_url } => {
                let handle = RepositoryHandle::from_url(
                    repo_url,
                    self.owner.as_deref(),
                    scratch.path().join(CLONE_DIR),
                )?;
                machine.advance(BuildState::Cloned)?;

                let files = self.generator.generate(&validated.brief).await;
                machine.advance(BuildState::Generated)?;

                self.publisher.update_and_push(&handle, &files).await?
            }
        };
        machine.advance(BuildState::Published)?;

        let activation = self
            .activator
            .activate(&pushed.handle.owner, &pushed.handle.name)
            .await;
        machine.advance(BuildState::Activated)?;

        let payload = NotificationPayload::assemble(
            &validated,
            PublishResult {
                repo_url: pushed.handle.repo_url,
                commit_sha: pushed.commit_sha,
                pages_url: activation.pages_url,
            },
        );
        self.notify(&validated, &payload).await?;
        machine.advance(BuildState::Notified)?;
        machine.advance(BuildState::Done)?;

        Ok(payload)
    }

    async fn notify(&self, request: &ValidatedRequest, payload: &NotificationPayload) -> Result<()> {
        if self.notifier.notify(&request.evaluation_url, payload).await {
            Ok(())
        } else {
            Err(BuildError::NotifyExhausted {
                url: request.evaluation_url.clone(),
                attempts: self.notify_attempts,
            })
        }
    }

    fn scratch_dir(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let dir = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        Ok(dir)
    }
}
