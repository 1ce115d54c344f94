//! Pagesmith Core Library
//!
//! Turns a free-text brief into a small static site, publishes it to a
//! hosted git repository, enables static hosting and reports the result to
//! an evaluator.
//!
//! ## Layout
//!
//! - `domain`: request, file set, repository and payload types plus errors
//! - `generator`: AI-backed content generation with deterministic fallback
//! - `git`: working-copy operations and the repository publisher
//! - `hosting` / `pages`: hosting REST client, activation and polling
//! - `notifier`: evaluator delivery with exponential backoff
//! - `orchestrator`: the per-request workflow state machine
//! - `fakes`: in-memory implementations of every seam for tests

pub mod config;
pub mod domain;
pub mod fakes;
pub mod generator;
pub mod git;
pub mod hosting;
pub mod metrics;
pub mod naming;
pub mod notifier;
pub mod obs;
pub mod orchestrator;
pub mod pages;
pub mod telemetry;

pub use config::{
    CommitIdentity, GeminiConfig, GitHubConfig, PagesPollPolicy, RetryPolicy, ServiceConfig,
};
pub use domain::{
    BuildError, BuildRequest, BuildTarget, CommitSha, GeneratedFileSet, NotificationPayload,
    PublishResult, RepositoryHandle, Result, ValidatedRequest,
};
pub use generator::{fallback_files, ContentGenerator, GeminiGenerator};
pub use git::{capture_head_sha, GitPublisher, RepositoryPublisher};
pub use hosting::{pages_url, GitHubClient, RepositoryHost};
pub use metrics::METRICS;
pub use naming::derive_repo_name;
pub use notifier::{EvaluatorNotifier, HttpNotifier, NotifyReport};
pub use orchestrator::{BuildMachine, BuildOrchestrator, BuildRun, BuildState, Collaborators};
pub use pages::{AvailabilityProbe, HostingActivator, HttpProbe, PagesActivation};
pub use telemetry::{init_tracing, LogFormat};

/// Pagesmith version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
