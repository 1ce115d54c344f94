//! In-memory fakes for every external seam (testing only)
//!
//! Provides `FakeGenerator`, `FakeHost`, `FakePublisher`, `ScriptedProbe`
//! and `ScriptedNotifier`, which satisfy the trait contracts without any
//! network, git binary or AI provider.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::error::{BuildError, Result};
use crate::domain::files::GeneratedFileSet;
use crate::domain::payload::NotificationPayload;
use crate::domain::repo::{
    CommitSha, CreatedRepository, PushedRepository, RepositoryHandle, DEFAULT_BRANCH,
};
use crate::generator::{fallback_files, ContentGenerator};
use crate::git::RepositoryPublisher;
use crate::hosting::RepositoryHost;
use crate::notifier::EvaluatorNotifier;
use crate::pages::AvailabilityProbe;

// ---------------------------------------------------------------------------
// FakeGenerator
// ---------------------------------------------------------------------------

/// Returns a fixed file set, or the fallback for the brief when none is set.
#[derive(Debug, Default)]
pub struct FakeGenerator {
    files: Option<GeneratedFileSet>,
    briefs: Mutex<Vec<String>>,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files(files: GeneratedFileSet) -> Self {
        Self {
            files: Some(files),
            briefs: Mutex::default(),
        }
    }

    pub fn briefs(&self) -> Vec<String> {
        self.briefs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentGenerator for FakeGenerator {
    async fn generate(&self, brief: &str) -> GeneratedFileSet {
        self.briefs.lock().unwrap().push(brief.to_string());
        self.files
            .clone()
            .unwrap_or_else(|| fallback_files(brief))
    }
}

// ---------------------------------------------------------------------------
// FakeHost
// ---------------------------------------------------------------------------

/// Records repository creation and hosting activation calls.
#[derive(Debug)]
pub struct FakeHost {
    owner: String,
    credentials: bool,
    clone_url: Option<String>,
    fail_pages: bool,
    created: Mutex<Vec<String>>,
    pages_calls: Mutex<Vec<(String, String)>>,
}

impl FakeHost {
    pub fn new(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            credentials: true,
            clone_url: None,
            fail_pages: false,
            created: Mutex::default(),
            pages_calls: Mutex::default(),
        }
    }

    pub fn without_credentials(mut self) -> Self {
        self.credentials = false;
        self
    }

    /// Report `url` as the clone URL of every created repository.
    pub fn with_clone_url(mut self, url: &str) -> Self {
        self.clone_url = Some(url.to_string());
        self
    }

    /// Make every enable-pages call fail.
    pub fn failing_pages(mut self) -> Self {
        self.fail_pages = true;
        self
    }

    pub fn created(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }

    pub fn pages_calls(&self) -> Vec<(String, String)> {
        self.pages_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RepositoryHost for FakeHost {
    async fn create_repository(&self, name: &str, _description: &str) -> Result<CreatedRepository> {
        self.created.lock().unwrap().push(name.to_string());
        let html_url = format!("https://github.com/{}/{}", self.owner, name);
        Ok(CreatedRepository {
            owner: self.owner.clone(),
            name: name.to_string(),
            clone_url: self
                .clone_url
                .clone()
                .unwrap_or_else(|| format!("{html_url}.git")),
            html_url,
        })
    }

    async fn enable_pages(&self, owner: &str, repo: &str) -> Result<()> {
        self.pages_calls
            .lock()
            .unwrap()
            .push((owner.to_string(), repo.to_string()));
        if self.fail_pages {
            Err(BuildError::Hosting("409 Conflict: pages already enabled".to_string()))
        } else {
            Ok(())
        }
    }

    fn has_credentials(&self) -> bool {
        self.credentials
    }
}

// ---------------------------------------------------------------------------
// FakePublisher
// ---------------------------------------------------------------------------

/// A publish operation seen by [`FakePublisher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishCall {
    Create { repo_name: String, files: Vec<String> },
    Update { repo_url: String, owner: String, files: Vec<String> },
}

/// Hands out sequential commit ids without touching git.
#[derive(Debug)]
pub struct FakePublisher {
    owner: String,
    fail_with: Mutex<Option<BuildError>>,
    commits: AtomicU32,
    calls: Mutex<Vec<PublishCall>>,
}

impl FakePublisher {
    pub fn new(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            fail_with: Mutex::new(None),
            commits: AtomicU32::new(0),
            calls: Mutex::default(),
        }
    }

    /// Fail the next publish with `error`.
    pub fn failing_with(self, error: BuildError) -> Self {
        *self.fail_with.lock().unwrap() = Some(error);
        self
    }

    pub fn calls(&self) -> Vec<PublishCall> {
        self.calls.lock().unwrap().clone()
    }

    fn next_sha(&self) -> Result<CommitSha> {
        let n = self.commits.fetch_add(1, Ordering::SeqCst) + 1;
        CommitSha::try_from(format!("{n:040x}"))
    }

    fn take_failure(&self) -> Result<()> {
        match self.fail_with.lock().unwrap().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn file_names(files: &GeneratedFileSet) -> Vec<String> {
    files.names().map(str::to_string).collect()
}

#[async_trait]
impl RepositoryPublisher for FakePublisher {
    async fn create_and_push(
        &self,
        local_dir: &Path,
        repo_name: &str,
        _description: &str,
        files: &GeneratedFileSet,
    ) -> Result<PushedRepository> {
        self.calls.lock().unwrap().push(PublishCall::Create {
            repo_name: repo_name.to_string(),
            files: file_names(files),
        });
        self.take_failure()?;
        Ok(PushedRepository {
            handle: RepositoryHandle {
                owner: self.owner.clone(),
                name: repo_name.to_string(),
                branch: DEFAULT_BRANCH.to_string(),
                repo_url: format!("https://github.com/{}/{}", self.owner, repo_name),
                local_path: local_dir.to_path_buf(),
            },
            commit_sha: self.next_sha()?,
        })
    }

    async fn update_and_push(
        &self,
        handle: &RepositoryHandle,
        files: &GeneratedFileSet,
    ) -> Result<PushedRepository> {
        self.calls.lock().unwrap().push(PublishCall::Update {
            repo_url: handle.repo_url.clone(),
            owner: handle.owner.clone(),
            files: file_names(files),
        });
        self.take_failure()?;
        Ok(PushedRepository {
            handle: handle.clone(),
            commit_sha: self.next_sha()?,
        })
    }
}

// ---------------------------------------------------------------------------
// ScriptedProbe
// ---------------------------------------------------------------------------

/// Answers probes from a script; once the script runs out every probe
/// reports a transport error.
#[derive(Debug, Default)]
pub struct ScriptedProbe {
    script: Mutex<VecDeque<Option<u16>>>,
    probes: AtomicU32,
}

impl ScriptedProbe {
    pub fn new(script: impl IntoIterator<Item = Option<u16>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            probes: AtomicU32::new(0),
        }
    }

    /// 404 for `n - 1` probes, then 200.
    pub fn live_on(n: u32) -> Self {
        let mut script: Vec<Option<u16>> = vec![Some(404); n.saturating_sub(1) as usize];
        script.push(Some(200));
        Self::new(script)
    }

    pub fn never_live() -> Self {
        Self::new(std::iter::empty())
    }

    pub fn probes(&self) -> u32 {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AvailabilityProbe for ScriptedProbe {
    async fn probe(&self, _url: &str) -> Option<u16> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.script.lock().unwrap().pop_front().flatten()
    }
}

// ---------------------------------------------------------------------------
// ScriptedNotifier
// ---------------------------------------------------------------------------

/// Records every payload and reports a fixed delivery outcome.
#[derive(Debug)]
pub struct ScriptedNotifier {
    deliver: bool,
    sent: Mutex<Vec<(String, NotificationPayload)>>,
}

impl ScriptedNotifier {
    pub fn delivering() -> Self {
        Self {
            deliver: true,
            sent: Mutex::default(),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            deliver: false,
            sent: Mutex::default(),
        }
    }

    pub fn sent(&self) -> Vec<(String, NotificationPayload)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EvaluatorNotifier for ScriptedNotifier {
    async fn notify(&self, url: &str, payload: &NotificationPayload) -> bool {
        self.sent
            .lock()
            .unwrap()
            .push((url.to_string(), payload.clone()));
        self.deliver
    }
}
