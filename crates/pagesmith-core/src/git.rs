//! Git working-copy operations and the repository publisher.
//!
//! Everything shells out to the `git` binary through `tokio::process`.
//! Hosting credentials are embedded in push URLs, so every command line and
//! every captured stderr is redacted before it is logged or returned.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::CommitIdentity;
use crate::domain::error::{BuildError, Result};
use crate::domain::files::GeneratedFileSet;
use crate::domain::repo::{CommitSha, PushedRepository, RepositoryHandle, DEFAULT_BRANCH};
use crate::hosting::RepositoryHost;

/// Commit message for first-round builds.
pub const INITIAL_COMMIT_MESSAGE: &str = "Initial commit";
/// Commit message for later rounds.
pub const UPDATE_COMMIT_MESSAGE: &str = "Round 2 update";

const TOKEN_USER: &str = "x-access-token";
const REDACTED: &str = "***";

/// Replace every occurrence of `secret` in `text`.
pub fn redact(text: &str, secret: Option<&str>) -> String {
    match secret {
        Some(s) if !s.is_empty() => text.replace(s, REDACTED),
        _ => text.to_string(),
    }
}

/// Run `git <args>` in `dir`, returning trimmed stdout.
pub async fn run_git(dir: &Path, args: &[&str], secret: Option<&str>) -> Result<String> {
    let printable = redact(&args.join(" "), secret);
    debug!(cwd = %dir.display(), "RUN: git {printable}");

    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| BuildError::Tool {
            command: printable.clone(),
            stderr: format!("failed to run git: {e}"),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BuildError::Tool {
            command: printable,
            stderr: redact(stderr.trim(), secret),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Capture the HEAD commit SHA of the working copy at `repo_dir`.
pub async fn capture_head_sha(repo_dir: &Path) -> Result<CommitSha> {
    let sha = run_git(repo_dir, &["rev-parse", "HEAD"], None).await?;
    CommitSha::try_from(sha)
}

/// Embed `token` into an `https://` remote; other remote forms pass through.
pub fn authenticated_url(remote: &str, token: Option<&str>) -> String {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return remote.to_string();
    };
    match Url::parse(remote) {
        Ok(mut url) if url.scheme() == "https" => {
            if url.set_username(TOKEN_USER).is_err() || url.set_password(Some(token)).is_err() {
                return remote.to_string();
            }
            url.to_string()
        }
        _ => remote.to_string(),
    }
}

/// Push URL for an existing repository: `https://<host>/<owner>/<name>.git`
/// with credentials, or the original URL for non-https remotes.
pub fn update_remote(handle: &RepositoryHandle, token: Option<&str>) -> String {
    match Url::parse(&handle.repo_url) {
        Ok(url) if url.scheme() == "https" => {
            let host = url.host_str().unwrap_or("github.com");
            let canonical = format!("https://{host}/{}/{}.git", handle.owner, handle.name);
            authenticated_url(&canonical, token)
        }
        _ => handle.repo_url.clone(),
    }
}

/// Version-control side of a build: put files into a remote repository.
#[async_trait]
pub trait RepositoryPublisher: Send + Sync {
    /// Initialise `local_dir`, commit `files`, create the remote repository
    /// and push the primary branch.
    async fn create_and_push(
        &self,
        local_dir: &Path,
        repo_name: &str,
        description: &str,
        files: &GeneratedFileSet,
    ) -> Result<PushedRepository>;

    /// Clone `handle.repo_url` into `handle.local_path`, overwrite `files`,
    /// commit and push the primary branch.
    async fn update_and_push(
        &self,
        handle: &RepositoryHandle,
        files: &GeneratedFileSet,
    ) -> Result<PushedRepository>;
}

/// Publisher driving the `git` CLI, creating repositories through a
/// [`RepositoryHost`].
pub struct GitPublisher {
    host: Arc<dyn RepositoryHost>,
    identity: CommitIdentity,
    token: Option<String>,
}

impl GitPublisher {
    pub fn new(host: Arc<dyn RepositoryHost>, identity: CommitIdentity, token: Option<String>) -> Self {
        Self {
            host,
            identity,
            token,
        }
    }

    fn secret(&self) -> Option<&str> {
        self.token.as_deref()
    }

    async fn git(&self, dir: &Path, args: &[&str]) -> Result<String> {
        run_git(dir, args, self.secret()).await
    }

    /// Safe to repeat on a working copy that is already configured.
    async fn configure_identity(&self, dir: &Path) -> Result<()> {
        self.git(dir, &["config", "user.email", &self.identity.email])
            .await?;
        self.git(dir, &["config", "user.name", &self.identity.name])
            .await?;
        Ok(())
    }

    async fn push_primary_branch(&self, dir: &Path) -> Result<CommitSha> {
        self.git(dir, &["branch", "-M", DEFAULT_BRANCH]).await?;
        self.git(dir, &["push", "-u", "origin", DEFAULT_BRANCH])
            .await?;
        capture_head_sha(dir).await
    }
}

#[async_trait]
impl RepositoryPublisher for GitPublisher {
    async fn create_and_push(
        &self,
        local_dir: &Path,
        repo_name: &str,
        description: &str,
        files: &GeneratedFileSet,
    ) -> Result<PushedRepository> {
        tokio::fs::create_dir_all(local_dir).await?;
        files.write_to(local_dir).await?;

        self.git(local_dir, &["init"]).await?;
        self.configure_identity(local_dir).await?;
        self.git(local_dir, &["add", "."]).await?;
        self.git(local_dir, &["commit", "-m", INITIAL_COMMIT_MESSAGE])
            .await?;

        info!(repo = %repo_name, "creating remote repository");
        let created = self.host.create_repository(repo_name, description).await?;

        let origin = authenticated_url(&created.clone_url, self.secret());
        self.git(local_dir, &["remote", "add", "origin", &origin])
            .await?;
        let commit_sha = self.push_primary_branch(local_dir).await?;

        info!(repo = %created.html_url, commit = %commit_sha.short(), "pushed initial commit");
        Ok(PushedRepository {
            handle: RepositoryHandle {
                owner: created.owner,
                name: created.name,
                branch: DEFAULT_BRANCH.to_string(),
                repo_url: created.html_url,
                local_path: local_dir.to_path_buf(),
            },
            commit_sha,
        })
    }

    async fn update_and_push(
        &self,
        handle: &RepositoryHandle,
        files: &GeneratedFileSet,
    ) -> Result<PushedRepository> {
        let dir = handle.local_path.as_path();
        let parent = dir
            .parent()
            .ok_or_else(|| BuildError::Internal(format!("no parent for {}", dir.display())))?;
        tokio::fs::create_dir_all(parent).await?;

        let target = dir.to_string_lossy();
        run_git(parent, &["clone", &handle.repo_url, &target], self.secret())
            .await
            .map_err(|e| match e {
                BuildError::Tool { stderr, .. } => BuildError::Upstream(stderr),
                other => other,
            })?;

        files.write_to(dir).await?;
        self.configure_identity(dir).await?;
        self.git(dir, &["add", "."]).await?;
        self.git(
            dir,
            &["commit", "--allow-empty", "-m", UPDATE_COMMIT_MESSAGE],
        )
        .await?;

        let origin = update_remote(handle, self.secret());
        self.git(dir, &["remote", "set-url", "origin", &origin])
            .await?;
        let commit_sha = self.push_primary_branch(dir).await?;

        info!(repo = %handle.repo_url, commit = %commit_sha.short(), "pushed update");
        Ok(PushedRepository {
            handle: handle.clone(),
            commit_sha,
        })
    }
}
