//! Repository identity, commit ids and publish results.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::error::{BuildError, Result};

/// Branch every site is published from.
pub const DEFAULT_BRANCH: &str = "main";

/// Full 40-character hex id of a git commit.
///
/// The inner field is private so a value is always validated, either by
/// `TryFrom<String>` or by parsing `git rev-parse` output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommitSha(String);

impl CommitSha {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 7 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..7]
    }
}

impl TryFrom<String> for CommitSha {
    type Error = BuildError;

    fn try_from(s: String) -> Result<Self> {
        let s = s.trim().to_string();
        if s.len() != 40 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(BuildError::InvalidCommitSha(s));
        }
        Ok(CommitSha(s.to_ascii_lowercase()))
    }
}

impl From<CommitSha> for String {
    fn from(sha: CommitSha) -> Self {
        sha.0
    }
}

impl fmt::Display for CommitSha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A remote repository plus the local working copy used for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryHandle {
    pub owner: String,
    pub name: String,
    pub branch: String,
    /// Browser URL reported back to the caller.
    pub repo_url: String,
    /// Scratch working copy; removed when the request finishes.
    pub local_path: PathBuf,
}

impl RepositoryHandle {
    /// Resolve an existing repository from its URL.
    ///
    /// The repository name is the last path segment (without `.git`);
    /// `owner` overrides the owner segment found in the URL.
    pub fn from_url(repo_url: &str, owner: Option<&str>, local_path: PathBuf) -> Result<Self> {
        let (url_owner, name) = split_owner_and_name(repo_url).ok_or_else(|| {
            BuildError::Validation(format!("cannot derive repository name from {repo_url}"))
        })?;
        let owner = owner
            .map(str::to_string)
            .or(url_owner)
            .ok_or_else(|| {
                BuildError::MissingCredentials(format!(
                    "no hosting account configured and none found in {repo_url}"
                ))
            })?;

        Ok(Self {
            owner,
            name,
            branch: DEFAULT_BRANCH.to_string(),
            repo_url: repo_url.to_string(),
            local_path,
        })
    }
}

/// Split `.../<owner>/<name>[.git][/]` into its last two segments.
pub fn split_owner_and_name(repo_url: &str) -> Option<(Option<String>, String)> {
    let trimmed = repo_url.trim().trim_end_matches('/');
    let mut segments = trimmed.rsplit(['/', ':']);
    let name = segments.next()?;
    let name = name.strip_suffix(".git").unwrap_or(name);
    if name.is_empty() {
        return None;
    }
    let owner = segments
        .next()
        .filter(|o| !o.is_empty() && !o.contains('.') && !o.contains('@'))
        .map(str::to_string);
    Some((owner, name.to_string()))
}

/// Repository just created through the hosting API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedRepository {
    pub owner: String,
    pub name: String,
    pub html_url: String,
    pub clone_url: String,
}

/// Outcome of a successful push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushedRepository {
    pub handle: RepositoryHandle,
    pub commit_sha: CommitSha,
}

/// Everything the evaluator needs to locate the published site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResult {
    pub repo_url: String,
    pub commit_sha: CommitSha,
    pub pages_url: String,
}
