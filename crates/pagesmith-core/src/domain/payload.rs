//! Result payload sent to the evaluator and returned to the caller.

use serde::{Deserialize, Serialize};

use super::repo::{CommitSha, PublishResult};
use super::request::ValidatedRequest;

/// Identical for every round, so the evaluator contract never depends on
/// the round number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub email: Option<String>,
    pub task: String,
    pub round: u32,
    pub nonce: String,
    pub repo_url: String,
    pub commit_sha: CommitSha,
    pub pages_url: String,
}

impl NotificationPayload {
    /// Echo the request-identifying fields next to the publish result.
    pub fn assemble(request: &ValidatedRequest, result: PublishResult) -> Self {
        Self {
            email: request.email.clone(),
            task: request.task.clone(),
            round: request.round,
            nonce: request.nonce.clone(),
            repo_url: result.repo_url,
            commit_sha: result.commit_sha,
            pages_url: result.pages_url,
        }
    }
}
