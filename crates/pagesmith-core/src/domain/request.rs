//! Inbound build request and its validated form.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{BuildError, Result};

/// Nonce echoed back when the caller does not supply one.
pub const DEFAULT_NONCE: &str = "xx";

/// Raw request body accepted by the build endpoint.
///
/// Every field is optional at the wire level so that missing values are
/// reported through [`BuildError`] instead of a deserializer rejection.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct BuildRequest {
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default)]
    pub round: Option<i64>,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub brief: Option<String>,
    #[serde(default)]
    pub evaluation_url: Option<String>,
    #[serde(default)]
    pub repo_url: Option<String>,
}

impl fmt::Debug for BuildRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildRequest")
            .field("secret", &self.secret.as_ref().map(|_| "***"))
            .field("email", &self.email)
            .field("task", &self.task)
            .field("round", &self.round)
            .field("nonce", &self.nonce)
            .field("brief", &self.brief)
            .field("evaluation_url", &self.evaluation_url)
            .field("repo_url", &self.repo_url)
            .finish()
    }
}

impl BuildRequest {
    /// Reject the request unless its secret equals `expected`.
    pub fn authenticate(&self, expected: &str) -> Result<()> {
        authenticate_secret(self.secret.as_deref(), expected)
    }

    /// Check required fields and resolve the round into a [`BuildTarget`].
    pub fn validate(&self) -> Result<ValidatedRequest> {
        let round = self.round.unwrap_or(1);
        if round < 1 {
            return Err(BuildError::Validation(format!(
                "round must be a positive integer, got {round}"
            )));
        }
        let round = u32::try_from(round)
            .map_err(|_| BuildError::Validation(format!("round {round} is out of range")))?;

        let task = non_empty(self.task.as_deref())
            .ok_or_else(|| BuildError::Validation("task not provided".to_string()))?;
        let evaluation_url = non_empty(self.evaluation_url.as_deref())
            .ok_or_else(|| BuildError::Validation("evaluation_url not provided".to_string()))?;

        let target = if round == 1 {
            BuildTarget::Create
        } else {
            let repo_url = non_empty(self.repo_url.as_deref()).ok_or_else(|| {
                BuildError::Validation("repo_url not provided for round > 1".to_string())
            })?;
            BuildTarget::Update { repo_url }
        };

        Ok(ValidatedRequest {
            email: self.email.clone(),
            task,
            round,
            nonce: self
                .nonce
                .clone()
                .unwrap_or_else(|| DEFAULT_NONCE.to_string()),
            brief: self.brief.clone().unwrap_or_default(),
            evaluation_url,
            target,
        })
    }
}

/// Check a caller-supplied secret before the rest of the body is trusted.
pub fn authenticate_secret(given: Option<&str>, expected: &str) -> Result<()> {
    match given {
        Some(given) if secrets_match(given, expected) => Ok(()),
        _ => Err(BuildError::Unauthorized),
    }
}

/// Whether a build creates a new repository or updates an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildTarget {
    /// Round 1: a fresh repository is created.
    Create,
    /// Round > 1: an existing repository is cloned and updated.
    Update { repo_url: String },
}

/// A request that passed validation; all required fields are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub email: Option<String>,
    pub task: String,
    pub round: u32,
    pub nonce: String,
    pub brief: String,
    pub evaluation_url: String,
    pub target: BuildTarget,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// Length and content are compared without an early exit on the first
// differing byte.
fn secrets_match(given: &str, expected: &str) -> bool {
    let given = given.as_bytes();
    let expected = expected.as_bytes();
    let mut diff = given.len() ^ expected.len();
    for (i, b) in expected.iter().enumerate() {
        diff |= usize::from(given.get(i).copied().unwrap_or(0) ^ b);
    }
    diff == 0
}
