//! Domain-level error taxonomy for pagesmith.

/// Errors that abort a build request.
///
/// Content generation never produces one of these: generator failures are
/// recovered locally with fallback content.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("invalid secret")]
    Unauthorized,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("missing hosting credentials: {0}")]
    MissingCredentials(String),

    #[error("git {command} failed: {stderr}")]
    Tool { command: String, stderr: String },

    #[error("hosting api error: {0}")]
    Hosting(String),

    #[error("failed to clone repo: {0}")]
    Upstream(String),

    #[error("failed to notify evaluator at {url} after {attempts} attempts")]
    NotifyExhausted { url: String, attempts: u32 },

    #[error("invalid commit sha: {0}")]
    InvalidCommitSha(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// Taxonomy name, stable across message wording changes.
    pub fn kind(&self) -> &'static str {
        match self {
            BuildError::Unauthorized => "AUTHORIZATION_ERROR",
            BuildError::Validation(_) => "VALIDATION_ERROR",
            BuildError::MissingCredentials(_) => "CREDENTIAL_ERROR",
            BuildError::Tool { .. } | BuildError::Hosting(_) | BuildError::InvalidCommitSha(_) => {
                "EXTERNAL_TOOL_FAILURE"
            }
            BuildError::Upstream(_) => "UPSTREAM_UNAVAILABLE",
            BuildError::NotifyExhausted { .. } => "NOTIFY_EXHAUSTED",
            BuildError::Internal(_) | BuildError::Serialization(_) | BuildError::Io(_) => {
                "INTERNAL_ERROR"
            }
        }
    }

    /// HTTP status code the error is surfaced as.
    pub fn status(&self) -> u16 {
        match self {
            BuildError::Unauthorized => 403,
            BuildError::Validation(_) => 400,
            _ => 500,
        }
    }

    /// Whether the request was rejected before any side effect happened.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            BuildError::Unauthorized
                | BuildError::Validation(_)
                | BuildError::MissingCredentials(_)
        )
    }
}

/// Result type for pagesmith build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(BuildError::Unauthorized.status(), 403);
        assert_eq!(BuildError::Validation("x".into()).status(), 400);
        assert_eq!(BuildError::MissingCredentials("x".into()).status(), 500);
        assert_eq!(BuildError::Upstream("x".into()).status(), 500);
        assert_eq!(
            BuildError::NotifyExhausted {
                url: "http://e".into(),
                attempts: 6
            }
            .status(),
            500
        );
    }

    #[test]
    fn tool_error_display_includes_command_and_stderr() {
        let err = BuildError::Tool {
            command: "push".to_string(),
            stderr: "remote rejected".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("push"));
        assert!(msg.contains("remote rejected"));
        assert_eq!(err.kind(), "EXTERNAL_TOOL_FAILURE");
    }

    #[test]
    fn rejections_are_side_effect_free_variants() {
        assert!(BuildError::Unauthorized.is_rejection());
        assert!(BuildError::MissingCredentials("token".into()).is_rejection());
        assert!(!BuildError::Hosting("boom".into()).is_rejection());
    }
}
