//! Immutable service configuration.
//!
//! Built once at startup (the daemon fills it from flags and environment)
//! and handed to each component; nothing below this module reads the
//! environment on its own.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default hosting REST base.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
/// Default AI provider base.
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
/// Default AI model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Top-level configuration for the build service.
#[derive(Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Shared secret every build request must present.
    pub api_secret: String,
    pub github: GitHubConfig,
    pub gemini: GeminiConfig,
    pub identity: CommitIdentity,
    pub notify: RetryPolicy,
    pub pages: PagesPollPolicy,
    /// Parent directory for per-request scratch directories.
    pub scratch_root: Option<PathBuf>,
}

impl ServiceConfig {
    pub fn new(api_secret: &str) -> Self {
        Self {
            api_secret: api_secret.to_string(),
            github: GitHubConfig::default(),
            gemini: GeminiConfig::default(),
            identity: CommitIdentity::default(),
            notify: RetryPolicy::default(),
            pages: PagesPollPolicy::default(),
            scratch_root: None,
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("api_secret", &"***")
            .field("github", &self.github)
            .field("gemini", &self.gemini)
            .field("identity", &self.identity)
            .field("notify", &self.notify)
            .field("pages", &self.pages)
            .field("scratch_root", &self.scratch_root)
            .finish()
    }
}

/// Hosting account and REST endpoint.
#[derive(Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// API token; builds fail with a credential error without one.
    pub token: Option<String>,
    /// Account that owns repositories updated in rounds after the first.
    pub user: Option<String>,
    pub api_url: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            user: None,
            api_url: DEFAULT_GITHUB_API_URL.to_string(),
        }
    }
}

impl GitHubConfig {
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn with_user(mut self, user: &str) -> Self {
        self.user = Some(user.to_string());
        self
    }
}

impl fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("user", &self.user)
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Generative model settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Without a key the generator always uses fallback content.
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
        }
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Fixed author identity applied to every working copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitIdentity {
    pub name: String,
    pub email: String,
}

impl Default for CommitIdentity {
    fn default() -> Self {
        Self {
            name: "pagesmith-bot".to_string(),
            email: "pagesmith-bot@users.noreply.github.com".to_string(),
        }
    }
}

/// Bounded exponential backoff for evaluator notification.
///
/// A delay follows every failed attempt except the last one: with the
/// defaults the waits are 1, 2, 4, 8 and 16 seconds, and the 32 second
/// delay after the sixth failure is never slept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles after each failure.
    pub initial_delay: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            initial_delay: Duration::from_secs(1),
            attempt_timeout: Duration::from_secs(20),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial_delay.saturating_mul(1u32 << exponent)
    }

    /// The delays actually slept between attempts, in order.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (1..self.max_attempts).map(|attempt| self.delay_after(attempt))
    }
}

/// Polling budget while waiting for a hosted site to come up.
///
/// `interval` separates consecutive probes; there is no wait after the last
/// one, so an unreachable site gives up after 55 seconds of sleeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagesPollPolicy {
    pub max_probes: u32,
    pub interval: Duration,
    pub probe_timeout: Duration,
}

impl Default for PagesPollPolicy {
    fn default() -> Self {
        Self {
            max_probes: 12,
            interval: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(10),
        }
    }
}
