//! Acceptance checks against a published site.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Check name for the licence check.
pub const LICENSE_CHECK: &str = "MIT LICENSE";
/// Check name for the hosted-site check.
pub const PAGES_CHECK: &str = "Pages reachable (200)";

const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Pass,
    Fail,
}

impl From<bool> for CheckStatus {
    fn from(passed: bool) -> Self {
        if passed {
            CheckStatus::Pass
        } else {
            CheckStatus::Fail
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub check: String,
    pub status: CheckStatus,
}

/// The fields of a build result the checker looks at; everything else in
/// the callback body is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallbackRequest {
    #[serde(default)]
    pub repo_url: Option<String>,
    #[serde(default)]
    pub pages_url: Option<String>,
}

/// Raw-content URL of the `LICENSE` file on the primary branch.
pub fn raw_license_url(repo_url: &str) -> String {
    format!(
        "{}/main/LICENSE",
        repo_url
            .trim_end_matches('/')
            .replace("github.com", "raw.githubusercontent.com")
    )
}

/// Runs the checks for one callback.
#[derive(Debug, Clone)]
pub struct CallbackChecker {
    client: Client,
}

impl Default for CallbackChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl CallbackChecker {
    pub fn new() -> Self {
        Self::with_client(
            Client::builder()
                .timeout(FETCH_TIMEOUT)
                .build()
                .unwrap_or_default(),
        )
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// One result per field present, licence first.
    pub async fn run(&self, request: &CallbackRequest) -> Vec<CheckResult> {
        let mut results = Vec::new();
        if let Some(repo_url) = non_empty(request.repo_url.as_deref()) {
            results.push(CheckResult {
                check: LICENSE_CHECK.to_string(),
                status: self.check_license(repo_url).await.into(),
            });
        }
        if let Some(pages_url) = non_empty(request.pages_url.as_deref()) {
            results.push(CheckResult {
                check: PAGES_CHECK.to_string(),
                status: self.check_pages(pages_url).await.into(),
            });
        }
        results
    }

    async fn check_license(&self, repo_url: &str) -> bool {
        let url = raw_license_url(repo_url);
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "licence fetch failed");
                return false;
            }
        };
        if !response.status().is_success() {
            tracing::info!(url = %url, status = response.status().as_u16(), "licence not found");
            return false;
        }
        match response.text().await {
            Ok(text) => text.contains("MIT"),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "licence body unreadable");
                false
            }
        }
    }

    async fn check_pages(&self, pages_url: &str) -> bool {
        match self.client.get(pages_url).send().await {
            Ok(response) => response.status().as_u16() == 200,
            Err(e) => {
                tracing::warn!(url = %pages_url, error = %e, "pages fetch failed");
                false
            }
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
