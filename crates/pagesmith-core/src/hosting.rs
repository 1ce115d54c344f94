//! Repository-hosting REST client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::GitHubConfig;
use crate::domain::error::{BuildError, Result};
use crate::domain::repo::{CreatedRepository, DEFAULT_BRANCH};

const USER_AGENT: &str = concat!("pagesmith/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github+json";

/// Remote operations the build needs from the hosting provider.
#[async_trait]
pub trait RepositoryHost: Send + Sync {
    /// Create a public repository owned by the authenticated account.
    async fn create_repository(&self, name: &str, description: &str) -> Result<CreatedRepository>;

    /// Ask for static hosting of the primary branch at the root path.
    async fn enable_pages(&self, owner: &str, repo: &str) -> Result<()>;

    /// Whether credentials for the calls above are configured. Checked
    /// before a build causes any side effect.
    fn has_credentials(&self) -> bool;
}

/// Public URL a hosted site is served from.
pub fn pages_url(owner: &str, repo: &str) -> String {
    format!("https://{owner}.github.io/{repo}/")
}

#[derive(Debug, Deserialize)]
struct RepoOwner {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RepoResponse {
    name: String,
    html_url: String,
    clone_url: String,
    owner: RepoOwner,
}

/// GitHub REST v3 client.
pub struct GitHubClient {
    api_url: String,
    token: Option<String>,
    http: Client,
}

impl GitHubClient {
    pub fn from_config(config: &GitHubConfig) -> Result<Self> {
        Self::new(&config.api_url, config.token.as_deref())
    }

    pub fn new(api_url: &str, token: Option<&str>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| BuildError::Hosting(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()).map(str::to_string),
            http,
        })
    }

    fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| BuildError::MissingCredentials("GITHUB_TOKEN is not set".to_string()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }
}

#[async_trait]
impl RepositoryHost for GitHubClient {
    async fn create_repository(&self, name: &str, description: &str) -> Result<CreatedRepository> {
        let response = self
            .http
            .post(self.url("/user/repos"))
            .bearer_auth(self.token()?)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .json(&json!({
                "name": name,
                "private": false,
                "description": description,
            }))
            .send()
            .await
            .map_err(|e| BuildError::Hosting(format!("create repository request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BuildError::Hosting(format!(
                "create repository {name} returned {status}: {body}"
            )));
        }

        let repo: RepoResponse = response
            .json()
            .await
            .map_err(|e| BuildError::Hosting(format!("invalid create repository response: {e}")))?;
        debug!(owner = %repo.owner.login, name = %repo.name, "repository created");

        Ok(CreatedRepository {
            owner: repo.owner.login,
            name: repo.name,
            html_url: repo.html_url,
            clone_url: repo.clone_url,
        })
    }

    async fn enable_pages(&self, owner: &str, repo: &str) -> Result<()> {
        let response = self
            .http
            .post(self.url(&format!("/repos/{owner}/{repo}/pages")))
            .bearer_auth(self.token()?)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .json(&json!({ "source": { "branch": DEFAULT_BRANCH, "path": "/" } }))
            .send()
            .await
            .map_err(|e| BuildError::Hosting(format!("enable pages request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BuildError::Hosting(format!(
                "enable pages for {owner}/{repo} returned {status}: {body}"
            )));
        }
        Ok(())
    }

    fn has_credentials(&self) -> bool {
        self.token.is_some()
    }
}
