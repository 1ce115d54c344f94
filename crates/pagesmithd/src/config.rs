//! Daemon configuration from flags and environment.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use pagesmith_core::config::{DEFAULT_GEMINI_ENDPOINT, DEFAULT_GEMINI_MODEL, DEFAULT_GITHUB_API_URL};
use pagesmith_core::{CommitIdentity, GeminiConfig, GitHubConfig, ServiceConfig};
use tracing::Level;

use crate::error::{DaemonError, DaemonResult};

/// Pagesmith daemon CLI
#[derive(Parser)]
#[command(name = "pagesmithd")]
#[command(about = "Pagesmith - brief-to-static-site build and publish service", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Shared secret every build request must present
    #[arg(long, env = "API_SECRET", hide_env_values = true)]
    pub api_secret: String,

    /// Hosting API token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Hosting account used for round > 1 updates
    #[arg(long, env = "GITHUB_USER")]
    pub github_user: Option<String>,

    /// Hosting REST base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_GITHUB_API_URL)]
    pub github_api_url: String,

    /// AI provider key; without it every build uses fallback content
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// AI model id
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_GEMINI_MODEL)]
    pub gemini_model: String,

    /// AI provider base URL
    #[arg(long, env = "GEMINI_ENDPOINT", default_value = DEFAULT_GEMINI_ENDPOINT)]
    pub gemini_endpoint: String,

    /// Commit author name
    #[arg(long, env = "GIT_AUTHOR_NAME")]
    pub git_author_name: Option<String>,

    /// Commit author email
    #[arg(long, env = "GIT_AUTHOR_EMAIL")]
    pub git_author_email: Option<String>,

    /// Listen host
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Listen port
    #[arg(short, long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Parent directory for per-request scratch directories
    #[arg(long, env = "SCRATCH_DIR")]
    pub scratch_dir: Option<PathBuf>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "LOG_JSON")]
    pub json: bool,
}

/// Resolved daemon configuration.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub listen_addr: SocketAddr,
    pub log_level: Level,
    pub json_logs: bool,
    pub service: ServiceConfig,
}

impl Cli {
    pub fn into_config(self) -> DaemonResult<DaemonConfig> {
        if self.api_secret.trim().is_empty() {
            return Err(DaemonError::Config("API_SECRET must not be empty".to_string()));
        }

        let ip = IpAddr::from_str(&self.host)
            .map_err(|e| DaemonError::Config(format!("Invalid listen host {}: {}", self.host, e)))?;
        let log_level = Level::from_str(&self.log_level)
            .map_err(|e| DaemonError::Config(format!("Invalid log level {}: {}", self.log_level, e)))?;

        let mut service = ServiceConfig::new(&self.api_secret);
        service.github = GitHubConfig {
            token: non_empty(self.github_token),
            user: non_empty(self.github_user),
            api_url: self.github_api_url,
        };
        service.gemini = GeminiConfig {
            api_key: non_empty(self.gemini_api_key),
            model: self.gemini_model,
            endpoint: self.gemini_endpoint,
        };
        let defaults = CommitIdentity::default();
        service.identity = CommitIdentity {
            name: non_empty(self.git_author_name).unwrap_or(defaults.name),
            email: non_empty(self.git_author_email).unwrap_or(defaults.email),
        };
        service.scratch_root = self.scratch_dir;

        Ok(DaemonConfig {
            listen_addr: SocketAddr::new(ip, self.port),
            log_level,
            json_logs: self.json,
            service,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
