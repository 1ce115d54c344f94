//! Static-hosting activation and availability polling.
//!
//! Activation never fails the build: the enable call may be rejected
//! because hosting is already on, and deployment is asynchronous on the
//! provider side. After the poll budget runs out the computed URL is
//! returned anyway.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, warn};

use crate::config::PagesPollPolicy;
use crate::hosting::{pages_url, RepositoryHost};
use crate::metrics::METRICS;
use crate::obs::emit_pages_probe;

/// Fetches a URL and reports the HTTP status, `None` on transport errors.
#[async_trait]
pub trait AvailabilityProbe: Send + Sync {
    async fn probe(&self, url: &str) -> Option<u16>;
}

/// Plain GET probe with a per-request timeout.
pub struct HttpProbe {
    client: Client,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl AvailabilityProbe for HttpProbe {
    async fn probe(&self, url: &str) -> Option<u16> {
        match self.client.get(url).timeout(self.timeout).send().await {
            Ok(response) => Some(response.status().as_u16()),
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "probe failed");
                None
            }
        }
    }
}

/// What activation observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagesActivation {
    pub pages_url: String,
    /// A probe returned 200 within the budget.
    pub live: bool,
    pub probes: u32,
}

/// Enables hosting for a repository and waits for the site to respond.
pub struct HostingActivator {
    host: Arc<dyn RepositoryHost>,
    probe: Arc<dyn AvailabilityProbe>,
    policy: PagesPollPolicy,
}

impl HostingActivator {
    pub fn new(
        host: Arc<dyn RepositoryHost>,
        probe: Arc<dyn AvailabilityProbe>,
        policy: PagesPollPolicy,
    ) -> Self {
        Self {
            host,
            probe,
            policy,
        }
    }

    pub async fn activate(&self, owner: &str, repo: &str) -> PagesActivation {
        info!(owner = %owner, repo = %repo, "enabling static hosting");
        if let Err(e) = self.host.enable_pages(owner, repo).await {
            warn!(error = %e, "enable pages call failed, continuing");
        }

        let url = pages_url(owner, repo);
        let budget = self.policy.max_probes;
        for probe in 1..=budget {
            METRICS.inc_pages_probes();
            let status = self.probe.probe(&url).await;
            emit_pages_probe(&url, probe, status);

            if status == Some(200) {
                info!(url = %url, "pages site is live");
                return PagesActivation {
                    pages_url: url,
                    live: true,
                    probes: probe,
                };
            }
            info!("waiting for pages deployment ({probe}/{budget})");
            if probe < budget {
                tokio::time::sleep(self.policy.interval).await;
            }
        }

        warn!(url = %url, "pages may still be deploying");
        PagesActivation {
            pages_url: url,
            live: false,
            probes: budget,
        }
    }
}
