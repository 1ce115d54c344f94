//! Delivery of build results to the caller-supplied evaluator.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::warn;

use crate::config::RetryPolicy;
use crate::domain::payload::NotificationPayload;
use crate::metrics::METRICS;
use crate::obs::emit_notify_attempt;

/// Posts a [`NotificationPayload`] to an evaluator URL.
#[async_trait]
pub trait EvaluatorNotifier: Send + Sync {
    /// `true` once the evaluator answered 200; `false` when every attempt
    /// failed.
    async fn notify(&self, url: &str, payload: &NotificationPayload) -> bool;
}

/// Result of one delivery, including how many attempts it took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifyReport {
    pub delivered: bool,
    pub attempts: u32,
}

/// JSON POST with exponential backoff.
///
/// Only an exact 200 counts as delivered; other statuses and transport
/// errors are retried until [`RetryPolicy::max_attempts`] is spent.
pub struct HttpNotifier {
    client: Client,
    policy: RetryPolicy,
}

impl HttpNotifier {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            client: Client::new(),
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn deliver(&self, url: &str, payload: &NotificationPayload) -> NotifyReport {
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            METRICS.inc_notify_attempts();
            let result = self
                .client
                .post(url)
                .timeout(self.policy.attempt_timeout)
                .json(payload)
                .send()
                .await;

            match result {
                Ok(response) if response.status() == StatusCode::OK => {
                    emit_notify_attempt(url, attempt, Some(200), true);
                    return NotifyReport {
                        delivered: true,
                        attempts: attempt,
                    };
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    emit_notify_attempt(url, attempt, Some(status), false);
                    let body = response.text().await.unwrap_or_default();
                    warn!(status, body = %body, "evaluator rejected notification");
                }
                Err(e) => {
                    emit_notify_attempt(url, attempt, None, false);
                    warn!(error = %e, "notify error");
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.policy.delay_after(attempt)).await;
            }
        }

        NotifyReport {
            delivered: false,
            attempts: max_attempts,
        }
    }
}

#[async_trait]
impl EvaluatorNotifier for HttpNotifier {
    async fn notify(&self, url: &str, payload: &NotificationPayload) -> bool {
        self.deliver(url, payload).await.delivered
    }
}
