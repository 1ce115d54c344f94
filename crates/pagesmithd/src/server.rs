//! Server setup and lifecycle management

use std::sync::Arc;

use pagesmith_core::BuildOrchestrator;
use tokio::net::TcpListener;

use crate::api::{create_router, AppState};
use crate::config::DaemonConfig;
use crate::error::{DaemonError, DaemonResult};

/// Pagesmith HTTP server
pub struct Server {
    config: DaemonConfig,
    orchestrator: Arc<BuildOrchestrator>,
}

impl Server {
    /// Wire the production collaborators from configuration.
    pub fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let orchestrator = Arc::new(BuildOrchestrator::from_config(&config.service)?);
        Ok(Self {
            config,
            orchestrator,
        })
    }

    /// Run the server until Ctrl+C or SIGTERM
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.listen_addr;
        let app = create_router(AppState::new(self.orchestrator));

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("pagesmithd listening on {}", addr);
        if self.config.service.github.token.is_none() {
            tracing::warn!("GITHUB_TOKEN is not set; build requests will fail");
        }
        if self.config.service.gemini.api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY is not set; builds will use fallback content");
        }

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("pagesmithd shutting down");
        Ok(())
    }
}

/// Resolves on Ctrl+C or SIGTERM. A handler that cannot be installed never
/// fires, leaving the other one in charge.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
