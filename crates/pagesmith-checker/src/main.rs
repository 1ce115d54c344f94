use std::net::SocketAddr;

use anyhow::Result;
use clap::Parser;
use pagesmith_checker::{create_router, CallbackChecker};
use tokio::net::TcpListener;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Stand-in evaluator that re-checks published sites
#[derive(Parser)]
#[command(name = "pagesmith-checker", version)]
struct Cli {
    /// Listen port
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    port: u16,

    /// Listen host
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: std::net::IpAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let addr = SocketAddr::new(cli.host, cli.port);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("pagesmith-checker listening on {}", addr);

    axum::serve(listener, create_router(CallbackChecker::new())).await?;
    Ok(())
}
