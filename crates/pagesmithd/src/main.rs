//! pagesmithd - brief-to-static-site build and publish service

use anyhow::Result;
use clap::Parser;
use pagesmithd::{Cli, Server};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; real environment variables still apply.
    dotenvy::dotenv().ok();

    let config = Cli::parse().into_config()?;
    pagesmith_core::init_tracing(
        pagesmith_core::LogFormat::from_json_flag(config.json_logs),
        config.log_level,
    );

    tracing::info!(
        version = pagesmith_core::VERSION,
        listen = %config.listen_addr,
        "pagesmithd starting"
    );

    Server::new(config)?.run().await?;
    Ok(())
}
