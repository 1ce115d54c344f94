//! Pagesmith daemon
//!
//! HTTP front end for the build-and-publish workflow:
//! - `GET /` discovery message
//! - `GET /health` liveness with version and uptime
//! - `POST /api-endpoint` runs one build request end to end

pub mod api;
pub mod config;
pub mod error;
pub mod server;

pub use api::{create_router, AppState};
pub use config::{Cli, DaemonConfig};
pub use error::{ApiError, DaemonError, DaemonResult};
pub use server::Server;
