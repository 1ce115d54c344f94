//! Pagesmith checker
//!
//! Stand-in evaluator: receives the build result callback, re-fetches the
//! published artifacts and reports pass/fail per acceptance check. Shares
//! no code with the build service.

pub mod checks;
pub mod server;

pub use checks::{raw_license_url, CallbackChecker, CallbackRequest, CheckResult, CheckStatus};
pub use server::create_router;
