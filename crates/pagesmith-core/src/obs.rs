//! Structured lifecycle events for build requests.
//!
//! Every request runs inside a [`build_span`]; the `emit_*` functions below
//! are the only places that name lifecycle events, so log pipelines can
//! key on the `event` field.

use tracing::{info, warn};

use crate::orchestrator::BuildState;

/// Request-scoped span; attach it with `Instrument::instrument` so every
/// event of the build carries the request id, task and round.
///
/// ```ignore
/// let span = build_span("0b5c...", "portfolio", 1);
/// orchestrator.drive(request).instrument(span).await;
/// ```
pub fn build_span(request_id: &str, task: &str, round: i64) -> tracing::Span {
    tracing::info_span!(
        "pagesmith.build",
        request_id = %request_id,
        task = %task,
        round = round
    )
}

pub fn emit_build_started(request_id: &str) {
    info!(event = "build.started", request_id = %request_id);
}

pub fn emit_transition(from: BuildState, to: BuildState) {
    info!(event = "build.transition", from = ?from, to = ?to);
}

pub fn emit_build_finished(repo_url: &str, commit_sha: &str, pages_url: &str, duration_ms: u64) {
    info!(
        event = "build.finished",
        repo_url = %repo_url,
        commit_sha = %commit_sha,
        pages_url = %pages_url,
        duration_ms = duration_ms,
    );
}

/// Emitted once per aborted request, before the error response is sent.
pub fn emit_build_aborted(state: BuildState, kind: &str, error: &dyn std::fmt::Display) {
    warn!(event = "build.aborted", state = ?state, kind = %kind, error = %error);
}

pub fn emit_notify_attempt(url: &str, attempt: u32, status: Option<u16>, delivered: bool) {
    info!(
        event = "notify.attempt",
        url = %url,
        attempt = attempt,
        status = ?status,
        delivered = delivered,
    );
}

pub fn emit_pages_probe(url: &str, probe: u32, status: Option<u16>) {
    info!(event = "pages.probe", url = %url, probe = probe, status = ?status);
}
