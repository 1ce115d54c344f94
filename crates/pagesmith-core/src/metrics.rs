//! Process-wide build counters.
//!
//! The orchestrator flushes them after every request, so each request
//! ends with one `metric = "flush"` log line carrying running totals.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters, no allocations and no locking.
pub struct Metrics {
    builds_started: AtomicU64,
    builds_succeeded: AtomicU64,
    builds_aborted: AtomicU64,
    generator_fallbacks: AtomicU64,
    notify_attempts: AtomicU64,
    pages_probes: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            builds_started: AtomicU64::new(0),
            builds_succeeded: AtomicU64::new(0),
            builds_aborted: AtomicU64::new(0),
            generator_fallbacks: AtomicU64::new(0),
            notify_attempts: AtomicU64::new(0),
            pages_probes: AtomicU64::new(0),
        }
    }

    pub fn inc_builds_started(&self) {
        self.builds_started.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "builds_started", "counter incremented");
    }

    pub fn inc_builds_succeeded(&self) {
        self.builds_succeeded.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "builds_succeeded", "counter incremented");
    }

    pub fn inc_builds_aborted(&self) {
        self.builds_aborted.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "builds_aborted", "counter incremented");
    }

    pub fn inc_generator_fallbacks(&self) {
        self.generator_fallbacks.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "generator_fallbacks", "counter incremented");
    }

    pub fn inc_notify_attempts(&self) {
        self.notify_attempts.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "notify_attempts", "counter incremented");
    }

    pub fn inc_pages_probes(&self) {
        self.pages_probes.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "pages_probes", "counter incremented");
    }

    /// Log the running totals.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            builds_started = self.builds_started(),
            builds_succeeded = self.builds_succeeded(),
            builds_aborted = self.builds_aborted(),
            generator_fallbacks = self.generator_fallbacks(),
            notify_attempts = self.notify_attempts(),
            pages_probes = self.pages_probes(),
        );
    }

    pub fn builds_started(&self) -> u64 {
        self.builds_started.load(Ordering::Relaxed)
    }

    pub fn builds_succeeded(&self) -> u64 {
        self.builds_succeeded.load(Ordering::Relaxed)
    }

    pub fn builds_aborted(&self) -> u64 {
        self.builds_aborted.load(Ordering::Relaxed)
    }

    pub fn generator_fallbacks(&self) -> u64 {
        self.generator_fallbacks.load(Ordering::Relaxed)
    }

    pub fn notify_attempts(&self) -> u64 {
        self.notify_attempts.load(Ordering::Relaxed)
    }

    pub fn pages_probes(&self) -> u64 {
        self.pages_probes.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.builds_started.store(0, Ordering::Relaxed);
        self.builds_succeeded.store(0, Ordering::Relaxed);
        self.builds_aborted.store(0, Ordering::Relaxed);
        self.generator_fallbacks.store(0, Ordering::Relaxed);
        self.notify_attempts.store(0, Ordering::Relaxed);
        self.pages_probes.store(0, Ordering::Relaxed);
    }
}
