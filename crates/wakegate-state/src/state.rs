//! The shared state block.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::types::{StateConfig, StateSnapshot};

struct Inner {
    /// Most recent client request; only moves forward.
    last_request: Instant,
    /// Last positive health probe. Cleared by every committed scale.
    last_probe: Option<Instant>,
    /// Replica count of the last committed scale, `None` until one succeeds.
    last_replicas: Option<u32>,
    /// When `last_replicas` was committed.
    last_scale: Option<Instant>,
}

/// Process-wide state shared by the dispatcher, prober, and scaler.
///
/// Cheap to clone; all clones point at the same block.
#[derive(Clone)]
pub struct ProxyState {
    /// Cache window and cooldown, fixed at startup.
    config: StateConfig,
    /// Shared by every clone.
    inner: Arc<Mutex<Inner>>,
}

impl ProxyState {
    /// Create a state block whose activity clock starts at `now`.
    pub fn new(config: StateConfig, now: Instant) -> Self {
        Self {
            config,
            inner: Arc::new(Mutex::new(Inner {
                last_request: now,
                last_probe: None,
                last_replicas: None,
                last_scale: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("proxy state lock")
    }

    // ── Activity ───────────────────────────────────────────────

    /// Record client traffic. Never moves the clock backwards.
    pub fn record_activity(&self, now: Instant) {
        let mut inner = self.lock();
        if now > inner.last_request {
            inner.last_request = now;
        }
    }

    /// Time since the last recorded request (zero if `now` is earlier).
    pub fn idle_for(&self, now: Instant) -> Duration {
        let inner = self.lock();
        now.saturating_duration_since(inner.last_request)
    }

    // ── Health cache ───────────────────────────────────────────

    /// Whether a positive probe inside the cache window can be reused.
    pub fn health_cached(&self, now: Instant) -> bool {
        let inner = self.lock();
        match inner.last_probe {
            Some(at) => now.saturating_duration_since(at) < self.config.cache_window,
            None => false,
        }
    }

    /// Remember a positive probe. Negative results are never cached.
    pub fn mark_healthy(&self, now: Instant) {
        self.lock().last_probe = Some(now);
    }

    // ── Scale bookkeeping ──────────────────────────────────────

    /// Whether a request for `replicas` should reach the orchestration API.
    ///
    /// Returns false only for a repeat of the last committed count inside
    /// the cooldown window. A different count always passes.
    pub fn should_scale(&self, replicas: u32, now: Instant) -> bool {
        let inner = self.lock();
        match (inner.last_replicas, inner.last_scale) {
            (Some(last), Some(at)) if last == replicas => {
                now.saturating_duration_since(at) >= self.config.cooldown
            }
            _ => true,
        }
    }

    /// Commit a successful scale request and drop the health cache so the
    /// next check probes the backend live.
    pub fn commit_scale(&self, replicas: u32, now: Instant) {
        let mut inner = self.lock();
        inner.last_replicas = Some(replicas);
        inner.last_scale = Some(now);
        inner.last_probe = None;
        debug!(replicas, "scale committed, health cache cleared");
    }

    pub fn snapshot(&self) -> StateSnapshot {
        let inner = self.lock();
        StateSnapshot {
            last_request: inner.last_request,
            last_probe: inner.last_probe,
            last_replicas: inner.last_replicas,
            last_scale: inner.last_scale,
        }
    }
}
