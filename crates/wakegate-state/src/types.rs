//! Value types for the proxy state block.

use std::time::Duration;

use tokio::time::Instant;

/// Timing knobs that govern the health cache and the scale debounce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateConfig {
    /// How long a positive health probe is trusted.
    pub cache_window: Duration,
    /// Minimum gap before an identical replica count is re-sent.
    pub cooldown: Duration,
}

impl StateConfig {
    pub fn new(cache_window: Duration, cooldown: Duration) -> Self {
        Self {
            cache_window,
            cooldown,
        }
    }
}

/// Point-in-time copy of every field in the state block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSnapshot {
    /// Most recent client request.
    pub last_request: Instant,
    /// `None` until the first positive probe, and again after each scale.
    pub last_probe: Option<Instant>,
    /// `None` while the replica count is unknown.
    pub last_replicas: Option<u32>,
    /// When `last_replicas` was committed.
    pub last_scale: Option<Instant>,
}
