//! Cached backend prober.

use std::time::Duration;

use reqwest::{redirect, Client, Url};
use tokio::time::Instant;
use tracing::{debug, warn};

use wakegate_state::ProxyState;

use crate::checker::probe;
use crate::error::ProbeError;

/// Answers "is the backend up?" with a positive-only cache.
#[derive(Clone)]
pub struct HealthProber {
    state: ProxyState,
    client: Client,
    target: Url,
}

impl HealthProber {
    /// Build a prober for `target` (the backend's upgrade URL).
    ///
    /// The client never follows redirects, gives up after `timeout`, and
    /// accepts self-signed backend certificates.
    pub fn new(state: ProxyState, target: Url, timeout: Duration) -> Result<Self, ProbeError> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::none())
            .danger_accept_invalid_certs(true)
            .user_agent("wakegate-health/0.1")
            .build()?;
        Ok(Self {
            state,
            client,
            target,
        })
    }

    /// Whether the backend accepts upgrade handshakes right now.
    ///
    /// Never fails: transport errors, timeouts and unexpected statuses
    /// are logged and reported as `false`.
    pub async fn is_backend_up(&self) -> bool {
        if self.state.health_cached(Instant::now()) {
            debug!("using cached backend status");
            return true;
        }

        match probe(&self.client, &self.target).await {
            Ok(()) => {
                self.state.mark_healthy(Instant::now());
                true
            }
            Err(ProbeError::NotServing) => {
                warn!(target = %self.target, "backend is down (404 received)");
                false
            }
            Err(e) => {
                warn!(target = %self.target, error = %e, "health check failed");
                false
            }
        }
    }
}
