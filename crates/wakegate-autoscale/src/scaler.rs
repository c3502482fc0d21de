//! Scale controller — debounced replica updates against the Kubernetes API.

use std::sync::Arc;
use std::time::Duration;

use http::header::ACCEPT;
use reqwest::{Client, Url};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use wakegate_state::ProxyState;

use crate::credentials::CredentialSource;
use crate::error::ScaleError;
use crate::kube::{Scale, WorkloadRef};

/// What a successful [`ScaleController::scale`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleOutcome {
    /// The API accepted the new replica count.
    Applied,
    /// Same count was committed inside the cooldown; nothing was sent.
    Suppressed,
}

/// Sends replica updates for one workload.
#[derive(Clone)]
pub struct ScaleController {
    state: ProxyState,
    client: Client,
    workload: WorkloadRef,
    scale_url: Url,
    credentials: Arc<dyn CredentialSource>,
    /// Held from the debounce check through the commit.
    gate: Arc<Mutex<()>>,
}

impl ScaleController {
    /// Create a controller for `workload`.
    ///
    /// `timeout` bounds each API call.
    pub fn new(
        state: ProxyState,
        workload: WorkloadRef,
        credentials: Arc<dyn CredentialSource>,
        timeout: Duration,
    ) -> Result<Self, ScaleError> {
        let scale_url = workload.scale_url()?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("wakegate-autoscale/0.1")
            .build()?;
        Ok(Self {
            state,
            client,
            workload,
            scale_url,
            credentials,
            gate: Arc::new(Mutex::new(())),
        })
    }

    /// Request `replicas` for the workload.
    ///
    /// Returns `Suppressed` without touching the network when the same
    /// count was committed within the cooldown. On failure the scale state
    /// is left as it was.
    pub async fn scale(&self, replicas: u32) -> Result<ScaleOutcome, ScaleError> {
        let _gate = self.gate.lock().await;
        self.apply(replicas).await
    }

    /// Request zero replicas if no traffic arrived within `threshold`.
    ///
    /// Idle time is read after the gate is taken, so traffic that landed
    /// while another scale call held the gate keeps the backend up.
    /// Returns `None` in that case.
    pub async fn scale_down_if_idle(
        &self,
        threshold: Duration,
    ) -> Option<Result<ScaleOutcome, ScaleError>> {
        let _gate = self.gate.lock().await;
        let idle = self.state.idle_for(Instant::now());
        if idle < threshold {
            debug!(idle_secs = idle.as_secs(), "traffic arrived, keeping deployment up");
            return None;
        }
        Some(self.apply(0).await)
    }

    /// Debounce, send and commit. Callers hold the gate.
    async fn apply(&self, replicas: u32) -> Result<ScaleOutcome, ScaleError> {
        debug!(replicas, deployment = %self.workload.name, "scale requested");

        if !self.state.should_scale(replicas, Instant::now()) {
            info!(replicas, "scale unchanged: already requested within cooldown");
            return Ok(ScaleOutcome::Suppressed);
        }

        let token = self.credentials.bearer_token().ok_or_else(|| {
            ScaleError::Configuration("no bearer token for the kubernetes API".to_string())
        })?;

        let resp = self
            .client
            .put(self.scale_url.clone())
            .bearer_auth(token)
            .header(ACCEPT, "application/json")
            .json(&Scale::new(&self.workload.name, replicas))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(%status, replicas, deployment = %self.workload.name, "scale request rejected");
            return Err(ScaleError::Api { status, body });
        }

        self.state.commit_scale(replicas, Instant::now());
        info!(
            replicas,
            namespace = %self.workload.namespace,
            deployment = %self.workload.name,
            "deployment scaled"
        );
        Ok(ScaleOutcome::Applied)
    }
}
