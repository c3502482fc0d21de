//! Per-request entry point.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use tokio::time::Instant;
use tracing::{error, info};

use wakegate_autoscale::ScaleController;
use wakegate_health::HealthProber;
use wakegate_state::ProxyState;

use crate::error::ProxyError;
use crate::forward::Forwarder;

/// Records activity, wakes the backend if needed, then forwards.
pub struct Dispatcher {
    /// Activity clock updated on every request.
    state: ProxyState,
    /// Decides whether a scale-up is needed.
    prober: HealthProber,
    /// Wakes the backend with `scale(1)`.
    scaler: ScaleController,
    /// Relays the request once the backend is up or waking.
    forwarder: Forwarder,
    /// Wait after a scale-up before forwarding.
    grace_period: Duration,
}

impl Dispatcher {
    /// `grace_period` is how long a request waits after a scale-up before
    /// it is forwarded.
    pub fn new(
        state: ProxyState,
        prober: HealthProber,
        scaler: ScaleController,
        forwarder: Forwarder,
        grace_period: Duration,
    ) -> Self {
        Self {
            state,
            prober,
            scaler,
            forwarder,
            grace_period,
        }
    }

    /// Handle one client request.
    ///
    /// The grace-period sleep only delays this request; the state lock is
    /// not held while waiting.
    pub async fn dispatch(&self, req: Request) -> Result<Response, ProxyError> {
        self.state.record_activity(Instant::now());

        if !self.prober.is_backend_up().await {
            info!("backend is down, scaling up via kubernetes");
            let outcome = self.scaler.scale(1).await?;
            info!(
                ?outcome,
                grace_secs = self.grace_period.as_secs_f64(),
                "waiting for backend to start"
            );
            tokio::time::sleep(self.grace_period).await;
        }

        self.forwarder.forward(req).await
    }
}

async fn handle(State(dispatcher): State<Arc<Dispatcher>>, req: Request) -> Response {
    match dispatcher.dispatch(req).await {
        Ok(resp) => resp,
        Err(e) => {
            error!(error = %e, status = %e.status(), "proxy request failed");
            e.into_response()
        }
    }
}

/// Build the router. Only `exposed_path` is served; everything else is
/// `404` and does not count as activity.
pub fn build_router(dispatcher: Arc<Dispatcher>, exposed_path: &str) -> Router {
    Router::new()
        .route(exposed_path, any(handle))
        .with_state(dispatcher)
}
