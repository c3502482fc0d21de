//! wakegated — the wakegate daemon.
//!
//! Single binary that assembles the proxy:
//! - Shared state block
//! - Health prober
//! - Scale controller + inactivity watcher
//! - Dispatcher on the exposed upgrade path
//!
//! # Usage
//!
//! ```text
//! KUBE_CLUSTER_TOKEN=... wakegated --listen-addr :8080 --backend-url http://relay:3001
//! ```

mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{error, info};

use wakegate_autoscale::{EnvCredentials, InactivityWatcher, ScaleController, WorkloadRef};
use wakegate_health::HealthProber;
use wakegate_proxy::{build_router, Dispatcher, Forwarder};
use wakegate_state::ProxyState;

use crate::config::DaemonConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,wakegated=debug,wakegate=debug")),
        )
        .init();

    let config = DaemonConfig::parse();
    config.validate()?;
    run(config).await
}

async fn run(config: DaemonConfig) -> anyhow::Result<()> {
    let addr = config.listen_socket()?;
    info!(%addr, path = %config.secret_path, "wakegate starting");
    info!(backend = %config.backend_url, path = %config.backend_path, "backend target");

    // ── Components ─────────────────────────────────────────────

    let state = ProxyState::new(config.state_config(), Instant::now());

    let forwarder = Forwarder::new(
        &config.backend_url,
        &config.backend_path,
        config.request_timeout(),
    )
    .context("failed to build backend forwarder")?;

    let prober = HealthProber::new(
        state.clone(),
        forwarder.target().clone(),
        config.request_timeout(),
    )
    .context("failed to build health prober")?;

    let workload = WorkloadRef::new(&config.kube_api, &config.namespace, &config.deployment);
    let scaler = ScaleController::new(
        state.clone(),
        workload,
        Arc::new(EnvCredentials::default()),
        config.request_timeout(),
    )
    .context("failed to build scale controller")?;
    info!(
        api = %config.kube_api,
        namespace = %config.namespace,
        deployment = %config.deployment,
        "scale controller initialized"
    );

    let watcher = InactivityWatcher::new(
        state.clone(),
        scaler.clone(),
        config.inactivity_threshold(),
        config.watch_interval(),
    );

    let dispatcher = Dispatcher::new(state, prober, scaler, forwarder, config.grace_period());

    // ── Background tasks ───────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let watcher_handle = tokio::spawn(watcher.run(shutdown_rx));

    // ── Listener ───────────────────────────────────────────────

    let router = build_router(Arc::new(dispatcher), &config.secret_path);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "proxy listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    })
    .await?;

    let _ = watcher_handle.await;
    info!("wakegate stopped");
    Ok(())
}
