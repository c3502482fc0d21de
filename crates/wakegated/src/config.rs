//! Daemon configuration. Every flag can also be set from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use reqwest::Url;

use wakegate_state::StateConfig;

/// One year, the longest inactivity threshold or health cache window.
const MAX_MINUTES: u64 = 365 * 24 * 60;
/// One year, the longest cooldown.
const MAX_HOURS: u64 = 365 * 24;
/// One day, the longest fixed interval in seconds.
const MAX_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "wakegated",
    about = "Scale-to-zero WebSocket proxy in front of a Kubernetes Deployment"
)]
pub struct DaemonConfig {
    /// Listen address. `:port` listens on all interfaces.
    #[arg(long, env = "LISTEN_ADDR", default_value = ":8080")]
    pub listen_addr: String,

    /// Path exposed to clients.
    #[arg(long, env = "SECRET_PATH", default_value = "/vmessws")]
    pub secret_path: String,

    /// Backend base URL.
    #[arg(long, env = "BACKEND_URL", default_value = "http://127.0.0.1:3001")]
    pub backend_url: String,

    /// Backend's own upgrade path.
    #[arg(long, env = "BACKEND_PATH", default_value = "/ws")]
    pub backend_path: String,

    /// Kubernetes API server.
    #[arg(long, env = "KUBE_CLUSTER_ENDPOINT", default_value = "https://kubernetes.default.svc")]
    pub kube_api: String,

    #[arg(long, env = "NAMESPACE", default_value = "test")]
    pub namespace: String,

    /// Deployment whose replicas are controlled.
    #[arg(long, env = "DEPLOYMENT_NAME", default_value = "t2")]
    pub deployment: String,

    /// Minutes without traffic before scaling to zero.
    #[arg(
        long,
        env = "INACTIVITY_MINUTES",
        default_value = "60",
        value_parser = clap::value_parser!(u64).range(..=MAX_MINUTES)
    )]
    pub inactivity_minutes: u64,

    /// Hours before an identical replica count is re-sent.
    #[arg(
        long,
        env = "REPLICA_UPDATE_INTERVAL_HOURS",
        default_value = "24",
        value_parser = clap::value_parser!(u64).range(..=MAX_HOURS)
    )]
    pub cooldown_hours: u64,

    /// Minutes a positive health probe is trusted.
    #[arg(
        long,
        env = "BACKEND_HEALTH_CHECK_INTERVAL",
        default_value = "10",
        value_parser = clap::value_parser!(u64).range(..=MAX_MINUTES)
    )]
    pub health_cache_minutes: u64,

    /// Seconds between inactivity checks.
    #[arg(
        long,
        env = "WATCH_INTERVAL_SECS",
        default_value = "600",
        value_parser = clap::value_parser!(u64).range(..=MAX_SECS)
    )]
    pub watch_interval_secs: u64,

    /// Seconds a request waits after scaling the backend up.
    #[arg(
        long,
        env = "SCALE_UP_GRACE_SECS",
        default_value = "10",
        value_parser = clap::value_parser!(u64).range(..=MAX_SECS)
    )]
    pub grace_period_secs: u64,

    /// Timeout for health probes and Kubernetes API calls.
    #[arg(
        long,
        env = "REQUEST_TIMEOUT_SECS",
        default_value = "5",
        value_parser = clap::value_parser!(u64).range(..=MAX_SECS)
    )]
    pub request_timeout_secs: u64,
}

impl DaemonConfig {
    /// Check everything that can be checked before binding.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.listen_socket()?;
        check_http_url("backend URL", &self.backend_url)?;
        check_http_url("kubernetes API endpoint", &self.kube_api)?;
        check_path("secret path", &self.secret_path)?;
        check_path("backend path", &self.backend_path)?;
        if self.namespace.is_empty() || self.deployment.is_empty() {
            bail!("namespace and deployment name must be set");
        }
        if self.watch_interval_secs == 0 {
            bail!("watch interval must be greater than zero");
        }
        Ok(())
    }

    pub fn listen_socket(&self) -> anyhow::Result<SocketAddr> {
        parse_listen_addr(&self.listen_addr)
    }

    pub fn state_config(&self) -> StateConfig {
        StateConfig::new(
            minutes(self.health_cache_minutes),
            hours(self.cooldown_hours),
        )
    }

    pub fn inactivity_threshold(&self) -> Duration {
        minutes(self.inactivity_minutes)
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch_interval_secs)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// Inputs are bounded by the clap parsers; saturate rather than wrap if a
// config is built some other way.
fn minutes(n: u64) -> Duration {
    Duration::from_secs(n.saturating_mul(60))
}

fn hours(n: u64) -> Duration {
    Duration::from_secs(n.saturating_mul(60 * 60))
}

/// Parse `host:port`, treating a bare `:port` as all interfaces.
pub fn parse_listen_addr(raw: &str) -> anyhow::Result<SocketAddr> {
    let full = match raw.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => raw.to_string(),
    };
    full.parse()
        .with_context(|| format!("invalid listen address {raw:?}"))
}

fn check_http_url(what: &str, raw: &str) -> anyhow::Result<()> {
    let url = Url::parse(raw).with_context(|| format!("invalid {what} {raw:?}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("{what} must be http or https, got {raw:?}");
    }
    Ok(())
}

fn check_path(what: &str, path: &str) -> anyhow::Result<()> {
    if !path.starts_with('/') {
        bail!("{what} must start with '/', got {path:?}");
    }
    Ok(())
}
