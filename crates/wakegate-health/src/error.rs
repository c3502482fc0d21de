//! Error types for health probes.

use http::StatusCode;
use thiserror::Error;

/// Why a probe did not report the backend as up.
///
/// These never reach a client; the prober logs them and answers `false`.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend is not serving the upgrade path (404)")]
    NotServing,

    #[error("unexpected status from backend: {0}")]
    UnexpectedStatus(StatusCode),
}
