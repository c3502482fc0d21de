//! Error types for scale requests.

use http::StatusCode;
use thiserror::Error;

/// Errors returned by [`ScaleController::scale`](crate::ScaleController::scale).
///
/// None of these update the scale state, so the next trigger retries.
#[derive(Debug, Error)]
pub enum ScaleError {
    /// Missing credential or unusable workload address. Raised before any
    /// network call.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("kubernetes API returned {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("kubernetes API call failed: {0}")]
    Transport(#[from] reqwest::Error),
}
