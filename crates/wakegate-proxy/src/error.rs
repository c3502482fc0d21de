//! Error types for the request path.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use wakegate_autoscale::ScaleError;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("failed to scale backend up: {0}")]
    Scale(#[from] ScaleError),

    #[error("backend request failed: {0}")]
    Forward(#[from] reqwest::Error),

    #[error("connection upgrade failed: {0}")]
    Upgrade(String),

    #[error("tunnel I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid backend URL: {0}")]
    InvalidBackend(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Scale(_) | ProxyError::InvalidBackend(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ProxyError::Forward(_) | ProxyError::Upgrade(_) | ProxyError::Io(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let msg = match self {
            ProxyError::Scale(_) => "Failed to scale backend up",
            ProxyError::InvalidBackend(_) => "Invalid backend URL",
            _ => "Proxy error",
        };
        (self.status(), msg).into_response()
    }
}
