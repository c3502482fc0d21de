//! Single-shot probe and response classification.

use http::StatusCode;
use reqwest::{Client, Url};
use tracing::debug;

use crate::error::ProbeError;

/// Classify a probe response status. `Ok` means the backend is up.
///
/// `400` is the backend refusing our handshake-less `GET`, which proves it
/// is alive. Everything else counts as down.
pub fn classify(status: StatusCode) -> Result<(), ProbeError> {
    match status {
        StatusCode::BAD_REQUEST => Ok(()),
        StatusCode::NOT_FOUND => Err(ProbeError::NotServing),
        other => Err(ProbeError::UnexpectedStatus(other)),
    }
}

/// Issue one `GET` against `target` with the client's timeout and
/// redirect policy.
pub async fn probe(client: &Client, target: &Url) -> Result<(), ProbeError> {
    let resp = client.get(target.clone()).send().await?;
    let status = resp.status();
    debug!(%status, %target, "health probe answered");
    classify(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_request_means_up() {
        assert!(classify(StatusCode::BAD_REQUEST).is_ok());
    }

    #[test]
    fn not_found_means_not_serving() {
        assert!(matches!(
            classify(StatusCode::NOT_FOUND),
            Err(ProbeError::NotServing)
        ));
    }

    #[test]
    fn success_is_unexpected() {
        // A 200 means something other than the upgrade endpoint answered.
        assert!(matches!(
            classify(StatusCode::OK),
            Err(ProbeError::UnexpectedStatus(StatusCode::OK))
        ));
    }

    #[test]
    fn redirects_and_server_errors_are_down() {
        for status in [
            StatusCode::FOUND,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
        ] {
            assert!(matches!(
                classify(status),
                Err(ProbeError::UnexpectedStatus(s)) if s == status
            ));
        }
    }
}
