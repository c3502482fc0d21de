//! Forwarding to the backend's upgrade endpoint.
//!
//! The client's request is replayed against `<backend_url><backend_path>`
//! with its query string. When the backend switches protocols, both the
//! client and backend connections are upgraded and bytes are copied in
//! both directions until either side closes.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use axum::body::Body;
use axum::extract::{ConnectInfo, Request};
use axum::http::header::{CONNECTION, CONTENT_LENGTH, HOST, TRANSFER_ENCODING, UPGRADE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;
use reqwest::{redirect, Client, Url};
use tracing::{debug, warn};

use crate::error::ProxyError;

/// Headers that describe a single hop and must not be relayed.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Append `client` to `X-Forwarded-For`, folding any values already sent.
fn append_forwarded_for(headers: &mut HeaderMap, client: IpAddr) {
    let prior: Vec<&str> = headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    let value = if prior.is_empty() {
        client.to_string()
    } else {
        format!("{}, {client}", prior.join(", "))
    };
    match HeaderValue::from_str(&value) {
        Ok(value) => {
            headers.insert(X_FORWARDED_FOR, value);
        }
        Err(e) => warn!(error = %e, "dropping unusable x-forwarded-for"),
    }
}

/// Relays requests to one backend upgrade URL.
#[derive(Clone)]
pub struct Forwarder {
    client: Client,
    target: Url,
}

impl Forwarder {
    /// Build a forwarder for `backend_url` rewritten to `backend_path`.
    ///
    /// The backend may present a self-signed certificate. Only the
    /// connect phase is bounded by `connect_timeout`; upgraded connections
    /// live until a side closes them.
    pub fn new(
        backend_url: &str,
        backend_path: &str,
        connect_timeout: Duration,
    ) -> Result<Self, ProxyError> {
        let mut target = Url::parse(backend_url)
            .map_err(|e| ProxyError::InvalidBackend(format!("{backend_url}: {e}")))?;
        if !matches!(target.scheme(), "http" | "https") {
            return Err(ProxyError::InvalidBackend(format!(
                "{backend_url}: unsupported scheme {}",
                target.scheme()
            )));
        }
        target.set_path(backend_path);

        let client = Client::builder()
            .http1_only()
            .redirect(redirect::Policy::none())
            .danger_accept_invalid_certs(true)
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self { client, target })
    }

    /// The backend upgrade URL, without any query string.
    pub fn target(&self) -> &Url {
        &self.target
    }

    fn url_for(&self, query: Option<&str>) -> Url {
        let mut url = self.target.clone();
        url.set_query(query);
        url
    }

    /// Forward one request and produce the response for the client.
    pub async fn forward(&self, mut req: Request) -> Result<Response, ProxyError> {
        let on_upgrade = req.extensions_mut().remove::<OnUpgrade>();
        let (parts, body) = req.into_parts();
        let url = self.url_for(parts.uri.query());
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        let has_body = parts.headers.contains_key(CONTENT_LENGTH)
            || parts.headers.contains_key(TRANSFER_ENCODING);

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        // Host comes from the backend URL.
        headers.remove(HOST);
        headers.insert(CONNECTION, HeaderValue::from_static("Upgrade"));
        headers.insert(UPGRADE, HeaderValue::from_static("websocket"));
        if let Some(ip) = peer {
            append_forwarded_for(&mut headers, ip);
        }

        debug!(method = %parts.method, %url, "forwarding request");
        let mut outbound = self.client.request(parts.method, url).headers(headers);
        if has_body {
            outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }
        let resp = outbound.send().await?;

        let status = resp.status();
        if status == StatusCode::SWITCHING_PROTOCOLS {
            let on_upgrade = on_upgrade.ok_or_else(|| {
                ProxyError::Upgrade("client connection does not support upgrades".to_string())
            })?;

            let mut out = Response::new(Body::empty());
            *out.status_mut() = status;
            *out.headers_mut() = resp.headers().clone();

            tokio::spawn(async move {
                match tunnel(on_upgrade, resp).await {
                    Ok((from_client, from_backend)) => {
                        debug!(from_client, from_backend, "upgraded connection closed");
                    }
                    Err(e) => warn!(error = %e, "upgraded connection failed"),
                }
            });
            return Ok(out);
        }

        let mut headers = resp.headers().clone();
        strip_hop_by_hop(&mut headers);
        let mut out = Response::new(Body::from_stream(resp.bytes_stream()));
        *out.status_mut() = status;
        *out.headers_mut() = headers;
        Ok(out)
    }
}

/// Splice the upgraded client and backend connections together.
///
/// Returns the byte counts copied client→backend and backend→client.
async fn tunnel(on_upgrade: OnUpgrade, backend: reqwest::Response) -> Result<(u64, u64), ProxyError> {
    let mut backend_io = backend.upgrade().await?;
    let client = on_upgrade
        .await
        .map_err(|e| ProxyError::Upgrade(e.to_string()))?;
    let mut client_io = TokioIo::new(client);

    let copied = tokio::io::copy_bidirectional(&mut client_io, &mut backend_io).await?;
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forwarder(url: &str) -> Result<Forwarder, ProxyError> {
        Forwarder::new(url, "/ws", Duration::from_secs(1))
    }

    #[test]
    fn target_uses_backend_path() {
        let fwd = forwarder("http://127.0.0.1:3001/ignored").unwrap();
        assert_eq!(fwd.target().as_str(), "http://127.0.0.1:3001/ws");
    }

    #[test]
    fn query_is_carried_over() {
        let fwd = forwarder("https://backend.internal").unwrap();
        assert_eq!(
            fwd.url_for(Some("ed=2048")).as_str(),
            "https://backend.internal/ws?ed=2048"
        );
        assert_eq!(fwd.url_for(None).as_str(), "https://backend.internal/ws");
    }

    #[test]
    fn rejects_non_http_backend() {
        assert!(matches!(
            forwarder("ftp://backend"),
            Err(ProxyError::InvalidBackend(_))
        ));
        assert!(matches!(
            forwarder("not a url"),
            Err(ProxyError::InvalidBackend(_))
        ));
    }

    #[test]
    fn hop_by_hop_headers_are_stripped() {
        let mut headers = HeaderMap::new();
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert("sec-websocket-key", HeaderValue::from_static("abc"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key("sec-websocket-key"));
    }

    #[test]
    fn forwarded_for_starts_with_peer() {
        let mut headers = HeaderMap::new();
        append_forwarded_for(&mut headers, "192.0.2.7".parse().unwrap());
        assert_eq!(headers[X_FORWARDED_FOR], "192.0.2.7");
    }

    #[test]
    fn forwarded_for_keeps_prior_hops() {
        let mut headers = HeaderMap::new();
        headers.append(X_FORWARDED_FOR, HeaderValue::from_static("10.0.0.1"));
        headers.append(X_FORWARDED_FOR, HeaderValue::from_static("10.0.0.2"));

        append_forwarded_for(&mut headers, "2001:db8::1".parse().unwrap());

        assert_eq!(headers.get_all(X_FORWARDED_FOR).iter().count(), 1);
        assert_eq!(headers[X_FORWARDED_FOR], "10.0.0.1, 10.0.0.2, 2001:db8::1");
    }
}
