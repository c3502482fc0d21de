//! wakegate-proxy — the request path of wakegate.
//!
//! Every request on the exposed upgrade path goes through the
//! [`Dispatcher`]:
//!
//! ```text
//! client
//!   │
//!   ▼
//! axum route (secret path)
//!   ├── ProxyState::record_activity()
//!   ├── HealthProber::is_backend_up()
//!   │     └── down → ScaleController::scale(1) → sleep(grace)
//!   └── Forwarder::forward()
//!         ├── 101 → upgrade both sides, copy_bidirectional
//!         └── other → stream response back
//! ```
//!
//! Scale failures become `500`, forwarding failures `502`. Nothing is
//! retried here; the next request is the retry.

pub mod dispatcher;
pub mod error;
pub mod forward;

pub use dispatcher::{build_router, Dispatcher};
pub use error::ProxyError;
pub use forward::Forwarder;
