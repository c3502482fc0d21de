//! wakegate-health — backend reachability checks for wakegate.
//!
//! The backend only exposes an upgrade endpoint, so a plain `GET` against
//! it is an incomplete handshake. A live backend rejects it with
//! `400 Bad Request`; a missing serving layer answers `404 Not Found`.
//!
//! # Architecture
//!
//! ```text
//! HealthProber::is_backend_up()
//!   ├── ProxyState::health_cached()  → true (no network)
//!   ├── checker::probe()             → Ok(()) / ProbeError
//!   └── ProxyState::mark_healthy()   on Ok only
//! ```
//!
//! Only positive results are cached. A down backend is re-probed on every
//! call so recovery is noticed on the next request.

pub mod checker;
pub mod error;
pub mod prober;

pub use checker::classify;
pub use error::ProbeError;
pub use prober::HealthProber;
