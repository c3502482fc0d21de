//! wakegate-state — in-memory state shared by the proxy's components.
//!
//! Holds the activity clock, the positive health cache, and the record of
//! the last scale request behind a single mutex. The block lives for the
//! process lifetime and is never persisted.
//!
//! # Architecture
//!
//! ```text
//! ProxyState (Arc, Clone)
//!   └── Mutex<Inner>
//!       ├── last_request   ← Dispatcher
//!       ├── last_probe     ← HealthProber (set), ScaleController (clear)
//!       └── last_replicas / last_scale ← ScaleController
//! ```
//!
//! Every operation takes an explicit `now` and only reads, compares, or
//! assigns fields while the lock is held. Callers never hold the lock
//! across an `.await`.

pub mod state;
pub mod types;

pub use state::ProxyState;
pub use types::{StateConfig, StateSnapshot};
