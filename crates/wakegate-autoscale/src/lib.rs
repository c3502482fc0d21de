//! wakegate-autoscale — replica control for the fronted workload.
//!
//! Two pieces live here:
//!
//! - [`ScaleController`] sends `PUT .../deployments/{name}/scale` to the
//!   Kubernetes API, suppressing a repeat of the last committed replica
//!   count inside the cooldown window.
//! - [`InactivityWatcher`] wakes on a fixed period and asks for zero
//!   replicas once no traffic has been seen for the inactivity threshold.
//!
//! # Scaling rules
//!
//! ```text
//! scale(n):
//!     if n == last_replicas and now - last_scale < cooldown:
//!         Suppressed                       // no API call
//!     PUT Scale{spec.replicas = n}
//!     2xx  → commit(n), clear health cache, Applied
//!     else → ScaleError, state untouched
//!
//! every watch_interval:
//!     if now - last_request >= threshold:
//!         take gate, re-check idle, scale(0)
//! ```
//!
//! Scale calls are serialized by an async gate held from the debounce
//! check through the commit, so two callers racing on the same target
//! produce one API call. The shared state lock itself is never held
//! across the request.

pub mod credentials;
pub mod error;
pub mod kube;
pub mod scaler;
pub mod watcher;

pub use credentials::{CredentialSource, EnvCredentials, StaticCredentials};
pub use error::ScaleError;
pub use kube::{Scale, WorkloadRef};
pub use scaler::{ScaleController, ScaleOutcome};
pub use watcher::InactivityWatcher;
