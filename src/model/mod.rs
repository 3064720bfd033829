//! Data model: immutable application snapshots.
//!
//! ## Contents
//! - [`ApplicationSnapshot`] one point-in-time view of the supervised application
//! - [`ServiceState`] state of one service (container) inside a snapshot
//! - [`ServiceStatus`] opaque status text with helpers for well-known values
//! - [`DownloadProgress`] numeric or textual download indicator
//!
//! Snapshots are never mutated after parsing; the coordinator swaps whole
//! `Arc<ApplicationSnapshot>` values on refresh.

mod snapshot;

pub use snapshot::{ApplicationSnapshot, DownloadProgress, ServiceState, ServiceStatus};
