//! # Change listeners for the coordinator.
//!
//! Consumers register a no-argument callback and re-read cached state when it
//! fires. The coordinator calls listeners once per completed refresh (success
//! or failure) and once per cadence transition.
//!
//! ## Architecture
//! ```text
//! Coordinator ── refresh done / burst start / burst end
//!      │
//!      └──► notify round  (synchronous, registration order, one round at a time)
//!                 ├──► entity #1 callback ──► re-reads Coordinator::service("ha")
//!                 ├──► entity #2 callback
//!                 └──► device callback   ──► re-reads Coordinator::snapshot()
//! ```
//!
//! ## Example
//! ```no_run
//! # async fn demo(coordinator: balena_sync::Coordinator) {
//! let mut sub = coordinator.subscribe(|| println!("state changed"));
//! // ...
//! sub.unsubscribe();
//! # }
//! ```

mod set;
mod subscription;

pub(crate) use set::ListenerSet;
pub use subscription::Subscription;
