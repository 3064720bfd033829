//! # Polling loop.
//!
//! One task per coordinator. It sleeps until the next refresh is due, refreshes,
//! and re-arms itself with the interval of the current cadence.
//!
//! ```text
//! loop {
//!   select! {
//!     token cancelled   ─► exit
//!     reschedule poke   ─► due = now + interval(cadence)      (cadence change, refresh done)
//!     sleep_until(due)  ─► refresh() (errors absorbed) ; due = now + interval(cadence)
//!   }
//! }
//! ```
//!
//! ## Rules
//! - A failed refresh never stops the loop.
//! - A cadence transition takes effect immediately, not after the old interval.

use std::sync::Arc;

use tokio::time::{self, Instant};

use super::coordinator::{Inner, TARGET};

pub(super) async fn run(inner: Arc<Inner>) {
    let token = inner.token.clone();
    let mut due = Instant::now() + inner.refresh_interval();

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = inner.reschedule.notified() => {
                due = Instant::now() + inner.refresh_interval();
            }
            _ = time::sleep_until(due) => {
                // Failures are recorded and logged by the refresh itself.
                let _ = inner.refresh().await;
                due = Instant::now() + inner.refresh_interval();
            }
        }
    }

    tracing::debug!(target: TARGET, "scheduler stopped");
}
