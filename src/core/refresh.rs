//! # Refresh: one fetch, shared by every caller that asks while it runs.
//!
//! ```text
//! request_refresh() ─┐
//! scheduler tick   ──┼──► InFlight slot ── empty? ── yes ─► start fetch (id = n)
//! control_service() ─┘          │                               │
//!                               └── no ─► join running fetch    │
//!                                                               ▼
//!                              fetch_snapshot() ─► record outcome ─► clear slot(n)
//!                                                                  ─► notify listeners
//!                                                                  ─► re-arm scheduler
//! ```
//!
//! ## Rules
//! - At most one `fetch_snapshot` per coordinator at any time.
//! - The fetch runs on its own task. Callers only wait on it, so a caller that
//!   is dropped, aborted or timed out never stalls the refresh.
//! - Every joined caller receives the same `Result`.
//! - Listeners are notified after success **and** after failure.
//! - Once the coordinator is closed, a completing fetch is discarded: no state
//!   change, no notification, callers get [`SyncError::Closed`].

use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::coordinator::{Inner, TARGET};
use crate::error::SyncError;

type RefreshFuture = Shared<BoxFuture<'static, Result<(), SyncError>>>;

/// Slot holding the refresh currently in flight.
#[derive(Default)]
pub(super) struct InFlight {
    next_id: u64,
    current: Option<(u64, RefreshFuture)>,
}

impl InFlight {
    /// Drops the slot entry if it still belongs to refresh `id`.
    fn clear(&mut self, id: u64) {
        if matches!(&self.current, Some((cur, _)) if *cur == id) {
            self.current = None;
        }
    }

    pub fn is_busy(&self) -> bool {
        self.current.is_some()
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}

impl Inner {
    /// Runs a refresh, or joins the one already in flight.
    pub(super) async fn refresh(self: &Arc<Self>) -> Result<(), SyncError> {
        if self.token.is_cancelled() {
            return Err(SyncError::Closed);
        }

        let fut = {
            let mut slot = self.inflight.lock();
            match &slot.current {
                Some((_, running)) => running.clone(),
                None => {
                    slot.next_id += 1;
                    let id = slot.next_id;
                    let task = tokio::spawn(Arc::clone(self).run_refresh(id));
                    let fut = join_refresh(task).boxed().shared();
                    slot.current = Some((id, fut.clone()));
                    fut
                }
            }
        };

        fut.await
    }

    async fn run_refresh(self: Arc<Self>, id: u64) -> Result<(), SyncError> {
        let slot = SlotGuard { inner: &self, id };

        let outcome = tokio::select! {
            biased;
            _ = self.token.cancelled() => return Err(SyncError::Closed),
            res = self.client.fetch_snapshot() => res,
        };

        {
            let mut st = self.state.write();
            if self.token.is_cancelled() {
                drop(st);
                debug!(target: TARGET, "discarding refresh result after shutdown");
                return Err(SyncError::Closed);
            }
            st.record(&outcome);
        }
        // Listeners must observe the slot as free.
        drop(slot);

        match &outcome {
            Ok(snap) => debug!(
                target: TARGET,
                app_id = snap.application_id,
                services = snap.services.len(),
                "refresh succeeded"
            ),
            Err(e) => warn!(
                target: TARGET,
                error = e.as_label(),
                "refresh failed: {}",
                e.as_message()
            ),
        }

        self.listeners.notify();
        self.reschedule.notify_one();

        outcome.map(|_| ())
    }
}

/// Frees the in-flight slot when the refresh task ends, including on panic.
struct SlotGuard<'a> {
    inner: &'a Inner,
    id: u64,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.inner.inflight.lock().clear(self.id);
    }
}

async fn join_refresh(task: JoinHandle<Result<(), SyncError>>) -> Result<(), SyncError> {
    match task.await {
        Ok(res) => res,
        Err(e) if e.is_cancelled() => Err(SyncError::Closed),
        Err(e) => {
            error!(target: TARGET, "refresh task failed: {e}");
            Err(SyncError::protocol(format!("refresh task failed: {e}")))
        }
    }
}
