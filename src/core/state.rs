//! # Coordinator state.
//!
//! [`SyncState`] is everything the coordinator knows, guarded by one lock so a
//! refresh result, a cadence transition and a burst re-arm are each applied
//! atomically with respect to readers.
//!
//! ## Rules
//! - `snapshot` only changes on a successful refresh (whole `Arc` swap).
//! - `last_update_succeeded` / `last_error` reflect only the latest attempt.
//! - `cadence` and `burst` change together (see [`BurstSlot`]).

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use super::burst::BurstSlot;
use crate::error::SyncError;
use crate::model::ApplicationSnapshot;

/// Polling mode of a coordinator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cadence {
    /// Long default interval.
    Normal,
    /// Short interval until `until`, then back to [`Cadence::Normal`].
    Burst {
        /// When the burst reverts unless re-armed.
        until: Instant,
    },
}

impl Cadence {
    pub fn is_burst(&self) -> bool {
        matches!(self, Cadence::Burst { .. })
    }

    /// Burst expiry, if bursting.
    pub fn burst_expiry(&self) -> Option<Instant> {
        match self {
            Cadence::Normal => None,
            Cadence::Burst { until } => Some(*until),
        }
    }

    /// Picks the interval matching this cadence.
    pub fn interval(&self, normal: Duration, burst: Duration) -> Duration {
        match self {
            Cadence::Normal => normal,
            Cadence::Burst { .. } => burst,
        }
    }
}

/// Mutable state owned by one coordinator.
pub(super) struct SyncState {
    pub snapshot: Option<Arc<ApplicationSnapshot>>,
    pub last_update_succeeded: bool,
    pub last_error: Option<SyncError>,
    pub cadence: Cadence,
    pub burst: BurstSlot,
}

impl SyncState {
    pub fn new() -> Self {
        Self {
            snapshot: None,
            last_update_succeeded: false,
            last_error: None,
            cadence: Cadence::Normal,
            burst: BurstSlot::new(),
        }
    }

    /// Records the outcome of one refresh attempt.
    ///
    /// A failure never touches the previous snapshot.
    pub fn record(&mut self, outcome: &Result<ApplicationSnapshot, SyncError>) {
        match outcome {
            Ok(snap) => {
                self.snapshot = Some(Arc::new(snap.clone()));
                self.last_update_succeeded = true;
                self.last_error = None;
            }
            Err(e) => {
                self.last_update_succeeded = false;
                self.last_error = Some(e.clone());
            }
        }
    }

    pub fn application_id(&self) -> Option<u64> {
        self.snapshot.as_ref().map(|s| s.application_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn snap(commit: &str) -> ApplicationSnapshot {
        ApplicationSnapshot {
            application_id: 7,
            application_name: "app".into(),
            commit: commit.into(),
            services: BTreeMap::new(),
        }
    }

    #[test]
    fn failure_keeps_last_successful_snapshot() {
        let mut st = SyncState::new();
        st.record(&Ok(snap("a")));
        st.record(&Err(SyncError::transport("refused")));
        st.record(&Ok(snap("b")));
        st.record(&Err(SyncError::protocol("two apps")));

        assert!(!st.last_update_succeeded);
        assert_eq!(st.snapshot.as_ref().unwrap().commit, "b");
        assert_eq!(st.last_error.as_ref().unwrap().as_label(), "protocol_error");
        assert_eq!(st.application_id(), Some(7));
    }

    #[test]
    fn success_clears_last_error() {
        let mut st = SyncState::new();
        st.record(&Err(SyncError::transport("refused")));
        assert!(st.snapshot.is_none());
        st.record(&Ok(snap("a")));
        assert!(st.last_update_succeeded);
        assert!(st.last_error.is_none());
    }

    #[test]
    fn cadence_interval_selection() {
        let normal = Duration::from_secs(300);
        let burst = Duration::from_secs(10);
        assert_eq!(Cadence::Normal.interval(normal, burst), normal);
        let c = Cadence::Burst {
            until: Instant::now(),
        };
        assert!(c.is_burst());
        assert_eq!(c.interval(normal, burst), burst);
        assert_eq!(Cadence::Normal.burst_expiry(), None);
    }
}
