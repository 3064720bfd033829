//! # Burst timer slot.
//!
//! A burst is a temporary switch to the short polling interval. The slot holds
//! **at most one** pending expiry timer:
//!
//! ```text
//! arm()  ──► generation += 1
//!            cancel previous timer (if any)
//!            install { generation, token }
//!
//! timer fires ──► take_if_current(generation)
//!                   ├─ same generation → slot emptied, caller reverts to Normal
//!                   └─ stale           → ignored (a newer arm won)
//! ```
//!
//! ## Rules
//! - Bursts never stack: the latest arm resets the countdown.
//! - The generation check runs under the coordinator state lock, so a timer that
//!   already woke up but lost the race to a re-arm can not revert the cadence.
//! - Timer tokens are children of the coordinator token; teardown cancels them.

use tokio_util::sync::CancellationToken;

/// One armed expiry timer.
struct PendingExpiry {
    generation: u64,
    cancel: CancellationToken,
}

/// Single-entry slot for the burst expiry timer.
pub(super) struct BurstSlot {
    generation: u64,
    pending: Option<PendingExpiry>,
}

impl BurstSlot {
    pub fn new() -> Self {
        Self {
            generation: 0,
            pending: None,
        }
    }

    /// Replaces any pending timer with a new one.
    ///
    /// Returns the new generation and the token the timer task must observe.
    pub fn arm(&mut self, parent: &CancellationToken) -> (u64, CancellationToken) {
        if let Some(prev) = self.pending.take() {
            prev.cancel.cancel();
        }
        self.generation += 1;
        let token = parent.child_token();
        self.pending = Some(PendingExpiry {
            generation: self.generation,
            cancel: token.clone(),
        });
        (self.generation, token)
    }

    /// Empties the slot if `generation` is still the armed one.
    pub fn take_if_current(&mut self, generation: u64) -> bool {
        match &self.pending {
            Some(p) if p.generation == generation => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Cancels the pending timer, if any.
    pub fn cancel(&mut self) {
        if let Some(prev) = self.pending.take() {
            prev.cancel.cancel();
        }
    }

    /// Number of outstanding timers (0 or 1).
    pub fn outstanding(&self) -> usize {
        usize::from(self.pending.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rearm_cancels_previous_timer() {
        let root = CancellationToken::new();
        let mut slot = BurstSlot::new();

        let (g1, t1) = slot.arm(&root);
        let (g2, t2) = slot.arm(&root);
        let (g3, t3) = slot.arm(&root);

        assert!(t1.is_cancelled());
        assert!(t2.is_cancelled());
        assert!(!t3.is_cancelled());
        assert_eq!(slot.outstanding(), 1);

        assert!(!slot.take_if_current(g1));
        assert!(!slot.take_if_current(g2));
        assert!(slot.take_if_current(g3));
        assert_eq!(slot.outstanding(), 0);
        assert!(!slot.take_if_current(g3));
    }

    #[test]
    fn parent_cancellation_reaches_timer() {
        let root = CancellationToken::new();
        let mut slot = BurstSlot::new();
        let (_, token) = slot.arm(&root);
        root.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn cancel_empties_slot() {
        let root = CancellationToken::new();
        let mut slot = BurstSlot::new();
        let (g, token) = slot.arm(&root);
        slot.cancel();
        assert!(token.is_cancelled());
        assert!(!slot.take_if_current(g));
    }
}
