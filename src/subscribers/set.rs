//! # ListenerSet: ordered, re-entrancy safe fan-out of change callbacks
//!
//! [`ListenerSet`] holds the no-argument callbacks registered through
//! [`Coordinator::subscribe`](crate::Coordinator::subscribe) and invokes them
//! **synchronously** in registration order.
//!
//! ## What it guarantees
//! - `notify()` calls every listener registered when the round starts, in
//!   registration order, before returning.
//! - Callbacks may subscribe or unsubscribe (themselves or others) while a round
//!   is running. A listener removed mid-round is skipped for the rest of that
//!   round; the others are still called.
//! - Panics inside a callback are caught and logged; the round continues.
//! - Rounds never overlap across threads: a round started from another worker
//!   waits for the running one. A callback that triggers a nested round on its
//!   own thread (e.g. by starting a burst) runs it inline.
//! - After `close()`, registration is refused and `notify()` is a no-op.
//!
//! ## Diagram
//! ```text
//!    notify()
//!       │  copy (id, callback) pairs, release lock
//!       ├──► still registered? ─► cb #1()
//!       ├──► still registered? ─► cb #2()   (may unsubscribe #3)
//!       └──► still registered? ─► skip #3
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};
use tracing::error;

/// Change callback. Listeners re-read coordinator state; nothing is passed in.
pub type Listener = Arc<dyn Fn() + Send + Sync + 'static>;

const TARGET: &str = "balena_sync::listeners";

#[derive(Default)]
struct Inner {
    next_id: u64,
    closed: bool,
    listeners: BTreeMap<u64, Listener>,
}

/// Registry of change listeners keyed by a monotonically increasing id.
#[derive(Default)]
pub struct ListenerSet {
    inner: Mutex<Inner>,
    round: ReentrantMutex<()>,
}

impl ListenerSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` and returns its id, or `None` once closed.
    pub fn insert(&self, listener: Listener) -> Option<u64> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return None;
        }
        inner.next_id += 1;
        let id = inner.next_id;
        inner.listeners.insert(id, listener);
        Some(id)
    }

    /// Removes listener `id`. Returns `false` if it was not registered.
    pub fn remove(&self, id: u64) -> bool {
        self.inner.lock().listeners.remove(&id).is_some()
    }

    /// True if listener `id` is currently registered.
    pub fn contains(&self, id: u64) -> bool {
        self.inner.lock().listeners.contains_key(&id)
    }

    /// Invokes all listeners once, in registration order.
    pub fn notify(&self) {
        let _serial = self.round.lock();
        let round: Vec<(u64, Listener)> = {
            let inner = self.inner.lock();
            if inner.closed {
                return;
            }
            inner
                .listeners
                .iter()
                .map(|(id, l)| (*id, Arc::clone(l)))
                .collect()
        };

        for (id, listener) in round {
            if !self.contains(id) {
                continue;
            }
            let call = std::panic::AssertUnwindSafe(|| listener());
            if let Err(panic_err) = std::panic::catch_unwind(call) {
                error!(target: TARGET, listener = id, "listener panicked: {:?}", panic_err);
            }
        }
    }

    /// Drops every listener and refuses new ones.
    pub fn close(&self) {
        let drained = {
            let mut inner = self.inner.lock();
            inner.closed = true;
            std::mem::take(&mut inner.listeners)
        };
        // Listener destructors run outside the lock.
        drop(drained);
    }

    /// Number of listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    /// True if no listeners are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> Listener {
        let log = Arc::clone(log);
        Arc::new(move || log.lock().push(name))
    }

    #[test]
    fn notifies_in_registration_order() {
        let set = ListenerSet::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        set.insert(recorder(&log, "a"));
        set.insert(recorder(&log, "b"));
        set.insert(recorder(&log, "c"));

        set.notify();
        assert_eq!(*log.lock(), vec!["a", "b", "c"]);
    }

    #[test]
    fn removed_listener_is_skipped_in_same_round() {
        let set = Arc::new(ListenerSet::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        let victim = Arc::new(AtomicUsize::new(0));
        let set_for_a = Arc::clone(&set);
        let victim_for_a = Arc::clone(&victim);
        let log_for_a = Arc::clone(&log);
        set.insert(Arc::new(move || {
            log_for_a.lock().push("a");
            set_for_a.remove(victim_for_a.load(Ordering::SeqCst) as u64);
        }));
        let b = set.insert(recorder(&log, "b")).unwrap();
        victim.store(b as usize, Ordering::SeqCst);
        set.insert(recorder(&log, "c"));

        set.notify();
        assert_eq!(*log.lock(), vec!["a", "c"]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn panicking_listener_does_not_stop_round() {
        let set = ListenerSet::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        set.insert(Arc::new(|| panic!("boom")));
        set.insert(recorder(&log, "after"));

        set.notify();
        assert_eq!(*log.lock(), vec!["after"]);
    }

    #[test]
    fn close_clears_and_refuses() {
        let set = ListenerSet::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        set.insert(Arc::new(move || {
            h.fetch_add(1, Ordering::SeqCst);
        }));

        set.close();
        assert_eq!(set.len(), 0);
        assert!(set.insert(Arc::new(|| {})).is_none());
        set.notify();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn remove_twice_is_harmless() {
        let set = ListenerSet::new();
        let id = set.insert(Arc::new(|| {})).unwrap();
        assert!(set.remove(id));
        assert!(!set.remove(id));
    }

    #[test]
    fn rounds_from_different_threads_do_not_overlap() {
        let set = Arc::new(ListenerSet::new());
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (a, p) = (Arc::clone(&active), Arc::clone(&peak));
        set.insert(Arc::new(move || {
            let now = a.fetch_add(1, Ordering::SeqCst) + 1;
            p.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(2));
            a.fetch_sub(1, Ordering::SeqCst);
        }));

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let set = Arc::clone(&set);
                std::thread::spawn(move || {
                    for _ in 0..5 {
                        set.notify();
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn nested_round_on_same_thread_runs_inline() {
        let set = Arc::new(ListenerSet::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let depth = Arc::new(AtomicUsize::new(0));

        let (s, l, d) = (Arc::clone(&set), Arc::clone(&log), Arc::clone(&depth));
        set.insert(Arc::new(move || {
            let level = d.fetch_add(1, Ordering::SeqCst);
            l.lock().push(level);
            if level == 0 {
                s.notify();
            }
            d.fetch_sub(1, Ordering::SeqCst);
        }));

        set.notify();
        assert_eq!(*log.lock(), vec![0, 1]);
    }
}
