//! # Scoped listener registration
//!
//! A [`Subscription`] is the unsubscribe handle returned by
//! [`Coordinator::subscribe`](crate::Coordinator::subscribe). The listener stays
//! registered for as long as the handle lives:
//!
//! - `unsubscribe()` removes it early; calling it again is a no-op;
//! - dropping the handle removes it;
//! - both are no-ops once the coordinator is gone.
//!
//! The handle only holds a weak reference, so it never keeps a coordinator alive.

use std::sync::Weak;

use super::set::ListenerSet;

/// Unsubscribe handle tied to one registered listener.
#[must_use = "dropping a Subscription unregisters the listener"]
pub struct Subscription {
    set: Weak<ListenerSet>,
    id: Option<u64>,
}

impl Subscription {
    pub(crate) fn new(set: Weak<ListenerSet>, id: Option<u64>) -> Self {
        Self { set, id }
    }

    /// Removes the listener. Idempotent.
    pub fn unsubscribe(&mut self) {
        if let Some(id) = self.id.take() {
            if let Some(set) = self.set.upgrade() {
                set.remove(id);
            }
        }
    }

    /// True while the listener is registered with a live coordinator.
    pub fn is_active(&self) -> bool {
        match (self.id, self.set.upgrade()) {
            (Some(id), Some(set)) => set.contains(id),
            _ => false,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn drop_unregisters() {
        let set = Arc::new(ListenerSet::new());
        let id = set.insert(Arc::new(|| {}));
        let sub = Subscription::new(Arc::downgrade(&set), id);
        assert!(sub.is_active());
        drop(sub);
        assert!(set.is_empty());
    }

    #[test]
    fn unsubscribe_after_set_is_gone_is_noop() {
        let set = Arc::new(ListenerSet::new());
        let id = set.insert(Arc::new(|| {}));
        let mut sub = Subscription::new(Arc::downgrade(&set), id);
        drop(set);
        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!sub.is_active());
    }
}
