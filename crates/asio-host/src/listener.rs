//! Consumers notified on every buffer switch.

use std::sync::{Arc, Weak};

/// Receives buffer-switch notifications on the driver's real-time thread.
///
/// Output buffers of the active half are already zeroed when this runs, so
/// implementations only write or accumulate. Implementations must not block,
/// allocate, or panic.
///
/// Unregister a listener before dropping its last `Arc`. The host only holds
/// a `Weak`, but a switch in flight upgrades it, and if the control thread
/// drops the last strong reference meanwhile, the listener's `Drop` and its
/// deallocation run on the driver's real-time thread.
pub trait BufferSwitchListener: Send + Sync {
    fn on_buffer_switch(&self, half: usize);
}

/// Weakly held listener set.
///
/// The host never keeps a listener alive. A listener dropped without being
/// removed is skipped on dispatch and pruned on the next membership change.
#[derive(Default)]
pub(crate) struct ListenerSet {
    entries: Vec<Weak<dyn BufferSwitchListener>>,
}

fn identity(listener: *const dyn BufferSwitchListener) -> *const () {
    listener.cast()
}

impl ListenerSet {
    /// Returns `false` if the listener was already registered.
    pub fn insert(&mut self, listener: &Arc<dyn BufferSwitchListener>) -> bool {
        self.prune();
        let id = identity(Arc::as_ptr(listener));
        if self.entries.iter().any(|w| identity(w.as_ptr()) == id) {
            return false;
        }
        self.entries.push(Arc::downgrade(listener));
        true
    }

    /// Returns `false` if the listener was not registered.
    pub fn remove(&mut self, listener: &Arc<dyn BufferSwitchListener>) -> bool {
        self.prune();
        let id = identity(Arc::as_ptr(listener));
        let before = self.entries.len();
        self.entries.retain(|w| identity(w.as_ptr()) != id);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Notifies every live listener. Order is unspecified.
    pub fn notify(&self, half: usize) {
        for entry in &self.entries {
            if let Some(listener) = entry.upgrade() {
                listener.on_buffer_switch(half);
            }
        }
    }

    fn prune(&mut self) {
        self.entries.retain(|w| w.strong_count() > 0);
    }
}
