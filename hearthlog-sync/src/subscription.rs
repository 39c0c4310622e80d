//! Subscription handle returned by the update bus.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};

use crate::bus::{in_callback, ListenerEntry, Registry};

/// Keeps a listener registered on an [`UpdateBus`](crate::UpdateBus).
///
/// Dropping the handle unsubscribes. Hold it for as long as the view that
/// registered the listener is alive.
#[must_use = "dropping a Subscription unsubscribes its listener"]
pub struct Subscription {
    entry: Arc<ListenerEntry>,
    registry: Weak<Registry>,
}

impl Subscription {
    pub(crate) fn new(entry: Arc<ListenerEntry>, registry: Weak<Registry>) -> Self {
        Self { entry, registry }
    }

    /// Remove exactly this registration.
    ///
    /// Calling it again is a no-op. The listener is never called once this
    /// returns.
    ///
    /// Outside of a listener callback it also waits for a call already
    /// running on another thread to finish. From inside a callback it does
    /// not wait, so two listeners on different threads can unsubscribe each
    /// other without blocking; the other listener may still be finishing
    /// its current call.
    pub fn unsubscribe(&self) {
        if !self.entry.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.entry.id);
        }
        if !in_callback() {
            drop(self.entry.gate.lock());
        }
    }

    /// Whether the listener is still registered.
    pub fn is_active(&self) -> bool {
        self.entry.active.load(Ordering::SeqCst)
    }

    /// Registration id, unique per bus.
    pub fn id(&self) -> u64 {
        self.entry.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.entry.id)
            .field("active", &self.is_active())
            .finish()
    }
}
