//! The update bus: "something changed, go re-fetch".

use std::any::Any;
use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};
use tracing::{debug, warn};

use crate::error::SyncError;
use crate::subscription::Subscription;

thread_local! {
    /// Listener callbacks currently running on this thread.
    static CALLBACK_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Whether the current thread is inside a listener callback.
pub(crate) fn in_callback() -> bool {
    CALLBACK_DEPTH.with(|depth| depth.get() > 0)
}

/// A registered listener.
///
/// `gate` is held around every invocation. `active` is checked under it, so
/// a listener cleared before the gate is taken is never called. The gate is
/// reentrant so a callback may publish again.
pub(crate) struct ListenerEntry {
    pub(crate) id: u64,
    callback: Box<dyn Fn() + Send + Sync>,
    pub(crate) active: AtomicBool,
    pub(crate) gate: ReentrantMutex<()>,
}

#[derive(Default)]
pub(crate) struct Registry {
    listeners: Mutex<Vec<Arc<ListenerEntry>>>,
    next_id: AtomicU64,
    publishes: AtomicU64,
}

impl Registry {
    pub(crate) fn remove(&self, id: u64) {
        self.listeners.lock().retain(|entry| entry.id != id);
    }
}

/// What happened during one [`UpdateBus::publish`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Listeners that ran to completion.
    pub delivered: usize,
    /// Listeners that panicked.
    pub faulted: usize,
    /// Listeners unsubscribed after the publish started.
    pub skipped: usize,
}

/// Process-wide change notification.
///
/// Mutating code calls [`publish`](UpdateBus::publish) after every
/// successful write; views [`subscribe`](UpdateBus::subscribe) and re-fetch
/// whatever they display. Notifications carry no payload.
///
/// Clones share the same registry.
///
/// # Example
///
/// ```rust
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use hearthlog_sync::UpdateBus;
///
/// let bus = UpdateBus::new();
/// let refreshes = Arc::new(AtomicUsize::new(0));
///
/// let counter = refreshes.clone();
/// let subscription = bus.subscribe(move || {
///     counter.fetch_add(1, Ordering::SeqCst);
/// });
///
/// bus.publish();
/// subscription.unsubscribe();
/// bus.publish();
///
/// assert_eq!(refreshes.load(Ordering::SeqCst), 1);
/// ```
#[derive(Clone, Default)]
pub struct UpdateBus {
    registry: Arc<Registry>,
}

impl UpdateBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. The listener stays registered for as long as
    /// the returned [`Subscription`] is alive.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let entry = Arc::new(ListenerEntry {
            id: self.registry.next_id.fetch_add(1, Ordering::Relaxed),
            callback: Box::new(listener),
            active: AtomicBool::new(true),
            gate: ReentrantMutex::new(()),
        });
        self.registry.listeners.lock().push(entry.clone());
        Subscription::new(entry, Arc::downgrade(&self.registry))
    }

    /// Invoke every registered listener, in registration order, on the
    /// calling thread.
    ///
    /// Listeners subscribed while this runs are first called on the next
    /// publish. A panicking listener is logged and skipped over.
    pub fn publish(&self) -> PublishReport {
        let listeners: Vec<Arc<ListenerEntry>> = self.registry.listeners.lock().clone();
        self.registry.publishes.fetch_add(1, Ordering::Relaxed);

        let mut report = PublishReport::default();
        for entry in listeners {
            let _gate = entry.gate.lock();
            if !entry.active.load(Ordering::SeqCst) {
                report.skipped += 1;
                continue;
            }
            CALLBACK_DEPTH.with(|depth| depth.set(depth.get() + 1));
            let outcome = catch_unwind(AssertUnwindSafe(|| (entry.callback)()));
            CALLBACK_DEPTH.with(|depth| depth.set(depth.get() - 1));
            match outcome {
                Ok(()) => report.delivered += 1,
                Err(payload) => {
                    report.faulted += 1;
                    let fault = SyncError::ListenerFault {
                        id: entry.id,
                        message: panic_message(payload.as_ref()),
                    };
                    warn!(listener = entry.id, "{}", fault);
                }
            }
        }

        debug!(
            delivered = report.delivered,
            faulted = report.faulted,
            skipped = report.skipped,
            "published update"
        );
        report
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        self.registry.listeners.lock().len()
    }

    /// Number of publishes since the bus was created.
    pub fn publish_count(&self) -> u64 {
        self.registry.publishes.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for UpdateBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateBus")
            .field("listeners", &self.listener_count())
            .field("publishes", &self.publish_count())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
