//! View controllers that re-query whenever the bus publishes.

use std::sync::Arc;

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use hearthlog_types::{now_ms, Entity, EntityKind};

use crate::journal::Journal;
use crate::session::Session;
use crate::subscription::Subscription;

/// What a live query currently shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewSnapshot {
    pub rows: Vec<Entity>,
    /// Last refresh error; rows from the previous success are kept.
    pub error: Option<String>,
    /// Completed refreshes, successful or not.
    pub refreshes: u64,
    pub refreshed_at_ms: Option<u64>,
}

/// Keeps the rows of one table fresh.
///
/// Re-fetches after every publish on the journal's bus. Publishes that
/// arrive while a fetch is running collapse into one more fetch. Nothing
/// is fetched while signed out. Dropping the query unsubscribes and stops
/// its task.
pub struct LiveQuery {
    kind: EntityKind,
    rx: watch::Receiver<ViewSnapshot>,
    notify: Arc<Notify>,
    task: JoinHandle<()>,
    _subscription: Subscription,
}

impl LiveQuery {
    pub fn spawn(journal: Journal, kind: EntityKind, session: Session) -> Self {
        let notify = Arc::new(Notify::new());
        let subscription = {
            let notify = notify.clone();
            journal.bus().subscribe(move || notify.notify_one())
        };
        let (tx, rx) = watch::channel(ViewSnapshot::default());
        let task = tokio::spawn(run(journal, kind, session, notify.clone(), tx));

        Self {
            kind,
            rx,
            notify,
            task,
            _subscription: subscription,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        self.rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewSnapshot> {
        self.rx.clone()
    }

    /// Re-fetch without waiting for a publish.
    pub fn refresh(&self) {
        self.notify.notify_one();
    }
}

impl Drop for LiveQuery {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl std::fmt::Debug for LiveQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveQuery")
            .field("kind", &self.kind)
            .field("rows", &self.rx.borrow().rows.len())
            .finish()
    }
}

async fn run(
    journal: Journal,
    kind: EntityKind,
    session: Session,
    notify: Arc<Notify>,
    tx: watch::Sender<ViewSnapshot>,
) {
    let mut session_rx = session.subscribe();
    loop {
        if session.is_signed_in() {
            fetch(&journal, kind, &tx).await;
        } else {
            tx.send_if_modified(|view| {
                let had_rows = !view.rows.is_empty();
                view.rows.clear();
                view.error = None;
                had_rows
            });
        }

        tokio::select! {
            _ = notify.notified() => {}
            changed = session_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                session_rx.borrow_and_update();
            }
        }
    }
}

async fn fetch(journal: &Journal, kind: EntityKind, tx: &watch::Sender<ViewSnapshot>) {
    match journal.list(kind).await {
        Ok(rows) => {
            debug!(table = kind.table(), rows = rows.len(), "view refreshed");
            tx.send_modify(|view| {
                view.rows = rows;
                view.error = None;
                view.refreshes += 1;
                view.refreshed_at_ms = Some(now_ms());
            });
        }
        Err(err) => {
            warn!(table = kind.table(), %err, "view refresh failed");
            tx.send_modify(|view| {
                view.error = Some(err.to_string());
                view.refreshes += 1;
            });
        }
    }
}
