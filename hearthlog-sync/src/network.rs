//! Local network presence signal.

use std::sync::Arc;

use tokio::sync::watch;

/// Whether the local network is up, as a watchable value.
///
/// Whatever observes the environment calls [`set_up`](NetworkSignal::set_up);
/// the connection monitor watches it through [`subscribe`](NetworkSignal::subscribe).
#[derive(Debug, Clone)]
pub struct NetworkSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl NetworkSignal {
    pub fn new(up: bool) -> Self {
        let (tx, _) = watch::channel(up);
        Self { tx: Arc::new(tx) }
    }

    /// Record the current state. Returns `true` if it changed.
    pub fn set_up(&self, up: bool) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == up {
                false
            } else {
                *current = up;
                true
            }
        })
    }

    pub fn is_up(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for NetworkSignal {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn only_transitions_notify() {
        let signal = NetworkSignal::new(true);
        let mut rx = signal.subscribe();

        assert!(!signal.set_up(true));
        assert!(!rx.has_changed().unwrap());

        assert!(signal.set_up(false));
        rx.changed().await.unwrap();
        assert!(!*rx.borrow_and_update());
        assert!(!signal.is_up());
    }
}
