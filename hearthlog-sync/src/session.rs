//! Minimal session state gating data loads.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

/// Who is signed in, if anyone.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    SignedOut,
    SignedIn { user: String },
}

/// The current session, shared between views.
#[derive(Debug, Clone)]
pub struct Session {
    tx: Arc<watch::Sender<SessionState>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A signed-out session.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(SessionState::SignedOut);
        Self { tx: Arc::new(tx) }
    }

    /// A session that starts signed in.
    pub fn signed_in(user: impl Into<String>) -> Self {
        let session = Self::new();
        session.sign_in(user);
        session
    }

    pub fn sign_in(&self, user: impl Into<String>) {
        let user = user.into();
        info!(%user, "signed in");
        self.tx.send_replace(SessionState::SignedIn { user });
    }

    pub fn sign_out(&self) {
        if self.is_signed_in() {
            info!("signed out");
        }
        self.tx.send_replace(SessionState::SignedOut);
    }

    pub fn current(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(*self.tx.borrow(), SessionState::SignedIn { .. })
    }

    pub fn user(&self) -> Option<String> {
        match &*self.tx.borrow() {
            SessionState::SignedIn { user } => Some(user.clone()),
            SessionState::SignedOut => None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }
}
