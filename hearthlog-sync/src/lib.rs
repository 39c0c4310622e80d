//! # hearthlog-sync
//!
//! Keeps every view of the family journal in step with the backend.
//!
//! The pieces:
//!
//! - [`UpdateBus`]: a process-wide "something changed" signal. Views
//!   subscribe, mutations publish.
//! - [`Journal`]: wraps a [`Gateway`](hearthlog_gateway::Gateway) and
//!   publishes once after every successful mutation.
//! - [`ConnectionMonitor`]: tracks network and backend health, probing on
//!   demand and on an optional poll interval.
//! - [`ResilientLoader`]: loads an optional heavyweight component with a
//!   timeout, a retry ceiling and a manual fallback.
//! - [`LiveQuery`]: a table view that re-fetches whenever the bus fires.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hearthlog_gateway::MemoryGateway;
//! use hearthlog_sync::{Journal, LiveQuery, Session, UpdateBus};
//! use hearthlog_types::{EntityKind, NewEntity};
//!
//! #[tokio::main]
//! async fn main() {
//!     let journal = Journal::new(Arc::new(MemoryGateway::new()), UpdateBus::new());
//!     let entries = LiveQuery::spawn(journal.clone(), EntityKind::Entry, Session::signed_in("me"));
//!
//!     journal
//!         .create(NewEntity::new(EntityKind::Entry).field("title", "Picnic"))
//!         .await
//!         .unwrap();
//!
//!     println!("{} entries", entries.snapshot().rows.len());
//! }
//! ```

mod bus;
mod error;
mod journal;
mod loader;
mod monitor;
mod network;
mod relay;
mod session;
mod subscription;
mod view;

pub use bus::{PublishReport, UpdateBus};
pub use error::{LoadError, SyncError};
pub use journal::{Journal, ENTRY_ID_FIELD, LIKED_BY_FIELD};
pub use loader::{
    Component, ComponentSource, LoadState, LocationPicker, ResilientLoader, ResilientLoaderBuilder,
    DEFAULT_CEILING, DEFAULT_LOAD_TIMEOUT,
};
pub use monitor::{ConnectionMonitor, ConnectionMonitorBuilder, MonitorHandle, DEFAULT_PROBE_TIMEOUT};
pub use network::NetworkSignal;
pub use relay::spawn_change_relay;
pub use session::{Session, SessionState};
pub use subscription::Subscription;
pub use view::{LiveQuery, ViewSnapshot};

// Re-export types for convenience
pub use hearthlog_types::{Health, HealthNotice, HealthState, SyncSnapshot};
