//! # hearthlog-gateway
//!
//! The boundary between the journal and its remote store.
//!
//! Everything the journal persists goes through the [`Gateway`] trait:
//! plain CRUD over the journal's tables plus a lightweight connectivity
//! probe. The store itself is opaque; callers treat it as a remote source
//! of truth with network latency and transient failures.
//!
//! ## Backends
//!
//! - [`MemoryGateway`] - in-process tables with scriptable failures, used by
//!   tests and by the offline demo
//! - **REST** (`rest` feature) - a PostgREST-style HTTP backend
//!
//! ## Quick Start
//!
//! ```rust
//! use hearthlog_gateway::{Gateway, MemoryGateway};
//! use hearthlog_types::{EntityKind, NewEntity};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = MemoryGateway::new();
//!
//!     let entry = gateway
//!         .create(NewEntity::new(EntityKind::Entry).field("title", "Harvest day"))
//!         .await?;
//!
//!     let entries = gateway.list(EntityKind::Entry).await?;
//!     assert_eq!(entries[0].id, entry.id);
//!
//!     let probe = gateway.probe_connectivity().await;
//!     assert!(probe.success);
//!     Ok(())
//! }
//! ```

use std::fmt::Debug;

use async_trait::async_trait;
use tokio::sync::broadcast;

pub mod error;
pub mod memory;

#[cfg(feature = "rest")]
pub mod rest;

pub use error::GatewayError;
pub use memory::{MemoryGateway, ProbeBehavior};

// Re-export types for convenience
pub use hearthlog_types::{Entity, EntityId, EntityKind, FieldValue, Fields, NewEntity};

/// Result of a connectivity probe.
///
/// A probe never errors: transport failures are folded into
/// `success: false` with the failure text as the message.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProbeOutcome {
    pub success: bool,
    pub message: String,
}

impl ProbeOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: String::new(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// A change made to the store by someone else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteChange {
    pub kind: EntityKind,
    pub id: Option<EntityId>,
}

/// The remote store.
#[async_trait]
pub trait Gateway: Send + Sync + Debug {
    /// All rows of a table.
    async fn list(&self, kind: EntityKind) -> Result<Vec<Entity>, GatewayError>;

    /// Insert a row; the store assigns its id.
    async fn create(&self, new: NewEntity) -> Result<Entity, GatewayError>;

    /// Merge `patch` into an existing row and return the result.
    async fn update(
        &self,
        kind: EntityKind,
        id: &EntityId,
        patch: Fields,
    ) -> Result<Entity, GatewayError>;

    /// Remove a row.
    async fn delete(&self, kind: EntityKind, id: &EntityId) -> Result<(), GatewayError>;

    /// One cheap request/response round trip.
    async fn probe_connectivity(&self) -> ProbeOutcome;

    /// Out-of-band notifications of changes made elsewhere, if the backend
    /// has them.
    fn change_feed(&self) -> Option<broadcast::Receiver<RemoteChange>> {
        None
    }
}
