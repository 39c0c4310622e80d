//! # hearthlog-types
//!
//! Core types shared by every hearthlog crate: the journal's entities as
//! they travel to and from the remote store, the connection health signal,
//! and the read-only sync diagnostics snapshot.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: Core types work without any serialization framework
//! - **Optional serialization**: Enable the `serde` feature to export snapshots as JSON
//! - **Backend agnostic**: Entities are plain field maps, so any table-shaped store fits
//!
//! ## Features
//!
//! - `std` (default): Standard library support (timestamps, `std::error::Error`)
//! - `serde`: JSON/etc. serialization via serde
//!
//! ## Example
//!
//! ```rust
//! use hearthlog_types::{EntityKind, FieldValue, NewEntity, SyncSnapshot};
//!
//! let draft = NewEntity::new(EntityKind::Entry)
//!     .field("title", "First snow")
//!     .field("latitude", 46.2)
//!     .field("longitude", 6.1);
//!
//! assert_eq!(draft.fields.get("title"), Some(&FieldValue::from("First snow")));
//!
//! let snapshot = SyncSnapshot::builder()
//!     .connected(true)
//!     .listeners(3)
//!     .rows(EntityKind::Entry, 12)
//!     .build();
//!
//! assert_eq!(snapshot.total_rows(), 12);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod entity;
mod health;
mod location;
mod snapshot;

pub use entity::*;
pub use health::*;
pub use location::*;
pub use snapshot::*;

/// Get current timestamp in milliseconds since Unix epoch.
#[cfg(feature = "std")]
pub fn now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
