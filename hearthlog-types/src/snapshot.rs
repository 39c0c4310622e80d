//! SyncSnapshot - a read-only, point-in-time view of sync health.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};

use crate::{EntityKind, Health};

/// A diagnostic aggregate of the sync layer's state.
///
/// Snapshots are recomputed on demand for the sync diagnostics view and
/// are never persisted or treated as authoritative.
///
/// # Example
///
/// ```rust
/// use hearthlog_types::{EntityKind, Health, SyncSnapshot};
///
/// let snapshot = SyncSnapshot::builder()
///     .health(Health::Online)
///     .listeners(4)
///     .rows(EntityKind::Entry, 120)
///     .rows(EntityKind::Photo, 300)
///     .build();
///
/// assert!(snapshot.is_connected);
/// assert_eq!(snapshot.total_rows(), 420);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SyncSnapshot {
    /// Whether the last probe reached the backend.
    pub is_connected: bool,

    /// Health at the time of the snapshot.
    pub health: Health,

    /// Number of live update bus listeners.
    pub listener_count: usize,

    /// How many times the update bus has published.
    pub publishes: u64,

    /// Row count per table. Tables that could not be listed are absent.
    pub row_counts: BTreeMap<String, u64>,

    /// Unix timestamp in milliseconds when this snapshot was taken.
    pub checked_at_ms: u64,
}

impl SyncSnapshot {
    /// Create a builder for constructing snapshots.
    pub fn builder() -> SyncSnapshotBuilder {
        SyncSnapshotBuilder::new()
    }

    /// Row count for a table, if it was listed.
    pub fn rows(&self, kind: EntityKind) -> Option<u64> {
        self.row_counts.get(kind.table()).copied()
    }

    /// Total rows across every listed table.
    pub fn total_rows(&self) -> u64 {
        self.row_counts.values().sum()
    }

    /// Tables that are missing from the counts.
    pub fn missing_tables(&self) -> impl Iterator<Item = EntityKind> + '_ {
        EntityKind::ALL
            .into_iter()
            .filter(|k| !self.row_counts.contains_key(k.table()))
    }
}

/// Builder for constructing `SyncSnapshot` instances.
#[derive(Debug, Default)]
pub struct SyncSnapshotBuilder {
    health: Option<Health>,
    connected: Option<bool>,
    listener_count: usize,
    publishes: u64,
    row_counts: BTreeMap<String, u64>,
    checked_at_ms: Option<u64>,
}

impl SyncSnapshotBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the health; also implies `is_connected` unless set explicitly.
    pub fn health(mut self, health: Health) -> Self {
        self.health = Some(health);
        self
    }

    /// Override the connected flag.
    pub fn connected(mut self, connected: bool) -> Self {
        self.connected = Some(connected);
        self
    }

    pub fn listeners(mut self, count: usize) -> Self {
        self.listener_count = count;
        self
    }

    pub fn publishes(mut self, count: u64) -> Self {
        self.publishes = count;
        self
    }

    /// Record the row count of a table.
    pub fn rows(mut self, kind: EntityKind, count: u64) -> Self {
        self.row_counts.insert(kind.table().to_string(), count);
        self
    }

    /// Set a specific timestamp (milliseconds since Unix epoch).
    pub fn checked_at_ms(mut self, ts: u64) -> Self {
        self.checked_at_ms = Some(ts);
        self
    }

    /// Build the snapshot.
    pub fn build(self) -> SyncSnapshot {
        let health = self.health.unwrap_or_else(|| match self.connected {
            Some(true) => Health::Online,
            _ => Health::Unknown,
        });

        SyncSnapshot {
            is_connected: self.connected.unwrap_or(health == Health::Online),
            health,
            listener_count: self.listener_count,
            publishes: self.publishes,
            row_counts: self.row_counts,
            #[cfg(feature = "std")]
            checked_at_ms: self.checked_at_ms.unwrap_or_else(crate::now_ms),
            #[cfg(not(feature = "std"))]
            checked_at_ms: self.checked_at_ms.unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_builder() {
        let snapshot = SyncSnapshot::builder()
            .checked_at_ms(1703160000000)
            .health(Health::Degraded)
            .listeners(2)
            .publishes(9)
            .rows(EntityKind::Entry, 10)
            .rows(EntityKind::Like, 3)
            .build();

        assert!(!snapshot.is_connected);
        assert_eq!(snapshot.checked_at_ms, 1703160000000);
        assert_eq!(snapshot.rows(EntityKind::Entry), Some(10));
        assert_eq!(snapshot.rows(EntityKind::Photo), None);
        assert_eq!(snapshot.total_rows(), 13);
        assert_eq!(
            snapshot.missing_tables().collect::<alloc::vec::Vec<_>>(),
            [EntityKind::Photo, EntityKind::Comment]
        );
    }

    #[test]
    fn connected_flag_defaults_from_health() {
        assert!(SyncSnapshot::builder().health(Health::Online).build().is_connected);
        assert!(!SyncSnapshot::builder().health(Health::Offline).build().is_connected);
        assert_eq!(
            SyncSnapshot::builder().connected(true).build().health,
            Health::Online
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_roundtrip() {
        let snapshot = SyncSnapshot::builder()
            .checked_at_ms(1703160000000)
            .health(Health::Online)
            .rows(EntityKind::Photo, 5)
            .build();

        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: SyncSnapshot = serde_json::from_str(&json).unwrap();

        assert_eq!(snapshot, parsed);
    }
}
