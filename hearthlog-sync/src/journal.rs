//! The journal: gateway calls that keep every view in sync.

use std::sync::Arc;

use tracing::{debug, warn};

use hearthlog_gateway::{Gateway, GatewayError};
use hearthlog_types::{Entity, EntityId, EntityKind, Fields, NewEntity, SyncSnapshot};

use crate::bus::UpdateBus;
use crate::error::SyncError;
use crate::monitor::ConnectionMonitor;

/// Column on a like naming the family member who left it.
pub const LIKED_BY_FIELD: &str = "liked_by";

/// Column on photos, comments and likes naming their entry.
pub const ENTRY_ID_FIELD: &str = "entry_id";

/// Mutating facade over the gateway.
///
/// Every successful mutation publishes on the update bus exactly once.
/// Failed mutations never publish.
#[derive(Debug, Clone)]
pub struct Journal {
    gateway: Arc<dyn Gateway>,
    bus: UpdateBus,
    monitor: Option<ConnectionMonitor>,
}

impl Journal {
    pub fn new(gateway: Arc<dyn Gateway>, bus: UpdateBus) -> Self {
        Self {
            gateway,
            bus,
            monitor: None,
        }
    }

    /// Consult `monitor` before mutating, and nudge it on connectivity errors.
    pub fn with_monitor(mut self, monitor: ConnectionMonitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn bus(&self) -> &UpdateBus {
        &self.bus
    }

    pub fn gateway(&self) -> &Arc<dyn Gateway> {
        &self.gateway
    }

    pub fn monitor(&self) -> Option<&ConnectionMonitor> {
        self.monitor.as_ref()
    }

    pub async fn list(&self, kind: EntityKind) -> Result<Vec<Entity>, SyncError> {
        let result = self.gateway.list(kind).await;
        result.map_err(|err| self.gateway_failed("list", err))
    }

    pub async fn create(&self, new: NewEntity) -> Result<Entity, SyncError> {
        self.ensure_network()?;
        let result = self.gateway.create(new).await;
        self.finish("create", result)
    }

    pub async fn update(
        &self,
        kind: EntityKind,
        id: &EntityId,
        patch: Fields,
    ) -> Result<Entity, SyncError> {
        self.ensure_network()?;
        let result = self.gateway.update(kind, id, patch).await;
        self.finish("update", result)
    }

    pub async fn delete(&self, kind: EntityKind, id: &EntityId) -> Result<(), SyncError> {
        self.ensure_network()?;
        let result = self.gateway.delete(kind, id).await;
        self.finish("delete", result)
    }

    /// Leave a like on an entry.
    pub async fn like(&self, entry_id: &EntityId, liked_by: &str) -> Result<Entity, SyncError> {
        let like = NewEntity::new(EntityKind::Like)
            .field(ENTRY_ID_FIELD, entry_id.as_str())
            .field(LIKED_BY_FIELD, liked_by);
        self.create(like).await
    }

    /// Compute a fresh diagnostics snapshot.
    ///
    /// Tables that fail to list are left out. Nothing is listed while the
    /// monitor reports the network as down.
    pub async fn diagnostics(&self) -> SyncSnapshot {
        let health = self
            .monitor
            .as_ref()
            .map(ConnectionMonitor::current_health)
            .unwrap_or_default();

        let mut builder = SyncSnapshot::builder()
            .health(health.health)
            .listeners(self.bus.listener_count())
            .publishes(self.bus.publish_count());

        if !health.is_offline() {
            for kind in EntityKind::ALL {
                match self.gateway.list(kind).await {
                    Ok(rows) => builder = builder.rows(kind, rows.len() as u64),
                    Err(err) => warn!(table = kind.table(), %err, "could not count rows"),
                }
            }
        }
        builder.build()
    }

    fn ensure_network(&self) -> Result<(), SyncError> {
        match &self.monitor {
            Some(monitor) if !monitor.is_network_up() => Err(SyncError::NetworkUnavailable),
            _ => Ok(()),
        }
    }

    fn finish<T>(&self, op: &'static str, result: Result<T, GatewayError>) -> Result<T, SyncError> {
        match result {
            Ok(value) => {
                debug!(op, "mutation succeeded");
                self.bus.publish();
                Ok(value)
            }
            Err(err) => Err(self.gateway_failed(op, err)),
        }
    }

    fn gateway_failed(&self, op: &'static str, err: GatewayError) -> SyncError {
        warn!(op, %err, "gateway call failed");
        if err.is_connectivity() {
            if let Some(monitor) = self.monitor.clone() {
                tokio::spawn(async move {
                    monitor.retry_now().await;
                });
            }
        }
        SyncError::Gateway(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearthlog_gateway::{MemoryGateway, ProbeBehavior};
    use hearthlog_types::Health;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixture {
        gateway: MemoryGateway,
        journal: Journal,
        publishes: Arc<AtomicUsize>,
        _sub: crate::Subscription,
    }

    fn fixture() -> Fixture {
        let gateway = MemoryGateway::new();
        let bus = UpdateBus::new();
        let publishes = Arc::new(AtomicUsize::new(0));
        let sub = {
            let publishes = publishes.clone();
            bus.subscribe(move || {
                publishes.fetch_add(1, Ordering::SeqCst);
            })
        };
        let monitor = ConnectionMonitor::new(Arc::new(gateway.clone()));
        let journal = Journal::new(Arc::new(gateway.clone()), bus).with_monitor(monitor);
        Fixture {
            gateway,
            journal,
            publishes,
            _sub: sub,
        }
    }

    #[tokio::test]
    async fn each_successful_mutation_publishes_once() {
        let f = fixture();
        let entry = f
            .journal
            .create(NewEntity::new(EntityKind::Entry).field("title", "Beach"))
            .await
            .unwrap();
        assert_eq!(f.publishes.load(Ordering::SeqCst), 1);

        let mut patch = Fields::new();
        patch.insert("title".into(), "Beach day".into());
        f.journal
            .update(EntityKind::Entry, &entry.id, patch)
            .await
            .unwrap();
        f.journal.like(&entry.id, "dad").await.unwrap();
        f.journal.delete(EntityKind::Entry, &entry.id).await.unwrap();

        assert_eq!(f.publishes.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn reads_do_not_publish() {
        let f = fixture();
        f.journal.list(EntityKind::Photo).await.unwrap();
        assert_eq!(f.publishes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_mutations_do_not_publish() {
        let f = fixture();
        f.gateway.fail_next(GatewayError::Rejected("constraint".into()));

        let err = f
            .journal
            .create(NewEntity::new(EntityKind::Comment))
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Gateway(GatewayError::Rejected(_))));
        assert_eq!(f.publishes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn offline_mutations_fail_fast() {
        let f = fixture();
        if let Some(monitor) = f.journal.monitor() {
            monitor.network_changed(false).await;
        }

        let err = f
            .journal
            .create(NewEntity::new(EntityKind::Entry))
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::NetworkUnavailable));
        assert_eq!(f.gateway.calls().mutations(), 0);
        assert_eq!(f.publishes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn like_references_its_entry() {
        let f = fixture();
        let entry = f
            .journal
            .create(NewEntity::new(EntityKind::Entry))
            .await
            .unwrap();

        let like = f.journal.like(&entry.id, "mum").await.unwrap();
        assert_eq!(like.kind, EntityKind::Like);
        assert_eq!(like.text(ENTRY_ID_FIELD), Some(entry.id.as_str()));
        assert_eq!(like.text(LIKED_BY_FIELD), Some("mum"));
    }

    #[tokio::test(start_paused = true)]
    async fn connectivity_errors_trigger_a_probe() {
        let f = fixture();
        f.gateway.set_probe(ProbeBehavior::Report("down for maintenance".into()));
        f.gateway.fail_next(GatewayError::Timeout);

        assert!(f.journal.create(NewEntity::new(EntityKind::Entry)).await.is_err());

        let monitor = f.journal.monitor().cloned().unwrap();
        monitor
            .subscribe()
            .wait_for(|h| h.health == Health::Degraded)
            .await
            .unwrap();
        assert_eq!(f.gateway.calls().probe, 1);
    }

    #[tokio::test]
    async fn diagnostics_count_rows_per_table() {
        let f = fixture();
        let entry = f.gateway.seed(NewEntity::new(EntityKind::Entry));
        f.gateway
            .seed(NewEntity::new(EntityKind::Photo).field(ENTRY_ID_FIELD, entry.id.as_str()));
        f.gateway.fail_next(GatewayError::Timeout);

        let snapshot = f.journal.diagnostics().await;

        // the first table listed fails and is left out
        assert_eq!(snapshot.rows(EntityKind::Entry), None);
        assert_eq!(snapshot.rows(EntityKind::Photo), Some(1));
        assert_eq!(snapshot.rows(EntityKind::Like), Some(0));
        assert_eq!(snapshot.listener_count, 1);
    }
}
