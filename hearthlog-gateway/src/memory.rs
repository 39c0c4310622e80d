//! In-process gateway.
//!
//! Rows live in memory and are lost on exit. Every failure mode of a real
//! backend can be scripted: probe results, queued call failures, latency,
//! and changes that appear to come from another device.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use hearthlog_types::{Entity, EntityId, EntityKind, FieldValue, Fields, NewEntity};

use crate::{Gateway, GatewayError, ProbeOutcome, RemoteChange};

/// Column that links photos, comments and likes to their entry.
pub const ENTRY_REF_FIELD: &str = "entry_id";

const CHANGE_FEED_CAPACITY: usize = 64;

/// How [`MemoryGateway::probe_connectivity`] answers.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ProbeBehavior {
    /// Report success.
    #[default]
    Succeed,
    /// Reachable, but the backend reports an error with this message.
    Report(String),
    /// The probe request itself fails.
    Fail(GatewayError),
    /// Never answer.
    Hang,
}

/// Number of calls made per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list: u64,
    pub create: u64,
    pub update: u64,
    pub delete: u64,
    pub probe: u64,
}

impl CallCounts {
    /// Calls that would have changed the store.
    pub fn mutations(&self) -> u64 {
        self.create + self.update + self.delete
    }
}

#[derive(Debug)]
struct Inner {
    tables: Mutex<BTreeMap<EntityKind, Vec<Entity>>>,
    next_id: AtomicU64,
    probe: Mutex<ProbeBehavior>,
    failures: Mutex<VecDeque<GatewayError>>,
    latency: Mutex<Option<Duration>>,
    calls: Mutex<CallCounts>,
    changes: broadcast::Sender<RemoteChange>,
}

/// A [`Gateway`] backed by in-memory tables.
///
/// Clones share the same tables.
#[derive(Debug, Clone)]
pub struct MemoryGateway {
    inner: Arc<Inner>,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    /// An empty store whose probe succeeds.
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                tables: Mutex::new(BTreeMap::new()),
                next_id: AtomicU64::new(1),
                probe: Mutex::new(ProbeBehavior::Succeed),
                failures: Mutex::new(VecDeque::new()),
                latency: Mutex::new(None),
                calls: Mutex::new(CallCounts::default()),
                changes,
            }),
        }
    }

    /// Set how the next probes answer.
    pub fn set_probe(&self, behavior: ProbeBehavior) {
        *self.inner.probe.lock() = behavior;
    }

    /// Fail the next CRUD call with `err`. Queued failures are consumed in order.
    pub fn fail_next(&self, err: GatewayError) {
        self.inner.failures.lock().push_back(err);
    }

    /// Delay every call, probes included.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.inner.latency.lock() = latency;
    }

    /// Calls made so far.
    pub fn calls(&self) -> CallCounts {
        *self.inner.calls.lock()
    }

    /// Insert a row directly, without counting a call or notifying anyone.
    pub fn seed(&self, new: NewEntity) -> Entity {
        let entity = new.into_entity(self.allocate_id());
        self.inner
            .tables
            .lock()
            .entry(entity.kind)
            .or_default()
            .push(entity.clone());
        entity
    }

    /// Insert a row as if another device had written it, and announce it
    /// on the change feed.
    pub fn insert_remote(&self, new: NewEntity) -> Entity {
        let entity = self.seed(new);
        // No receivers is fine; nobody is listening yet.
        let _ = self.inner.changes.send(RemoteChange {
            kind: entity.kind,
            id: Some(entity.id.clone()),
        });
        entity
    }

    /// Number of rows currently stored in a table.
    pub fn row_count(&self, kind: EntityKind) -> usize {
        self.inner.tables.lock().get(&kind).map_or(0, Vec::len)
    }

    fn allocate_id(&self) -> EntityId {
        EntityId::new(self.inner.next_id.fetch_add(1, Ordering::Relaxed).to_string())
    }

    async fn simulate_latency(&self) {
        let latency = *self.inner.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    async fn enter(&self, bump: impl FnOnce(&mut CallCounts)) -> Result<(), GatewayError> {
        bump(&mut *self.inner.calls.lock());
        self.simulate_latency().await;
        match self.inner.failures.lock().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn check_entry_ref(
        tables: &BTreeMap<EntityKind, Vec<Entity>>,
        new: &NewEntity,
    ) -> Result<(), GatewayError> {
        if new.kind == EntityKind::Entry {
            return Ok(());
        }
        let Some(entry_id) = new.fields.get(ENTRY_REF_FIELD) else {
            return Ok(());
        };
        let exists = tables
            .get(&EntityKind::Entry)
            .is_some_and(|rows| rows.iter().any(|e| field_matches(entry_id, &e.id)));
        if exists {
            Ok(())
        } else {
            Err(GatewayError::Rejected(format!(
                "{}.{} = {} does not reference an entry",
                new.kind, ENTRY_REF_FIELD, entry_id
            )))
        }
    }
}

fn field_matches(value: &FieldValue, id: &EntityId) -> bool {
    match value {
        FieldValue::Text(s) => s == id.as_str(),
        FieldValue::Int(i) => i.to_string() == id.as_str(),
        _ => false,
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn list(&self, kind: EntityKind) -> Result<Vec<Entity>, GatewayError> {
        self.enter(|c| c.list += 1).await?;
        Ok(self
            .inner
            .tables
            .lock()
            .get(&kind)
            .cloned()
            .unwrap_or_default())
    }

    async fn create(&self, new: NewEntity) -> Result<Entity, GatewayError> {
        self.enter(|c| c.create += 1).await?;
        let mut tables = self.inner.tables.lock();
        Self::check_entry_ref(&tables, &new)?;
        let entity = new.into_entity(self.allocate_id());
        tables.entry(entity.kind).or_default().push(entity.clone());
        Ok(entity)
    }

    async fn update(
        &self,
        kind: EntityKind,
        id: &EntityId,
        patch: Fields,
    ) -> Result<Entity, GatewayError> {
        self.enter(|c| c.update += 1).await?;
        let mut tables = self.inner.tables.lock();
        let row = tables
            .get_mut(&kind)
            .and_then(|rows| rows.iter_mut().find(|e| &e.id == id))
            .ok_or_else(|| GatewayError::NotFound {
                kind,
                id: id.clone(),
            })?;
        row.apply(&patch);
        Ok(row.clone())
    }

    async fn delete(&self, kind: EntityKind, id: &EntityId) -> Result<(), GatewayError> {
        self.enter(|c| c.delete += 1).await?;
        let mut tables = self.inner.tables.lock();
        let rows = tables.entry(kind).or_default();
        let before = rows.len();
        rows.retain(|e| &e.id != id);
        if rows.len() == before {
            return Err(GatewayError::NotFound {
                kind,
                id: id.clone(),
            });
        }
        Ok(())
    }

    async fn probe_connectivity(&self) -> ProbeOutcome {
        self.inner.calls.lock().probe += 1;
        self.simulate_latency().await;
        let behavior = self.inner.probe.lock().clone();
        match behavior {
            ProbeBehavior::Succeed => ProbeOutcome::ok(),
            ProbeBehavior::Report(message) => ProbeOutcome::failed(message),
            ProbeBehavior::Fail(err) => ProbeOutcome::failed(err.to_string()),
            ProbeBehavior::Hang => std::future::pending().await,
        }
    }

    fn change_feed(&self) -> Option<broadcast::Receiver<RemoteChange>> {
        Some(self.inner.changes.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str) -> NewEntity {
        NewEntity::new(EntityKind::Entry).field("title", title)
    }

    #[tokio::test]
    async fn crud_round_trip() {
        let gw = MemoryGateway::new();

        let a = gw.create(entry("a")).await.unwrap();
        let b = gw.create(entry("b")).await.unwrap();
        assert_ne!(a.id, b.id);

        let mut patch = Fields::new();
        patch.insert("title".to_string(), "a2".into());
        let a2 = gw.update(EntityKind::Entry, &a.id, patch).await.unwrap();
        assert_eq!(a2.text("title"), Some("a2"));

        gw.delete(EntityKind::Entry, &b.id).await.unwrap();
        let rows = gw.list(EntityKind::Entry).await.unwrap();
        assert_eq!(rows, vec![a2]);

        let counts = gw.calls();
        assert_eq!(counts.mutations(), 4);
        assert_eq!(counts.list, 1);
    }

    #[tokio::test]
    async fn missing_rows_are_not_found() {
        let gw = MemoryGateway::new();
        let id = EntityId::new("404");

        let err = gw.delete(EntityKind::Comment, &id).await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound { kind: EntityKind::Comment, .. }));

        let err = gw
            .update(EntityKind::Entry, &id, Fields::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotFound { .. }));
    }

    #[tokio::test]
    async fn queued_failures_apply_in_order() {
        let gw = MemoryGateway::new();
        gw.fail_next(GatewayError::Timeout);
        gw.fail_next(GatewayError::Auth("expired".into()));

        assert_eq!(gw.list(EntityKind::Entry).await, Err(GatewayError::Timeout));
        assert!(matches!(
            gw.create(entry("x")).await,
            Err(GatewayError::Auth(_))
        ));
        assert!(gw.create(entry("x")).await.is_ok());
        assert_eq!(gw.row_count(EntityKind::Entry), 1);
    }

    #[tokio::test]
    async fn likes_must_reference_an_entry() {
        let gw = MemoryGateway::new();
        let e = gw.seed(entry("walk"));

        let like = NewEntity::new(EntityKind::Like).field(ENTRY_REF_FIELD, e.id.as_str());
        assert!(gw.create(like).await.is_ok());

        let dangling = NewEntity::new(EntityKind::Like).field(ENTRY_REF_FIELD, "999");
        assert!(matches!(
            gw.create(dangling).await,
            Err(GatewayError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn probe_follows_behavior() {
        let gw = MemoryGateway::new();
        assert!(gw.probe_connectivity().await.success);

        gw.set_probe(ProbeBehavior::Report("x".into()));
        assert_eq!(gw.probe_connectivity().await, ProbeOutcome::failed("x"));

        gw.set_probe(ProbeBehavior::Fail(GatewayError::Timeout));
        let outcome = gw.probe_connectivity().await;
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Request timed out");
        assert_eq!(gw.calls().probe, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_probe_never_answers() {
        let gw = MemoryGateway::new();
        gw.set_probe(ProbeBehavior::Hang);

        let res =
            tokio::time::timeout(Duration::from_secs(60), gw.probe_connectivity()).await;
        assert!(res.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn latency_delays_calls() {
        let gw = MemoryGateway::new();
        gw.set_latency(Some(Duration::from_millis(300)));

        let start = tokio::time::Instant::now();
        gw.list(EntityKind::Photo).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn remote_inserts_hit_the_change_feed() {
        let gw = MemoryGateway::new();
        let mut feed = gw.change_feed().unwrap();

        let row = gw.insert_remote(entry("from the other phone"));
        let change = feed.recv().await.unwrap();
        assert_eq!(change.kind, EntityKind::Entry);
        assert_eq!(change.id, Some(row.id));
        assert_eq!(gw.calls(), CallCounts::default());
    }
}
