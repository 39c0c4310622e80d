//! Wiring: everything the views talk to, built from [`Settings`].

use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinHandle;
use tracing::info;

use hearthlog_gateway::{Gateway, MemoryGateway};
use hearthlog_sync::{
    spawn_change_relay, ConnectionMonitor, Journal, MonitorHandle, Session, UpdateBus,
    ENTRY_ID_FIELD, LIKED_BY_FIELD,
};
use hearthlog_types::{now_ms, Coordinates, EntityKind, NewEntity};

use crate::data::entries::{AUTHOR_FIELD, CREATED_AT_FIELD, TITLE_FIELD};
use crate::map::{BasemapSource, MapLoader};
use crate::network::NetworkWatcher;
use crate::settings::{GatewayKind, Settings};

/// Shared handles, plus the background tasks that keep them current.
pub struct Services {
    pub journal: Journal,
    pub session: Session,
    pub monitor: ConnectionMonitor,
    pub network: NetworkWatcher,
    pub map: MapLoader,
    monitor_handle: Option<MonitorHandle>,
    tasks: Vec<JoinHandle<()>>,
}

impl Services {
    /// Build and start everything. Must be called inside a tokio runtime.
    pub fn start(settings: &Settings) -> Result<Self> {
        let gateway = build_gateway(settings)?;
        let bus = UpdateBus::new();

        let network = NetworkWatcher::new(
            settings.network.check_addr.clone(),
            settings.network.check_interval,
        );
        let monitor = ConnectionMonitor::builder(gateway.clone())
            .probe_timeout(settings.monitor.probe_timeout)
            .poll_interval(settings.monitor.poll_interval)
            .build();
        let monitor_handle = monitor.start(network.signal().subscribe());

        let mut tasks = vec![network.spawn()];
        tasks.extend(spawn_change_relay(gateway.as_ref(), bus.clone()));

        let session = match &settings.session.user {
            Some(user) => Session::signed_in(user.clone()),
            None => Session::new(),
        };

        let map = MapLoader::builder(BasemapSource::from_setting(&settings.map.basemap))
            .timeout(settings.map.load_timeout)
            .ceiling(settings.map.ceiling)
            .build();

        Ok(Self {
            journal: Journal::new(gateway, bus).with_monitor(monitor.clone()),
            session,
            monitor,
            network,
            map,
            monitor_handle: Some(monitor_handle),
            tasks,
        })
    }

    /// Assemble services around an existing gateway without starting any
    /// background work.
    pub fn detached(gateway: Arc<dyn Gateway>, session: Session, map: MapLoader) -> Self {
        let monitor = ConnectionMonitor::new(gateway.clone());
        Self {
            journal: Journal::new(gateway, UpdateBus::new()).with_monitor(monitor.clone()),
            session,
            monitor,
            network: NetworkWatcher::new("127.0.0.1:9", std::time::Duration::from_secs(60)),
            map,
            monitor_handle: None,
            tasks: Vec::new(),
        }
    }

    /// Stop the monitor, watcher and relay.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.monitor_handle.take() {
            handle.stop();
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for Services {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn build_gateway(settings: &Settings) -> Result<Arc<dyn Gateway>> {
    match settings.gateway.kind {
        GatewayKind::Memory => {
            info!("using in-memory demo journal");
            Ok(Arc::new(demo_gateway()))
        }
        GatewayKind::Rest => rest_gateway(settings),
    }
}

#[cfg(feature = "rest")]
fn rest_gateway(settings: &Settings) -> Result<Arc<dyn Gateway>> {
    let mut builder =
        hearthlog_gateway::rest::RestGateway::builder().timeout(settings.gateway.request_timeout);
    if let Some(endpoint) = &settings.gateway.endpoint {
        builder = builder.endpoint(endpoint.clone());
    }
    if let Some(key) = &settings.gateway.api_key {
        builder = builder.api_key(key.clone());
    }
    let gateway = builder.build()?;
    info!(endpoint = ?settings.gateway.endpoint, "using rest journal");
    Ok(Arc::new(gateway))
}

#[cfg(not(feature = "rest"))]
fn rest_gateway(_settings: &Settings) -> Result<Arc<dyn Gateway>> {
    anyhow::bail!("gateway.kind = \"rest\" needs the `rest` feature")
}

/// An in-memory journal with a few entries to look at.
pub fn demo_gateway() -> MemoryGateway {
    let gateway = MemoryGateway::new();
    let now = now_ms() as i64;
    let day = 86_400_000;

    let seeded = [
        ("Beach day", "mum", 3 * day, Coordinates::new(50.72, -1.88)),
        ("First snow", "kid", 2 * day, Coordinates::new(46.2, 6.14)),
        ("Grandad's birthday", "dad", day, Coordinates::new(53.48, -2.24)),
    ];

    for (title, author, age, at) in seeded {
        let mut draft = NewEntity::new(EntityKind::Entry)
            .field(TITLE_FIELD, title)
            .field(AUTHOR_FIELD, author)
            .field(CREATED_AT_FIELD, now - age);
        if let Ok(at) = at {
            draft = draft.located_at(at);
        }
        let entry = gateway.seed(draft);

        gateway.seed(NewEntity::new(EntityKind::Photo).field(ENTRY_ID_FIELD, entry.id.as_str()));
        gateway.seed(
            NewEntity::new(EntityKind::Like)
                .field(ENTRY_ID_FIELD, entry.id.as_str())
                .field(LIKED_BY_FIELD, "gran"),
        );
    }
    gateway
}
