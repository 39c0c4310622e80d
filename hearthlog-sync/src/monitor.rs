//! The connection monitor.
//!
//! Combines the local network signal with gateway probes into a single
//! [`HealthState`]:
//!
//! - network down → `Offline`, immediately, whatever a probe says
//! - network up, probe succeeded → `Online`
//! - network up, probe failed, errored or timed out → `Degraded`
//!
//! Probes run on startup, on every network transition, on
//! [`retry_now`](ConnectionMonitor::retry_now) and optionally on a timer.
//! At most one probe is in flight at a time.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use hearthlog_gateway::Gateway;
use hearthlog_types::{now_ms, HealthState};

/// Default bound on a single probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

struct Inner {
    gateway: Arc<dyn Gateway>,
    health: watch::Sender<HealthState>,
    network_up: AtomicBool,
    /// Bumped on every network transition; a probe started under an older
    /// epoch is stale.
    network_epoch: AtomicU64,
    probe_gate: Mutex<()>,
    probe_timeout: Duration,
    poll_interval: Option<Duration>,
}

/// Shared connection health.
///
/// Clones share the same state.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use hearthlog_gateway::{MemoryGateway, ProbeBehavior};
/// use hearthlog_sync::ConnectionMonitor;
/// use hearthlog_types::Health;
///
/// #[tokio::main]
/// async fn main() {
///     let gateway = MemoryGateway::new();
///     gateway.set_probe(ProbeBehavior::Report("maintenance".into()));
///
///     let monitor = ConnectionMonitor::new(Arc::new(gateway));
///     let health = monitor.retry_now().await;
///
///     assert_eq!(health.health, Health::Degraded);
///     assert_eq!(health.last_error.as_deref(), Some("maintenance"));
/// }
/// ```
#[derive(Clone)]
pub struct ConnectionMonitor {
    inner: Arc<Inner>,
}

impl ConnectionMonitor {
    /// A monitor with default settings that assumes the network is up.
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self::builder(gateway).build()
    }

    pub fn builder(gateway: Arc<dyn Gateway>) -> ConnectionMonitorBuilder {
        ConnectionMonitorBuilder::new(gateway)
    }

    /// The latest health.
    pub fn current_health(&self) -> HealthState {
        self.inner.health.borrow().clone()
    }

    /// Watch health changes.
    pub fn subscribe(&self) -> watch::Receiver<HealthState> {
        self.inner.health.subscribe()
    }

    pub fn is_network_up(&self) -> bool {
        self.inner.network_up.load(Ordering::SeqCst)
    }

    /// Probe now, waiting for any in-flight probe to finish first.
    ///
    /// Returns the resulting health. While the network is down this is
    /// `Offline` and the gateway is not contacted.
    pub async fn retry_now(&self) -> HealthState {
        let _guard = self.inner.probe_gate.lock().await;
        self.probe_locked().await
    }

    /// Feed a network transition in directly.
    ///
    /// Going down takes effect before this returns. Coming up probes.
    pub async fn network_changed(&self, up: bool) -> HealthState {
        if self.set_network(up) && up {
            self.retry_now().await
        } else {
            self.current_health()
        }
    }

    /// Drive the monitor from a network signal in the background.
    ///
    /// Probes once immediately, then on every transition and on the poll
    /// interval if one is configured.
    pub fn start(&self, mut network: watch::Receiver<bool>) -> MonitorHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let monitor = self.clone();
        let poll_interval = self.inner.poll_interval;

        let task = tokio::spawn(async move {
            let initial = *network.borrow_and_update();
            monitor.set_network(initial);
            monitor.spawn_probe(true);

            let mut poll = poll_interval.map(|period| {
                let mut timer = tokio::time::interval_at(Instant::now() + period, period);
                timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
                timer
            });
            let mut network_open = true;

            loop {
                tokio::select! {
                    changed = network.changed(), if network_open => {
                        if changed.is_err() {
                            debug!("network signal closed");
                            network_open = false;
                            continue;
                        }
                        let up = *network.borrow_and_update();
                        if monitor.set_network(up) && up {
                            monitor.spawn_probe(true);
                        }
                    }
                    _ = tick(&mut poll) => {
                        monitor.spawn_probe(false);
                    }
                    stopped = stop_rx.changed() => {
                        if stopped.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("connection monitor stopped");
        });

        MonitorHandle { stop_tx, task }
    }

    /// Record the network state. Returns `true` on a transition.
    fn set_network(&self, up: bool) -> bool {
        let was = self.inner.network_up.swap(up, Ordering::SeqCst);
        let changed = was != up;
        if changed {
            self.inner.network_epoch.fetch_add(1, Ordering::SeqCst);
            info!(up, "network changed");
        }
        if !up {
            self.transition(HealthState::offline(now_ms()));
        }
        changed
    }

    fn spawn_probe(&self, wait_for_gate: bool) {
        let monitor = self.clone();
        tokio::spawn(async move {
            if wait_for_gate {
                monitor.retry_now().await;
            } else if let Ok(_guard) = monitor.inner.probe_gate.try_lock() {
                monitor.probe_locked().await;
            } else {
                debug!("probe already in flight; skipping tick");
            }
        });
    }

    /// Probe until a result applies. Caller holds `probe_gate`.
    async fn probe_locked(&self) -> HealthState {
        loop {
            if !self.is_network_up() {
                return self.current_health();
            }

            let epoch = self.inner.network_epoch.load(Ordering::SeqCst);
            let next = self.probe_once().await;

            if self.apply_probe(epoch, next) {
                return self.current_health();
            }
            warn!("network changed while probing; discarding result");
        }
    }

    async fn probe_once(&self) -> HealthState {
        let started = Instant::now();
        let timeout = self.inner.probe_timeout;
        let probe = self.inner.gateway.probe_connectivity();

        match tokio::time::timeout(timeout, probe).await {
            Ok(outcome) if outcome.success => {
                let latency = started.elapsed().as_millis() as u64;
                debug!(latency_ms = latency, "probe succeeded");
                HealthState::online(now_ms(), latency)
            }
            Ok(outcome) => {
                debug!(message = %outcome.message, "probe reported failure");
                let message = if outcome.message.is_empty() {
                    "backend reported an error".to_string()
                } else {
                    outcome.message
                };
                HealthState::degraded(now_ms(), message)
            }
            Err(_) => {
                debug!(?timeout, "probe timed out");
                HealthState::degraded(now_ms(), format!("no response within {:?}", timeout))
            }
        }
    }

    /// Apply a probe result unless the network moved since `epoch`.
    fn apply_probe(&self, epoch: u64, next: HealthState) -> bool {
        let mut applied = false;
        self.inner.health.send_if_modified(|current| {
            // Checked under the watch lock: a concurrent network-down either
            // overwrites this result or causes it to be discarded.
            if !self.is_network_up() || self.inner.network_epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            applied = true;
            replace_health(current, next)
        });
        applied
    }

    fn transition(&self, next: HealthState) {
        self.inner
            .health
            .send_if_modified(|current| replace_health(current, next));
    }
}

/// Store `next`, returning whether watchers should be woken.
fn replace_health(current: &mut HealthState, next: HealthState) -> bool {
    let changed = current.health != next.health || current.last_error != next.last_error;
    if changed {
        info!(
            from = %current.health,
            to = %next.health,
            error = next.last_error.as_deref().unwrap_or(""),
            "connection health changed"
        );
    }
    *current = next;
    changed
}

async fn tick(poll: &mut Option<Interval>) {
    match poll {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

impl std::fmt::Debug for ConnectionMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionMonitor")
            .field("health", &self.current_health().health)
            .field("network_up", &self.is_network_up())
            .field("probe_timeout", &self.inner.probe_timeout)
            .field("poll_interval", &self.inner.poll_interval)
            .finish()
    }
}

/// Builder for configuring a ConnectionMonitor.
pub struct ConnectionMonitorBuilder {
    gateway: Arc<dyn Gateway>,
    probe_timeout: Option<Duration>,
    poll_interval: Option<Duration>,
    network_up: bool,
}

impl ConnectionMonitorBuilder {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            probe_timeout: None,
            poll_interval: None,
            network_up: true,
        }
    }

    /// Bound on a single probe (default: 5 seconds).
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = Some(timeout);
        self
    }

    /// Also probe on this interval. Ticks that land on an in-flight probe
    /// are skipped.
    pub fn poll_interval(mut self, interval: Option<Duration>) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Initial network state (default: up).
    pub fn network_up(mut self, up: bool) -> Self {
        self.network_up = up;
        self
    }

    pub fn build(self) -> ConnectionMonitor {
        let initial = if self.network_up {
            HealthState::default()
        } else {
            HealthState::offline(now_ms())
        };
        let (health, _) = watch::channel(initial);

        ConnectionMonitor {
            inner: Arc::new(Inner {
                gateway: self.gateway,
                health,
                network_up: AtomicBool::new(self.network_up),
                network_epoch: AtomicU64::new(0),
                probe_gate: Mutex::new(()),
                probe_timeout: self.probe_timeout.unwrap_or(DEFAULT_PROBE_TIMEOUT),
                poll_interval: self.poll_interval,
            }),
        }
    }
}

/// Handle for the background driver started by [`ConnectionMonitor::start`].
///
/// Drop this handle to stop the driver, or call `stop()` explicitly.
#[derive(Debug)]
pub struct MonitorHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Stop the background driver. Probes already running finish.
    pub fn stop(self) {
        let _ = self.stop_tx.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NetworkSignal;
    use async_trait::async_trait;
    use hearthlog_gateway::{GatewayError, MemoryGateway, ProbeBehavior, ProbeOutcome};
    use hearthlog_types::{Entity, EntityId, EntityKind, Fields, Health, NewEntity};
    use std::sync::atomic::AtomicUsize;

    fn monitor(gw: &MemoryGateway) -> ConnectionMonitor {
        ConnectionMonitor::new(Arc::new(gw.clone()))
    }

    #[tokio::test]
    async fn probe_success_is_online() {
        let gw = MemoryGateway::new();
        let m = monitor(&gw);
        assert_eq!(m.current_health().health, Health::Unknown);

        let health = m.retry_now().await;
        assert_eq!(health.health, Health::Online);
        assert!(health.last_error.is_none());
        assert!(health.notice().is_none());
    }

    #[tokio::test]
    async fn down_then_up_with_failing_probe_is_degraded() {
        let gw = MemoryGateway::new();
        gw.set_probe(ProbeBehavior::Report("x".into()));
        let m = monitor(&gw);

        let health = m.network_changed(false).await;
        assert_eq!(health.health, Health::Offline);

        let health = m.network_changed(true).await;
        assert_eq!(health.health, Health::Degraded);
        assert_eq!(health.last_error.as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn retry_while_offline_does_not_probe() {
        let gw = MemoryGateway::new();
        let m = monitor(&gw);
        m.network_changed(false).await;

        assert_eq!(m.retry_now().await.health, Health::Offline);
        assert_eq!(gw.calls().probe, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn network_down_overrides_in_flight_probe() {
        let gw = MemoryGateway::new();
        gw.set_latency(Some(Duration::from_secs(1)));
        let m = monitor(&gw);

        let probing = {
            let m = m.clone();
            tokio::spawn(async move { m.retry_now().await })
        };
        tokio::time::sleep(Duration::from_millis(500)).await;

        m.network_changed(false).await;
        assert_eq!(m.current_health().health, Health::Offline);

        let result = probing.await.unwrap();
        assert_eq!(result.health, Health::Offline);
        assert_eq!(m.current_health().health, Health::Offline);
        assert_eq!(gw.calls().probe, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn probe_straddling_a_transition_is_rerun() {
        let gw = MemoryGateway::new();
        gw.set_latency(Some(Duration::from_secs(1)));
        let m = monitor(&gw);

        let first = {
            let m = m.clone();
            tokio::spawn(async move { m.retry_now().await })
        };
        tokio::time::sleep(Duration::from_millis(300)).await;
        m.network_changed(false).await;
        tokio::time::sleep(Duration::from_millis(300)).await;

        let health = m.network_changed(true).await;
        first.await.unwrap();

        assert_eq!(health.health, Health::Online);
        // stale first probe, its re-run, then the probe for the up transition
        assert_eq!(gw.calls().probe, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_probe_times_out_as_degraded() {
        let gw = MemoryGateway::new();
        gw.set_probe(ProbeBehavior::Hang);
        let m = ConnectionMonitor::builder(Arc::new(gw))
            .probe_timeout(Duration::from_secs(5))
            .build();

        let started = Instant::now();
        let health = m.retry_now().await;

        assert_eq!(health.health, Health::Degraded);
        assert!(health.last_error.unwrap().contains("no response"));
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn failed_probe_request_is_degraded() {
        let gw = MemoryGateway::new();
        gw.set_probe(ProbeBehavior::Fail(GatewayError::Connection("refused".into())));
        let health = monitor(&gw).retry_now().await;

        assert_eq!(health.health, Health::Degraded);
        assert_eq!(
            health.last_error.as_deref(),
            Some("Connection failed: refused")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn start_probes_and_follows_the_signal() {
        let gw = MemoryGateway::new();
        let m = monitor(&gw);
        let signal = NetworkSignal::new(true);
        let handle = m.start(signal.subscribe());

        let mut rx = m.subscribe();
        rx.wait_for(|h| h.health == Health::Online).await.unwrap();

        signal.set_up(false);
        rx.wait_for(|h| h.health == Health::Offline).await.unwrap();

        gw.set_probe(ProbeBehavior::Report("x".into()));
        signal.set_up(true);
        let health = rx
            .wait_for(|h| h.health == Health::Degraded)
            .await
            .unwrap()
            .clone();
        assert_eq!(health.last_error.as_deref(), Some("x"));

        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn starts_offline_when_network_is_down() {
        let gw = MemoryGateway::new();
        let m = monitor(&gw);
        let signal = NetworkSignal::new(false);
        let _handle = m.start(signal.subscribe());

        let mut rx = m.subscribe();
        rx.wait_for(|h| h.health == Health::Offline).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(gw.calls().probe, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_monitor_ignores_the_signal() {
        let gw = MemoryGateway::new();
        let m = monitor(&gw);
        let signal = NetworkSignal::new(true);
        let handle = m.start(signal.subscribe());
        m.subscribe()
            .wait_for(|h| h.is_online())
            .await
            .unwrap();

        handle.stop();
        tokio::time::sleep(Duration::from_millis(10)).await;
        signal.set_up(false);
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(m.current_health().is_online());
    }

    /// Probes slowly and records the highest number of concurrent probes.
    #[derive(Debug, Default)]
    struct SlowProbe {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        probes: AtomicUsize,
    }

    #[async_trait]
    impl Gateway for SlowProbe {
        async fn list(&self, _: EntityKind) -> Result<Vec<Entity>, GatewayError> {
            Err(GatewayError::Unsupported("list".into()))
        }
        async fn create(&self, _: NewEntity) -> Result<Entity, GatewayError> {
            Err(GatewayError::Unsupported("create".into()))
        }
        async fn update(
            &self,
            _: EntityKind,
            _: &EntityId,
            _: Fields,
        ) -> Result<Entity, GatewayError> {
            Err(GatewayError::Unsupported("update".into()))
        }
        async fn delete(&self, _: EntityKind, _: &EntityId) -> Result<(), GatewayError> {
            Err(GatewayError::Unsupported("delete".into()))
        }
        async fn probe_connectivity(&self) -> ProbeOutcome {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.probes.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(350)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            ProbeOutcome::ok()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn polling_never_overlaps_a_probe() {
        let gw = Arc::new(SlowProbe::default());
        let m = ConnectionMonitor::builder(gw.clone())
            .poll_interval(Some(Duration::from_millis(100)))
            .build();
        let signal = NetworkSignal::new(true);
        let handle = m.start(signal.subscribe());

        tokio::time::sleep(Duration::from_secs(2)).await;
        handle.stop();

        assert_eq!(gw.max_in_flight.load(Ordering::SeqCst), 1);
        assert!(gw.probes.load(Ordering::SeqCst) >= 3);
    }
}
