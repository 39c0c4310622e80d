//! Local network detection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use hearthlog_sync::NetworkSignal;

/// Feeds a [`NetworkSignal`] from whether a route to `check_addr` exists.
///
/// Connecting a UDP socket only consults the routing table, so no traffic
/// is sent. The user can also force the network down.
#[derive(Debug, Clone)]
pub struct NetworkWatcher {
    signal: NetworkSignal,
    check_addr: Arc<str>,
    interval: Duration,
    forced_offline: Arc<AtomicBool>,
    nudge: Arc<Notify>,
}

impl NetworkWatcher {
    pub fn new(check_addr: impl Into<String>, interval: Duration) -> Self {
        Self {
            signal: NetworkSignal::default(),
            check_addr: Arc::from(check_addr.into()),
            interval,
            forced_offline: Arc::new(AtomicBool::new(false)),
            nudge: Arc::new(Notify::new()),
        }
    }

    pub fn signal(&self) -> &NetworkSignal {
        &self.signal
    }

    pub fn is_forced_offline(&self) -> bool {
        self.forced_offline.load(Ordering::SeqCst)
    }

    /// Force the network down, or stop forcing it. Returns the new setting.
    ///
    /// Forcing takes effect immediately; releasing waits for the next check,
    /// which is triggered right away.
    pub fn toggle_forced_offline(&self) -> bool {
        let forced = !self.forced_offline.fetch_xor(true, Ordering::SeqCst);
        info!(forced, "forced offline mode changed");
        if forced {
            self.signal.set_up(false);
        }
        self.nudge.notify_one();
        forced
    }

    /// Check once and update the signal.
    pub async fn check(&self) -> bool {
        let up = !self.is_forced_offline() && route_available(&self.check_addr).await;
        if self.signal.set_up(up) {
            info!(up, "network changed");
        }
        up
    }

    /// Check on the interval, and whenever forced offline mode changes.
    pub fn spawn(&self) -> JoinHandle<()> {
        let watcher = self.clone();
        tokio::spawn(async move {
            loop {
                watcher.check().await;
                tokio::select! {
                    _ = tokio::time::sleep(watcher.interval) => {}
                    _ = watcher.nudge.notified() => debug!("network re-check requested"),
                }
            }
        })
    }
}

async fn route_available(addr: &str) -> bool {
    let socket = match UdpSocket::bind("0.0.0.0:0").await {
        Ok(socket) => socket,
        Err(err) => {
            debug!(%err, "could not bind probe socket");
            return false;
        }
    };
    match socket.connect(addr).await {
        Ok(()) => true,
        Err(err) => {
            debug!(addr, %err, "no route");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loopback_is_always_routable() {
        let watcher = NetworkWatcher::new("127.0.0.1:9", Duration::from_secs(60));
        assert!(watcher.check().await);
        assert!(watcher.signal().is_up());
    }

    #[tokio::test]
    async fn unresolvable_addresses_are_down() {
        let watcher = NetworkWatcher::new("not an address", Duration::from_secs(60));
        assert!(!watcher.check().await);
        assert!(!watcher.signal().is_up());
    }

    #[tokio::test]
    async fn forcing_offline_is_immediate() {
        let watcher = NetworkWatcher::new("127.0.0.1:9", Duration::from_secs(60));
        let task = watcher.spawn();
        let mut rx = watcher.signal().subscribe();

        assert!(watcher.toggle_forced_offline());
        assert!(!watcher.signal().is_up());

        assert!(!watcher.toggle_forced_offline());
        rx.wait_for(|up| *up).await.unwrap();

        task.abort();
    }
}
