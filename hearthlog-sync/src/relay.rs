//! Forwards remote changes onto the update bus.

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tracing::debug;

use hearthlog_gateway::Gateway;

use crate::bus::UpdateBus;

/// Publish on `bus` whenever the gateway reports a change made elsewhere.
///
/// A burst of queued changes becomes a single publish. Returns `None` if
/// the gateway has no change feed.
pub fn spawn_change_relay(gateway: &dyn Gateway, bus: UpdateBus) -> Option<JoinHandle<()>> {
    let mut feed = gateway.change_feed()?;

    Some(tokio::spawn(async move {
        loop {
            match feed.recv().await {
                Ok(change) => {
                    debug!(table = %change.kind, id = ?change.id, "remote change");
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "change feed lagged");
                }
                Err(RecvError::Closed) => break,
            }

            loop {
                match feed.try_recv() {
                    Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                    Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                }
            }
            bus.publish();
        }
        debug!("change feed closed");
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearthlog_gateway::MemoryGateway;
    use hearthlog_types::{EntityKind, NewEntity};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn remote_inserts_publish() {
        let gateway = MemoryGateway::new();
        let bus = UpdateBus::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let _sub = {
            let seen = seen.clone();
            bus.subscribe(move || {
                seen.fetch_add(1, Ordering::SeqCst);
            })
        };

        let relay = spawn_change_relay(&gateway, bus.clone()).unwrap();
        gateway.insert_remote(NewEntity::new(EntityKind::Entry));

        while seen.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(bus.publish_count(), 1);
        relay.abort();
    }

    #[tokio::test]
    async fn bursts_collapse() {
        let gateway = MemoryGateway::new();
        let bus = UpdateBus::new();

        // Queue the burst before the relay task gets to run.
        let relay = spawn_change_relay(&gateway, bus.clone()).unwrap();
        for _ in 0..5 {
            gateway.insert_remote(NewEntity::new(EntityKind::Photo));
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(bus.publish_count(), 1);
        relay.abort();
    }
}
