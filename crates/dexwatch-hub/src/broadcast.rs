//! Fan-out of monitor notifications to every session.
//!
//! The relay runs inside the monitor's notification path, so it only
//! serializes and hands the frame to a `broadcast` channel. Each session
//! drains its own receiver; a slow session lags on its own without holding
//! up the monitor or the other sessions.

use dexwatch_monitor::{Monitor, MonitorEvent, SubscriptionId};
use dexwatch_telemetry::Metrics;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::protocol::{views, ServerMessage};

/// Subscribe the relay to `monitor`.
pub(crate) fn relay_events(monitor: &Monitor, tx: broadcast::Sender<String>) -> SubscriptionId {
    monitor.subscribe(move |event| {
        if let Some(message) = to_broadcast(event) {
            publish(&tx, &message);
        }
    })
}

/// Map a monitor event to the frame every session receives.
///
/// `Initial` is not broadcast: sessions read the cached snapshot on connect.
pub(crate) fn to_broadcast(event: &MonitorEvent) -> Option<ServerMessage> {
    match event {
        MonitorEvent::Update(snapshot) => Some(ServerMessage::Transactions(views(snapshot))),
        MonitorEvent::Error(e) => Some(ServerMessage::error(e.to_string())),
        MonitorEvent::Initial(_) => None,
    }
}

fn publish(tx: &broadcast::Sender<String>, message: &ServerMessage) {
    let json = match message.to_json() {
        Ok(json) => json,
        Err(e) => {
            debug!(error = %e, event = message.event_name(), "Failed to serialize broadcast");
            return;
        }
    };
    match tx.send(json) {
        Ok(receivers) => trace!(event = message.event_name(), receivers, "Broadcast sent"),
        Err(_) => trace!(event = message.event_name(), "No sessions connected"),
    }
    Metrics::broadcast(message.event_name());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use dexwatch_core::Snapshot;
    use dexwatch_fetch::{FetchError, MockFetcher};

    #[test]
    fn test_initial_is_not_broadcast() {
        let event = MonitorEvent::Initial(Arc::new(Snapshot::empty()));
        assert!(to_broadcast(&event).is_none());
    }

    #[test]
    fn test_error_is_broadcast_with_message() {
        let event = MonitorEvent::Error(FetchError::Upstream("rate limited".to_string()));
        match to_broadcast(&event) {
            Some(ServerMessage::Error { message }) => assert!(message.contains("rate limited")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_relay_reaches_every_receiver() {
        let monitor = Monitor::new(Arc::new(MockFetcher::returning(vec![])));
        let (tx, mut rx_a) = broadcast::channel(8);
        let mut rx_b = tx.subscribe();
        let id = relay_events(&monitor, tx);

        monitor.start(dexwatch_core::PollInterval::ONE_MINUTE).await;

        let a: serde_json::Value = serde_json::from_str(&rx_a.recv().await.unwrap()).unwrap();
        let b: serde_json::Value = serde_json::from_str(&rx_b.recv().await.unwrap()).unwrap();
        assert_eq!(a["event"], "transactions");
        assert_eq!(a, b);

        assert!(monitor.unsubscribe(id));
        monitor.shutdown();
    }
}
