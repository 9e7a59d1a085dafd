//! The hub: single sequential authority over session state.
//!
//! [`Hub`] owns the [`SessionRegistry`] and the [`Broadcaster`]. Its task
//! drains the [`EventQueueReceiver`] one message at a time, so no registry
//! mutation can interleave with another and the registry needs no locks.
//! Every state-changing event is followed by a broadcast.
//!
//! Connections evicted by the broadcaster stay fenced until their
//! `Detach` arrives: events they still had in flight are dropped instead
//! of recreating a participant with no connection behind it.

use std::collections::HashSet;

use tokio::task::JoinHandle;

use super::broadcaster::{BroadcastReport, Broadcaster};
use super::event_queue::{EventQueue, EventQueueReceiver, HubMessage};
use crate::domain::{ConnectionId, Event, SessionRegistry, Snapshot};

/// Registry plus broadcaster, driven by one task.
#[derive(Debug, Default)]
pub struct Hub {
    registry: SessionRegistry,
    broadcaster: Broadcaster,
    evicted: HashSet<ConnectionId>,
}

impl Hub {
    /// Creates a hub with no participants and no connections.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns the hub loop on the current runtime.
    ///
    /// The task runs until every [`EventQueue`] clone has been dropped.
    pub fn spawn(self, receiver: EventQueueReceiver) -> JoinHandle<()> {
        tokio::spawn(self.run(receiver))
    }

    /// Drains the queue until it closes.
    pub async fn run(mut self, mut receiver: EventQueueReceiver) {
        tracing::info!("hub started");
        while let Some(message) = receiver.dequeue().await {
            self.handle(message);
        }
        tracing::info!(
            participants = self.registry().len(),
            connections = self.broadcaster().connection_count(),
            "event queue closed; hub stopped"
        );
    }

    /// Processes one queue message.
    pub fn handle(&mut self, message: HubMessage) {
        match message {
            HubMessage::Event(event) => {
                self.apply(event);
            }
            HubMessage::Attach { connection, sink } => {
                let replaced = self.broadcaster.is_attached(connection);
                tracing::debug!(%connection, replaced, "connection attached");
                self.broadcaster.attach(connection, sink);
            }
            HubMessage::Detach { connection } => {
                let was_attached = self.broadcaster.detach(connection);
                let was_evicted = self.evicted.remove(&connection);
                let departed = self.registry.remove(connection);
                tracing::debug!(%connection, was_attached, was_evicted, "connection detached");
                if departed.is_some() {
                    self.broadcast();
                }
            }
            HubMessage::Query { reply } => {
                // The requester may have given up; nothing to do then.
                let _ = reply.send(self.snapshot());
            }
        }
    }

    /// Applies one event to the registry and broadcasts the result.
    ///
    /// Returns the broadcast report, or `None` for unsupported events,
    /// which change nothing and are not broadcast.
    ///
    /// Events from a connection that was evicted and has not detached yet
    /// are dropped the same way.
    pub fn apply(&mut self, event: Event) -> Option<BroadcastReport> {
        if let Some(connection) = event.connection()
            && self.is_evicted(connection)
        {
            tracing::debug!(
                %connection,
                event_type = event.kind(),
                "dropping event from evicted connection"
            );
            return None;
        }
        match event {
            Event::Register { connection, name } => {
                tracing::debug!(%connection, username = %name, "participant registered");
                self.registry.upsert(connection).name = Some(name);
            }
            Event::Submit {
                connection,
                estimate,
            } => {
                tracing::debug!(%connection, estimate, "estimate submitted");
                self.registry.upsert(connection).estimate = Some(estimate);
            }
            Event::Reveal => {
                tracing::debug!("estimates revealed");
            }
            Event::Clear => {
                tracing::debug!(participants = self.registry.len(), "estimates cleared");
                self.registry.clear_estimates();
            }
            Event::Unsupported { kind } => {
                tracing::warn!(event_type = %kind, "unsupported event type");
                return None;
            }
        }
        Some(self.broadcast())
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.registry.snapshot()
    }

    /// Returns the registry for inspection.
    #[must_use]
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Returns the broadcaster for inspection.
    #[must_use]
    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Returns `true` if `connection` was evicted and has not detached.
    #[must_use]
    pub fn is_evicted(&self, connection: ConnectionId) -> bool {
        self.evicted.contains(&connection)
    }

    fn broadcast(&mut self) -> BroadcastReport {
        let report = self.broadcaster.broadcast(&mut self.registry);
        self.evicted.extend(report.evicted.iter().copied());
        report
    }
}

/// Creates the event queue and spawns a hub draining it.
///
/// Returns the producer half to hand to the transport and the hub task.
#[must_use]
pub fn start(
    capacity: usize,
    enqueue_timeout: std::time::Duration,
) -> (EventQueue, JoinHandle<()>) {
    let (queue, receiver) = EventQueue::bounded(capacity, enqueue_timeout);
    let handle = Hub::new().spawn(receiver);
    (queue, handle)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;
    use crate::domain::SnapshotEntry;
    use crate::error::WriteError;
    use crate::service::{ChannelSink, ConnectionSink};

    #[derive(Debug)]
    struct FailingSink;

    impl ConnectionSink for FailingSink {
        fn write_snapshot(&mut self, _payload: Arc<str>) -> Result<(), WriteError> {
            Err(WriteError::Closed)
        }
    }

    fn register(connection: ConnectionId, name: &str) -> Event {
        Event::Register {
            connection,
            name: name.to_string(),
        }
    }

    fn submit(connection: ConnectionId, estimate: i64) -> Event {
        Event::Submit {
            connection,
            estimate,
        }
    }

    fn entry(name: &str, points: Option<i64>) -> SnapshotEntry {
        SnapshotEntry {
            username: Some(name.to_string()),
            poker_points: points,
        }
    }

    fn sorted(mut snapshot: Snapshot) -> Snapshot {
        snapshot.sort_by(|a, b| a.username.cmp(&b.username));
        snapshot
    }

    fn attach(hub: &mut Hub, connection: ConnectionId) -> mpsc::Receiver<Arc<str>> {
        let (tx, rx) = mpsc::channel(64);
        let (sink, _shutdown) = ChannelSink::new(tx);
        hub.handle(HubMessage::Attach {
            connection,
            sink: Box::new(sink),
        });
        rx
    }

    fn last_frame(rx: &mut mpsc::Receiver<Arc<str>>) -> Option<serde_json::Value> {
        let mut last = None;
        while let Ok(frame) = rx.try_recv() {
            last = Some(frame);
        }
        last.and_then(|frame| serde_json::from_str(&frame).ok())
    }

    #[test]
    fn register_then_submit_yields_single_entry() {
        let mut hub = Hub::new();
        let id = ConnectionId::new();
        hub.apply(register(id, "alice"));
        hub.apply(submit(id, 3));
        hub.apply(register(id, "alicia"));
        hub.apply(submit(id, 8));

        assert_eq!(hub.snapshot(), vec![entry("alicia", Some(8))]);
    }

    #[test]
    fn repeated_register_is_idempotent() {
        let mut once = Hub::new();
        let mut twice = Hub::new();
        let id = ConnectionId::new();
        once.apply(register(id, "alice"));
        twice.apply(register(id, "alice"));
        twice.apply(register(id, "alice"));

        assert_eq!(once.snapshot(), twice.snapshot());
        assert_eq!(twice.registry().len(), 1);
    }

    #[test]
    fn register_keeps_existing_estimate() {
        let mut hub = Hub::new();
        let id = ConnectionId::new();
        hub.apply(submit(id, 13));
        hub.apply(register(id, "carol"));
        assert_eq!(hub.snapshot(), vec![entry("carol", Some(13))]);
    }

    #[test]
    fn estimation_round_scenario() {
        let mut hub = Hub::new();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        let mut rx_a = attach(&mut hub, a);
        let mut rx_b = attach(&mut hub, b);

        hub.apply(register(a, "alice"));
        assert_eq!(
            last_frame(&mut rx_a),
            Some(serde_json::json!([{"username": "alice", "pokerPoints": null}]))
        );

        hub.apply(register(b, "bob"));
        assert_eq!(
            sorted(hub.snapshot()),
            vec![entry("alice", None), entry("bob", None)]
        );

        hub.apply(submit(a, 5));
        assert_eq!(
            sorted(hub.snapshot()),
            vec![entry("alice", Some(5)), entry("bob", None)]
        );
        let Some(frame) = last_frame(&mut rx_b) else {
            panic!("bob should receive a broadcast");
        };
        let Some(entries) = frame.as_array() else {
            panic!("broadcast should be an array");
        };
        assert_eq!(entries.len(), 2);
        assert!(entries.contains(&serde_json::json!({"username": "alice", "pokerPoints": 5})));
        assert!(entries.contains(&serde_json::json!({"username": "bob", "pokerPoints": null})));
    }

    #[test]
    fn clear_resets_estimates_but_keeps_names() {
        let mut hub = Hub::new();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        hub.apply(register(a, "alice"));
        hub.apply(register(b, "bob"));
        hub.apply(submit(a, 3));
        hub.apply(submit(b, 5));

        assert!(hub.apply(Event::Clear).is_some());
        assert_eq!(
            sorted(hub.snapshot()),
            vec![entry("alice", None), entry("bob", None)]
        );
    }

    #[test]
    fn reveal_broadcasts_without_mutation() {
        let mut hub = Hub::new();
        let id = ConnectionId::new();
        let mut rx = attach(&mut hub, id);
        hub.apply(submit(id, 2));
        let before = hub.snapshot();
        let _ = last_frame(&mut rx);

        let Some(report) = hub.apply(Event::Reveal) else {
            panic!("reveal should broadcast");
        };
        assert_eq!(report.delivered, 1);
        assert_eq!(hub.snapshot(), before);
        assert!(last_frame(&mut rx).is_some());
    }

    #[test]
    fn unsupported_event_changes_nothing() {
        let mut hub = Hub::new();
        let id = ConnectionId::new();
        let mut rx = attach(&mut hub, id);
        hub.apply(register(id, "alice"));
        let _ = last_frame(&mut rx);
        let before = serde_json::to_string(&hub.snapshot()).unwrap_or_default();

        let report = hub.apply(Event::Unsupported {
            kind: "foo".to_string(),
        });

        assert!(report.is_none());
        assert!(rx.try_recv().is_err());
        let after = serde_json::to_string(&hub.snapshot()).unwrap_or_default();
        assert_eq!(before, after);
    }

    #[test]
    fn failing_connection_is_evicted_within_one_broadcast() {
        let mut hub = Hub::new();
        let good = ConnectionId::new();
        let bad = ConnectionId::new();
        let mut rx = attach(&mut hub, good);
        hub.apply(register(good, "good"));
        hub.apply(register(bad, "bad"));
        hub.handle(HubMessage::Attach {
            connection: bad,
            sink: Box::new(FailingSink),
        });

        let Some(report) = hub.apply(Event::Reveal) else {
            panic!("reveal should broadcast");
        };
        assert_eq!(report.evicted, vec![bad]);
        assert!(hub.registry().get(bad).is_none());
        assert!(!hub.broadcaster().is_attached(bad));

        hub.apply(Event::Reveal);
        assert_eq!(
            last_frame(&mut rx),
            Some(serde_json::json!([{"username": "good", "pokerPoints": null}]))
        );
    }

    #[test]
    fn evicted_connection_cannot_rejoin_before_detach() {
        let mut hub = Hub::new();
        let good = ConnectionId::new();
        let bad = ConnectionId::new();
        let mut rx = attach(&mut hub, good);
        hub.handle(HubMessage::Attach {
            connection: bad,
            sink: Box::new(FailingSink),
        });

        let Some(report) = hub.apply(register(good, "good")) else {
            panic!("register should broadcast");
        };
        assert_eq!(report.evicted, vec![bad]);
        assert!(hub.is_evicted(bad));
        let _ = last_frame(&mut rx);

        assert!(hub.apply(register(bad, "bad")).is_none());
        assert!(hub.apply(submit(bad, 13)).is_none());
        assert!(hub.registry().get(bad).is_none());
        assert_eq!(hub.snapshot(), vec![entry("good", None)]);
        assert!(rx.try_recv().is_err());

        hub.apply(Event::Reveal);
        assert_eq!(
            last_frame(&mut rx),
            Some(serde_json::json!([{"username": "good", "pokerPoints": null}]))
        );
    }

    #[test]
    fn detach_lifts_the_eviction_fence() {
        let mut hub = Hub::new();
        let good = ConnectionId::new();
        let bad = ConnectionId::new();
        let _rx = attach(&mut hub, good);
        hub.handle(HubMessage::Attach {
            connection: bad,
            sink: Box::new(FailingSink),
        });
        hub.apply(Event::Reveal);
        assert!(hub.is_evicted(bad));

        hub.handle(HubMessage::Detach { connection: bad });
        assert!(!hub.is_evicted(bad));
        assert!(hub.registry().get(bad).is_none());
    }

    #[test]
    fn other_connections_still_apply_after_an_eviction() {
        let mut hub = Hub::new();
        let good = ConnectionId::new();
        let bad = ConnectionId::new();
        let _rx = attach(&mut hub, good);
        hub.handle(HubMessage::Attach {
            connection: bad,
            sink: Box::new(FailingSink),
        });
        hub.apply(Event::Reveal);

        assert!(hub.apply(submit(good, 5)).is_some());
        let fresh = ConnectionId::new();
        assert!(hub.apply(register(fresh, "late")).is_some());
        let unnamed = SnapshotEntry {
            username: None,
            poker_points: Some(5),
        };
        assert_eq!(sorted(hub.snapshot()), vec![unnamed, entry("late", None)]);
    }

    #[test]
    fn detach_removes_participant_and_notifies_others() {
        let mut hub = Hub::new();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        let mut rx_a = attach(&mut hub, a);
        let _rx_b = attach(&mut hub, b);
        hub.apply(register(a, "alice"));
        hub.apply(register(b, "bob"));
        let _ = last_frame(&mut rx_a);

        hub.handle(HubMessage::Detach { connection: b });
        assert!(!hub.broadcaster().is_attached(b));
        assert_eq!(
            last_frame(&mut rx_a),
            Some(serde_json::json!([{"username": "alice", "pokerPoints": null}]))
        );

        hub.handle(HubMessage::Detach { connection: b });
        assert!(rx_a.try_recv().is_err());
    }

    #[test]
    fn silent_connection_detach_does_not_broadcast() {
        let mut hub = Hub::new();
        let a = ConnectionId::new();
        let silent = ConnectionId::new();
        let mut rx_a = attach(&mut hub, a);
        let _rx_silent = attach(&mut hub, silent);
        hub.apply(register(a, "alice"));
        let _ = last_frame(&mut rx_a);

        hub.handle(HubMessage::Detach { connection: silent });
        assert!(rx_a.try_recv().is_err());
        assert_eq!(hub.broadcaster().connection_count(), 1);
    }

    #[tokio::test]
    async fn query_returns_current_snapshot() {
        let (queue, handle) = start(8, Duration::from_millis(100));
        let id = ConnectionId::new();
        let Ok(()) = queue.enqueue(register(id, "dora")).await else {
            panic!("enqueue failed");
        };

        let Ok(snapshot) = queue.snapshot().await else {
            panic!("query failed");
        };
        assert_eq!(snapshot, vec![entry("dora", None)]);

        drop(queue);
        assert!(handle.await.is_ok());
    }
}
