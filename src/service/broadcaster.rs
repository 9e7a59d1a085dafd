//! Snapshot fan-out to every live connection.
//!
//! The [`Broadcaster`] owns one [`ConnectionSink`] per attached connection.
//! A broadcast serializes the snapshot once and hands the same payload to
//! every sink. Sinks that fail are closed and evicted, together with their
//! registry entry, after the pass completes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

use crate::domain::{ConnectionId, SessionRegistry};
use crate::error::WriteError;

/// Outbound half of one connection as seen by the hub.
///
/// Writes must not block: the hub is a single task and a slow client must
/// not stall everyone else.
pub trait ConnectionSink: Send + fmt::Debug {
    /// Queues one serialized snapshot for delivery.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError`] if the connection can no longer accept
    /// writes.
    fn write_snapshot(&mut self, payload: Arc<str>) -> Result<(), WriteError>;

    /// Closes the connection. Called once before the sink is dropped.
    fn close(&mut self) {}
}

/// Sink backed by a connection task's outbound channel.
///
/// [`ConnectionSink::close`] fires the paired shutdown receiver so the
/// connection stops reading immediately instead of after its outbound
/// buffer drains.
#[derive(Debug)]
pub struct ChannelSink {
    sender: mpsc::Sender<Arc<str>>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl ChannelSink {
    /// Wraps `sender` and returns the receiver that resolves on close.
    #[must_use]
    pub fn new(sender: mpsc::Sender<Arc<str>>) -> (Self, oneshot::Receiver<()>) {
        let (shutdown, shutdown_rx) = oneshot::channel();
        (
            Self {
                sender,
                shutdown: Some(shutdown),
            },
            shutdown_rx,
        )
    }
}

impl ConnectionSink for ChannelSink {
    fn write_snapshot(&mut self, payload: Arc<str>) -> Result<(), WriteError> {
        self.sender.try_send(payload).map_err(|err| match err {
            TrySendError::Full(_) => WriteError::Backlogged,
            TrySendError::Closed(_) => WriteError::Closed,
        })
    }

    fn close(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            // The connection task may already be gone.
            let _ = shutdown.send(());
        }
    }
}

/// Outcome of one broadcast pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections that accepted the snapshot.
    pub delivered: usize,
    /// Connections evicted because their write failed.
    pub evicted: Vec<ConnectionId>,
}

/// Fan-out writer for snapshots.
#[derive(Debug, Default)]
pub struct Broadcaster {
    connections: HashMap<ConnectionId, Box<dyn ConnectionSink>>,
}

impl Broadcaster {
    /// Creates a broadcaster with no connections.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a live connection. A sink already attached under the same id
    /// is closed and replaced.
    pub fn attach(&mut self, connection: ConnectionId, sink: Box<dyn ConnectionSink>) {
        if let Some(mut previous) = self.connections.insert(connection, sink) {
            previous.close();
        }
    }

    /// Closes and forgets a connection. Returns `false` if it was unknown.
    pub fn detach(&mut self, connection: ConnectionId) -> bool {
        match self.connections.remove(&connection) {
            Some(mut sink) => {
                sink.close();
                true
            }
            None => false,
        }
    }

    /// Returns `true` if `connection` is currently attached.
    #[must_use]
    pub fn is_attached(&self, connection: ConnectionId) -> bool {
        self.connections.contains_key(&connection)
    }

    /// Returns the number of attached connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Writes the registry's current snapshot to every connection.
    ///
    /// Iterates over the connection ids captured at the start of the pass
    /// and applies evictions only after every write has been attempted.
    pub fn broadcast(&mut self, registry: &mut SessionRegistry) -> BroadcastReport {
        let snapshot = registry.snapshot();
        let payload: Arc<str> = match serde_json::to_string(&snapshot) {
            Ok(json) => json.into(),
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize snapshot");
                return BroadcastReport::default();
            }
        };
        tracing::debug!(participants = snapshot.len(), payload = %payload, "broadcasting snapshot");

        let targets: Vec<ConnectionId> = self.connections.keys().copied().collect();
        let mut report = BroadcastReport::default();
        for connection in targets {
            let Some(sink) = self.connections.get_mut(&connection) else {
                continue;
            };
            match sink.write_snapshot(Arc::clone(&payload)) {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    tracing::warn!(%connection, error = %err, "snapshot write failed; evicting");
                    report.evicted.push(connection);
                }
            }
        }

        for connection in &report.evicted {
            self.detach(*connection);
            registry.remove(*connection);
        }
        report
    }
}
