//! Bounded multi-producer, single-consumer conduit into the hub.
//!
//! [`EventQueue`] wraps a [`tokio::sync::mpsc`] channel. Every connection
//! task holds a clone and pushes its events; the hub task owns the only
//! [`EventQueueReceiver`]. Per-producer order is preserved; interleaving
//! across producers follows arrival order.
//!
//! # Backpressure
//!
//! [`EventQueue::enqueue`] waits for free capacity for at most the
//! configured timeout and then drops the event with
//! [`HubError::QueueFull`]. Connection lifecycle messages
//! ([`EventQueue::attach`], [`EventQueue::detach`]) wait without a
//! timeout so the hub never loses track of a socket.

use std::time::Duration;

use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::{mpsc, oneshot};

use super::broadcaster::ConnectionSink;
use crate::domain::{ConnectionId, Event, Snapshot};
use crate::error::HubError;

/// Everything the hub task consumes from its queue.
#[derive(Debug)]
pub enum HubMessage {
    /// A decoded client event.
    Event(Event),

    /// A new connection became writable.
    Attach {
        /// Identity minted by the transport.
        connection: ConnectionId,
        /// Outbound writer for snapshots.
        sink: Box<dyn ConnectionSink>,
    },

    /// A connection's read loop ended.
    Detach {
        /// Identity of the departed connection.
        connection: ConnectionId,
    },

    /// Read-only request for the current snapshot.
    Query {
        /// Where the hub sends the snapshot.
        reply: oneshot::Sender<Snapshot>,
    },
}

/// Producer half of the event queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventQueue {
    sender: mpsc::Sender<HubMessage>,
    enqueue_timeout: Duration,
}

/// Consumer half of the event queue, owned by the hub task.
#[derive(Debug)]
pub struct EventQueueReceiver {
    receiver: mpsc::Receiver<HubMessage>,
}

impl EventQueue {
    /// Creates a queue holding at most `capacity` pending messages.
    ///
    /// A capacity of zero is treated as one.
    #[must_use]
    pub fn bounded(capacity: usize, enqueue_timeout: Duration) -> (Self, EventQueueReceiver) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                sender,
                enqueue_timeout,
            },
            EventQueueReceiver { receiver },
        )
    }

    /// Pushes a client event, waiting up to the enqueue timeout for space.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::QueueFull`] if the queue stayed full for the
    /// whole timeout (the event is dropped), or [`HubError::QueueClosed`]
    /// if the hub has stopped.
    pub async fn enqueue(&self, event: Event) -> Result<(), HubError> {
        self.sender
            .send_timeout(HubMessage::Event(event), self.enqueue_timeout)
            .await
            .map_err(|err| match err {
                SendTimeoutError::Timeout(_) => HubError::QueueFull {
                    timeout_ms: u64::try_from(self.enqueue_timeout.as_millis())
                        .unwrap_or(u64::MAX),
                },
                SendTimeoutError::Closed(_) => HubError::QueueClosed,
            })
    }

    /// Registers a connection's outbound sink with the hub.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::QueueClosed`] if the hub has stopped.
    pub async fn attach(
        &self,
        connection: ConnectionId,
        sink: Box<dyn ConnectionSink>,
    ) -> Result<(), HubError> {
        self.send(HubMessage::Attach { connection, sink }).await
    }

    /// Tells the hub a connection is gone.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::QueueClosed`] if the hub has stopped.
    pub async fn detach(&self, connection: ConnectionId) -> Result<(), HubError> {
        self.send(HubMessage::Detach { connection }).await
    }

    /// Asks the hub for the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::QueueClosed`] if the hub has stopped, or
    /// [`HubError::Unavailable`] if it dropped the request.
    pub async fn snapshot(&self) -> Result<Snapshot, HubError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubMessage::Query { reply }).await?;
        rx.await
            .map_err(|err| HubError::Unavailable(err.to_string()))
    }

    /// Returns the number of free slots right now.
    #[must_use]
    pub fn available(&self) -> usize {
        self.sender.capacity()
    }

    /// Returns `true` once the hub has dropped its receiver.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn send(&self, message: HubMessage) -> Result<(), HubError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| HubError::QueueClosed)
    }
}

impl EventQueueReceiver {
    /// Waits for the next message.
    ///
    /// Returns `None` once every producer has been dropped.
    pub async fn dequeue(&mut self) -> Option<HubMessage> {
        self.receiver.recv().await
    }
}
