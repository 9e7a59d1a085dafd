//! WebSocket connection task.
//!
//! Each accepted socket gets a reader loop that decodes client frames into
//! the hub's [`EventQueue`] and a spawned writer task that forwards
//! snapshots from its outbound channel. The writer keeps draining while
//! the reader waits on a full queue. The connection ends on a client
//! close, a read or write error, a malformed frame, or eviction by the hub.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::messages::decode_event;
use crate::domain::ConnectionId;
use crate::error::HubError;
use crate::service::{ChannelSink, EventQueue};

/// How long the writer may take to flush and close after detach.
const WRITER_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// What the read loop does after handling a frame.
enum ReadOutcome {
    Continue,
    Stop,
}

/// Runs a single WebSocket connection until it ends.
///
/// - Registers an outbound channel of `outbound_capacity` snapshots with
///   the hub.
/// - Spawns a writer that forwards snapshots to the client.
/// - Decodes every text or binary frame into an event and enqueues it.
/// - Stops reading as soon as the hub evicts the connection.
/// - Detaches from the hub on exit.
pub async fn run_connection(socket: WebSocket, queue: EventQueue, outbound_capacity: usize) {
    let connection = ConnectionId::new();
    let (out_tx, out_rx) = mpsc::channel::<Arc<str>>(outbound_capacity.max(1));
    let (sink, mut evicted) = ChannelSink::new(out_tx);
    if let Err(err) = queue.attach(connection, Box::new(sink)).await {
        tracing::warn!(%connection, error = %err, "hub unavailable; dropping connection");
        return;
    }
    tracing::debug!(%connection, "ws connection established");

    let (ws_tx, mut ws_rx) = socket.split();
    let mut writer = tokio::spawn(write_snapshots(ws_tx, out_rx, connection));

    let writer_finished = loop {
        tokio::select! {
            // Incoming frame from client
            msg = ws_rx.next() => {
                let outcome = match msg {
                    Some(Ok(Message::Text(text))) => {
                        forward_frame(text.as_str().as_bytes(), connection, &queue).await
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        forward_frame(&bytes, connection, &queue).await
                    }
                    Some(Ok(Message::Close(_))) | None => ReadOutcome::Stop,
                    Some(Err(err)) => {
                        tracing::debug!(%connection, error = %err, "ws read error");
                        ReadOutcome::Stop
                    }
                    Some(Ok(_)) => ReadOutcome::Continue,
                };
                if matches!(outcome, ReadOutcome::Stop) {
                    break false;
                }
            }
            // Hub closed our sink
            _ = &mut evicted => {
                tracing::debug!(%connection, "evicted by hub");
                break false;
            }
            // Writer gave up on the socket
            _ = &mut writer => break true,
        }
    };

    if let Err(err) = queue.detach(connection).await {
        tracing::debug!(%connection, error = %err, "hub gone before detach");
    }
    // Detach drops the hub's sender, which lets the writer flush and close.
    if !writer_finished
        && tokio::time::timeout(WRITER_SHUTDOWN_GRACE, &mut writer)
            .await
            .is_err()
    {
        tracing::debug!(%connection, "writer did not finish; aborting");
        writer.abort();
    }
    tracing::debug!(%connection, "ws connection closed");
}

/// Forwards snapshots to the client until the hub drops the sender or a
/// write fails, then closes the socket.
async fn write_snapshots<S>(
    mut ws_tx: S,
    mut out_rx: mpsc::Receiver<Arc<str>>,
    connection: ConnectionId,
) where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    while let Some(json) = out_rx.recv().await {
        if let Err(err) = ws_tx.send(Message::text(json.to_string())).await {
            tracing::debug!(%connection, error = %err, "ws write error");
            return;
        }
    }
    if let Err(err) = ws_tx.close().await {
        tracing::debug!(%connection, error = %err, "ws close failed");
    }
}

/// Decodes one frame and pushes it into the queue.
async fn forward_frame(bytes: &[u8], connection: ConnectionId, queue: &EventQueue) -> ReadOutcome {
    let event = match decode_event(bytes, connection) {
        Ok(event) => event,
        Err(err) => {
            tracing::warn!(%connection, error = %err, "closing connection on malformed frame");
            return ReadOutcome::Stop;
        }
    };

    match queue.enqueue(event).await {
        Ok(()) => ReadOutcome::Continue,
        Err(err @ HubError::QueueFull { .. }) => {
            tracing::warn!(%connection, error = %err, "event dropped");
            ReadOutcome::Continue
        }
        Err(err) => {
            tracing::warn!(%connection, error = %err, "hub unavailable; closing connection");
            ReadOutcome::Stop
        }
    }
}
