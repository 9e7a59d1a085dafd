//! Shared helpers for integration tests: spawn a real server on an
//! ephemeral port and talk to it over WebSocket.

#![allow(dead_code, missing_docs, clippy::panic)]

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use pointing_hub::api::build_app;
use pointing_hub::app_state::AppState;
use pointing_hub::service::EventQueue;
use pointing_hub::service::hub;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Running server plus a handle to its queue.
#[derive(Debug)]
pub struct TestServer {
    pub addr: SocketAddr,
    pub queue: EventQueue,
}

impl TestServer {
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Spawns hub + router on `127.0.0.1:0`.
pub async fn spawn_server(outbound_buffer: usize) -> TestServer {
    let (queue, _hub) = hub::start(1000, Duration::from_secs(5));
    serve_queue(queue, outbound_buffer).await
}

/// Spawns only the router on `127.0.0.1:0`; the caller consumes `queue`.
pub async fn serve_queue(queue: EventQueue, outbound_buffer: usize) -> TestServer {
    let app = build_app(AppState {
        queue: queue.clone(),
        outbound_buffer,
    });
    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind failed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("no local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    TestServer { addr, queue }
}

pub async fn connect(server: &TestServer) -> Client {
    let Ok((client, _)) = connect_async(server.ws_url()).await else {
        panic!("ws connect failed");
    };
    client
}

pub async fn send_json(client: &mut Client, value: serde_json::Value) {
    let Ok(()) = client.send(Message::text(value.to_string())).await else {
        panic!("ws send failed");
    };
}

/// Waits for the next snapshot frame, sorted by username.
pub async fn next_snapshot(client: &mut Client) -> Vec<serde_json::Value> {
    loop {
        let next = tokio::time::timeout(Duration::from_secs(5), client.next()).await;
        let Ok(Some(Ok(message))) = next else {
            panic!("expected a snapshot frame");
        };
        if let Message::Text(text) = message {
            let Ok(serde_json::Value::Array(mut entries)) = serde_json::from_str(text.as_str())
            else {
                panic!("snapshot should be a JSON array");
            };
            entries.sort_by_key(|e| {
                e.get("username")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_owned)
            });
            return entries;
        }
    }
}

pub fn entry(name: &str, points: Option<i64>) -> serde_json::Value {
    serde_json::json!({ "username": name, "pokerPoints": points })
}
