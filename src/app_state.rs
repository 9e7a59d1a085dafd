//! Shared application state injected into all Axum handlers.

use crate::service::EventQueue;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Producer half of the hub's event queue.
    pub queue: EventQueue,
    /// Per-connection outbound snapshot buffer size.
    pub outbound_buffer: usize,
}
