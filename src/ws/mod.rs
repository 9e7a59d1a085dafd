//! WebSocket layer: upgrade handler, connection task, frame decoding.
//!
//! The endpoint at `/ws` is the only way clients talk to the hub. Every
//! connection decodes its frames into events and receives a snapshot
//! after each state change.

pub mod connection;
pub mod handler;
pub mod messages;
