//! Domain layer: connection identity, events, and participant state.
//!
//! Everything here is plain data with no I/O. The [`SessionRegistry`] is
//! owned and mutated exclusively by the hub task in [`crate::service`].

pub mod connection_id;
pub mod event;
pub mod participant;
pub mod session_registry;

pub use connection_id::ConnectionId;
pub use event::Event;
pub use participant::{Participant, Snapshot, SnapshotEntry};
pub use session_registry::SessionRegistry;
