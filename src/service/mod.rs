//! Service layer: the event queue, the hub, and the broadcaster.
//!
//! Connection tasks push [`HubMessage`]s into the [`EventQueue`]; a single
//! [`Hub`] task applies them to the session registry and fans snapshots
//! out through the [`Broadcaster`].

pub mod broadcaster;
pub mod event_queue;
pub mod hub;

pub use broadcaster::{BroadcastReport, Broadcaster, ChannelSink, ConnectionSink};
pub use event_queue::{EventQueue, EventQueueReceiver, HubMessage};
pub use hub::Hub;
