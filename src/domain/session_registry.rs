//! In-memory map from connection identity to participant state.
//!
//! [`SessionRegistry`] is plain data: it has no locks because the hub is
//! its only owner and mutates it from a single task.

use std::collections::HashMap;

use super::participant::{Participant, Snapshot, SnapshotEntry};
use super::ConnectionId;

/// Participant state for every connection that has spoken.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    participants: HashMap<ConnectionId, Participant>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the participant for `connection`, creating an empty one if
    /// the connection has not been seen before.
    pub fn upsert(&mut self, connection: ConnectionId) -> &mut Participant {
        self.participants.entry(connection).or_default()
    }

    /// Removes the participant for `connection`.
    ///
    /// Idempotent: returns `None` when the entry is already gone.
    pub fn remove(&mut self, connection: ConnectionId) -> Option<Participant> {
        self.participants.remove(&connection)
    }

    /// Returns the participant for `connection`, if any.
    #[must_use]
    pub fn get(&self, connection: ConnectionId) -> Option<&Participant> {
        self.participants.get(&connection)
    }

    /// Resets every participant's estimate, keeping names.
    pub fn clear_estimates(&mut self) {
        for participant in self.participants.values_mut() {
            participant.estimate = None;
        }
    }

    /// Builds the broadcast view in registry iteration order.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.participants.values().map(SnapshotEntry::from).collect()
    }

    /// Returns the number of participants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Returns `true` if the registry holds no participants.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}
