//! Opaque identity of one live WebSocket connection.
//!
//! [`ConnectionId`] is a newtype wrapper around [`uuid::Uuid`] (v4). The
//! transport mints one per accepted socket; the hub only uses it as a key.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a connected client.
///
/// Generated once when the socket is accepted and immutable thereafter.
/// Used as the key of the [`super::SessionRegistry`] and of the
/// broadcaster's sink table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(uuid::Uuid);

impl ConnectionId {
    /// Creates a new random `ConnectionId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
