//! Typed instructions consumed by the hub.
//!
//! Every client frame decodes into one [`Event`]. Connection-scoped
//! variants carry the originating [`ConnectionId`]; the hub never infers
//! identity from the payload.

use super::ConnectionId;

/// Instruction originating from a client frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A connection asserts its display name.
    Register {
        /// Originating connection.
        connection: ConnectionId,
        /// Self-asserted display name.
        name: String,
    },

    /// A connection asserts a numeric estimate.
    Submit {
        /// Originating connection.
        connection: ConnectionId,
        /// Estimate in points.
        estimate: i64,
    },

    /// Request to disclose all current estimates.
    Reveal,

    /// Request to reset every participant's estimate.
    Clear,

    /// A frame whose `type` the hub does not understand.
    Unsupported {
        /// The raw `type` string as received.
        kind: String,
    },
}

impl Event {
    /// Returns the originating connection, if the variant carries one.
    #[must_use]
    pub const fn connection(&self) -> Option<ConnectionId> {
        match self {
            Self::Register { connection, .. } | Self::Submit { connection, .. } => {
                Some(*connection)
            }
            Self::Reveal | Self::Clear | Self::Unsupported { .. } => None,
        }
    }

    /// Returns the wire `type` tag for this event.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Register { .. } => "register",
            Self::Submit { .. } => "submit",
            Self::Reveal => "reveal",
            Self::Clear => "clear",
            Self::Unsupported { kind } => kind,
        }
    }
}
