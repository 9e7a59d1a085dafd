//! Inbound WebSocket frame format and decoding into hub events.
//!
//! Clients send one JSON object per frame:
//!
//! ```json
//! { "type": "register", "data": { "username": "alice", "pokerPoints": null } }
//! ```
//!
//! Outbound frames are the snapshot array produced by the broadcaster.

use serde::{Deserialize, Deserializer};

use crate::domain::{ConnectionId, Event};
use crate::error::HubError;

/// A JSON field that distinguishes "missing" from "explicitly null".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Field<T> {
    /// The key was not present.
    #[default]
    Absent,
    /// The key was present with a `null` value.
    Null,
    /// The key was present with a value.
    Present(T),
}

impl<T> Field<T> {
    /// Returns a short description of why no value is available.
    #[must_use]
    pub const fn describe(&self) -> &'static str {
        match self {
            Self::Absent => "missing",
            Self::Null => "null",
            Self::Present(_) => "present",
        }
    }
}

// Only invoked when the key exists; `#[serde(default)]` covers `Absent`.
impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<T>::deserialize(deserializer)?.map_or(Self::Null, Self::Present))
    }
}

/// Payload of an inbound frame.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrameData {
    /// Display name, required for `register`.
    #[serde(default)]
    pub username: Field<String>,
    /// Estimate, required for `submit`.
    #[serde(default, rename = "pokerPoints")]
    pub poker_points: Field<i64>,
}

/// One client → server frame.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundFrame {
    /// Event discriminator: `register`, `submit`, `reveal`, or `clear`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Variant-specific fields.
    #[serde(default)]
    pub data: FrameData,
}

impl InboundFrame {
    /// Parses a frame from raw JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Decode`] if the text is not a valid frame.
    pub fn parse(bytes: &[u8]) -> Result<Self, HubError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Converts the frame into an [`Event`] attributed to `connection`.
    ///
    /// Unknown `type` values become [`Event::Unsupported`] so the hub can
    /// log them.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Decode`] if `register` lacks a username or
    /// `submit` lacks an estimate.
    pub fn into_event(self, connection: ConnectionId) -> Result<Event, HubError> {
        match self.kind.as_str() {
            "register" => match self.data.username {
                Field::Present(name) => Ok(Event::Register { connection, name }),
                other => Err(HubError::Decode(format!(
                    "register requires data.username (was {})",
                    other.describe()
                ))),
            },
            "submit" => match self.data.poker_points {
                Field::Present(estimate) => Ok(Event::Submit {
                    connection,
                    estimate,
                }),
                other => Err(HubError::Decode(format!(
                    "submit requires data.pokerPoints (was {})",
                    other.describe()
                ))),
            },
            "reveal" => Ok(Event::Reveal),
            "clear" => Ok(Event::Clear),
            _ => Ok(Event::Unsupported { kind: self.kind }),
        }
    }
}

/// Parses and converts a raw frame in one step.
///
/// # Errors
///
/// Returns [`HubError::Decode`] for malformed JSON or missing required
/// fields.
pub fn decode_event(bytes: &[u8], connection: ConnectionId) -> Result<Event, HubError> {
    InboundFrame::parse(bytes)?.into_event(connection)
}
