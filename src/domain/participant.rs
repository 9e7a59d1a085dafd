//! Per-connection estimation state and its broadcast view.

use serde::Serialize;
use utoipa::ToSchema;

/// Estimation state tied to one live connection.
///
/// Both fields start unset. `name` is written by `Register` (last write
/// wins) and `estimate` by `Submit`; `Clear` resets only the estimate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Participant {
    /// Self-asserted display name.
    pub name: Option<String>,
    /// Most recently submitted estimate.
    pub estimate: Option<i64>,
}

impl Participant {
    /// Creates a participant with no name and no estimate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// One element of the broadcast array.
///
/// Serializes as `{"username": ..., "pokerPoints": ...}` with `null` for
/// unset fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SnapshotEntry {
    /// Participant display name, `null` if never registered.
    pub username: Option<String>,
    /// Participant estimate, `null` if not submitted or cleared.
    #[serde(rename = "pokerPoints")]
    pub poker_points: Option<i64>,
}

impl From<&Participant> for SnapshotEntry {
    fn from(participant: &Participant) -> Self {
        Self {
            username: participant.name.clone(),
            poker_points: participant.estimate,
        }
    }
}

/// Ordered view of every participant at broadcast time.
///
/// Order follows registry iteration and is not stable across broadcasts.
pub type Snapshot = Vec<SnapshotEntry>;
