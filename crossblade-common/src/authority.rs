//! Authority election
//!
//! Exactly one participant answers event classification queries: the
//! active, privileged participant with the smallest id. Ids are compared
//! ordinally (byte order), so every client elects the same leader
//! regardless of locale.

use serde::{Deserialize, Serialize};

/// A connected session participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Stable participant identifier
    pub id: String,
    /// Game-master privileges
    pub privileged: bool,
    /// Currently connected
    pub active: bool,
}

impl Participant {
    pub fn new(id: impl Into<String>, privileged: bool, active: bool) -> Self {
        Self {
            id: id.into(),
            privileged,
            active,
        }
    }

    /// Active privileged participant
    pub fn gm(id: impl Into<String>) -> Self {
        Self::new(id, true, true)
    }

    /// Active regular participant
    pub fn player(id: impl Into<String>) -> Self {
        Self::new(id, false, true)
    }

    pub fn is_eligible(&self) -> bool {
        self.privileged && self.active
    }
}

/// Elect the authoritative participant
///
/// Returns `None` when no active privileged participant exists.
///
/// # Examples
///
/// ```
/// use crossblade_common::authority::{elect_leader, Participant};
///
/// let roster = vec![
///     Participant::gm("b123"),
///     Participant::gm("a999"),
///     Participant::gm("c001"),
/// ];
/// assert_eq!(elect_leader(&roster).map(|p| p.id.as_str()), Some("a999"));
/// ```
pub fn elect_leader(participants: &[Participant]) -> Option<&Participant> {
    participants
        .iter()
        .filter(|p| p.is_eligible())
        .min_by(|a, b| a.id.as_bytes().cmp(b.id.as_bytes()))
}

/// Whether `participant_id` is the elected leader
pub fn is_leader(participant_id: &str, participants: &[Participant]) -> bool {
    elect_leader(participants).is_some_and(|leader| leader.id == participant_id)
}
