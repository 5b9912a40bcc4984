//! Event labels for the Crossblade event system
//!
//! An event is a discrete classification of session state. Its canonical
//! string form is either `CATEGORY` or `CATEGORY: OPTION`, for example
//! `DEFAULT`, `COMBATANT: HOSTILE` or `GAME: PAUSED`. Layer maps and the
//! current event are compared by exact string equality on this form.

// Sub-modules (supporting types)
mod catalog;
mod disposition;

pub use catalog::{EventCategory, CATEGORIES};
pub use disposition::TokenDisposition;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between category and option in a canonical label
pub const OPTION_SEPARATOR: &str = ": ";

/// Canonical event label
///
/// Any string is accepted. Callers are expected to pass canonical labels,
/// but nothing is validated against the catalog: CUSTOM events carry
/// free-form options and the current event is set verbatim from sync
/// messages.
///
/// # Examples
///
/// ```
/// use crossblade_common::events::{EventLabel, TokenDisposition};
///
/// let label = EventLabel::combatant(TokenDisposition::Hostile);
/// assert_eq!(label.as_str(), "COMBATANT: HOSTILE");
/// assert_eq!(label.option(), Some("HOSTILE"));
/// assert!(EventLabel::default().is_default());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLabel(String);

impl EventLabel {
    /// Key of the fallback event
    pub const DEFAULT_KEY: &'static str = "DEFAULT";

    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Build a label from its parts (`CATEGORY` or `CATEGORY: OPTION`)
    pub fn from_parts(category: &str, option: Option<&str>) -> Self {
        match option {
            Some(option) => Self(format!("{category}{OPTION_SEPARATOR}{option}")),
            None => Self(category.to_string()),
        }
    }

    /// `GAME: PAUSED`
    pub fn game_paused() -> Self {
        Self::from_parts(EventCategory::Game.key(), Some("PAUSED"))
    }

    /// `COMBATANT: <disposition>`
    pub fn combatant(disposition: TokenDisposition) -> Self {
        Self::from_parts(EventCategory::Combatant.key(), Some(disposition.option_key()))
    }

    /// `CUSTOM: <name>`
    pub fn custom(name: &str) -> Self {
        Self::from_parts(EventCategory::Custom.key(), Some(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0 == Self::DEFAULT_KEY
    }

    /// Category part of the label, if it names a known category
    pub fn category(&self) -> Option<EventCategory> {
        let key = self
            .0
            .split_once(OPTION_SEPARATOR)
            .map_or(self.0.as_str(), |(category, _)| category);
        EventCategory::from_key(key)
    }

    /// Option part of the label, if any
    pub fn option(&self) -> Option<&str> {
        self.0
            .split_once(OPTION_SEPARATOR)
            .map(|(_, option)| option)
    }
}

impl Default for EventLabel {
    fn default() -> Self {
        Self(Self::DEFAULT_KEY.to_string())
    }
}

impl fmt::Display for EventLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventLabel {
    fn from(label: &str) -> Self {
        Self(label.to_string())
    }
}

impl From<String> for EventLabel {
    fn from(label: String) -> Self {
        Self(label)
    }
}

impl AsRef<str> for EventLabel {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for EventLabel {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for EventLabel {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
