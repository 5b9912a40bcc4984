//! Event category catalog
//!
//! Enumerates the closed set of event categories together with the
//! localization keys a host UI needs to present them.

use serde::{Deserialize, Serialize};

/// Event categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventCategory {
    /// Fallback when nothing more specific applies
    Default,
    /// Disposition of the combatant whose turn it is
    Combatant,
    /// Game-wide state such as pause
    Game,
    /// User-defined triggers with free-form options
    Custom,
}

/// All categories in presentation order
pub const CATEGORIES: [EventCategory; 4] = [
    EventCategory::Default,
    EventCategory::Combatant,
    EventCategory::Game,
    EventCategory::Custom,
];

impl EventCategory {
    /// Canonical key used in event labels
    pub fn key(&self) -> &'static str {
        match self {
            EventCategory::Default => "DEFAULT",
            EventCategory::Combatant => "COMBATANT",
            EventCategory::Game => "GAME",
            EventCategory::Custom => "CUSTOM",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        CATEGORIES.into_iter().find(|category| category.key() == key)
    }

    /// Localization key of the category name
    pub fn label_key(&self) -> &'static str {
        match self {
            EventCategory::Default => "CROSSBLADE.Events.Default.Label",
            EventCategory::Combatant => "CROSSBLADE.Events.Combatant.Label",
            EventCategory::Game => "CROSSBLADE.Events.Game.Label",
            EventCategory::Custom => "CROSSBLADE.Events.Custom.Label",
        }
    }

    /// Localization key of the category description
    pub fn description_key(&self) -> &'static str {
        match self {
            EventCategory::Default => "CROSSBLADE.Events.Default.Description",
            EventCategory::Combatant => "CROSSBLADE.Events.Combatant.Description",
            EventCategory::Game => "CROSSBLADE.Events.Game.Description",
            EventCategory::Custom => "CROSSBLADE.Events.Custom.Description",
        }
    }

    /// Fixed options as `(option key, localization key)` pairs
    ///
    /// Empty for DEFAULT (no options) and CUSTOM (free-form options).
    pub fn options(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            EventCategory::Combatant => &[
                ("FRIENDLY", "TOKEN.FRIENDLY"),
                ("NEUTRAL", "TOKEN.NEUTRAL"),
                ("HOSTILE", "TOKEN.HOSTILE"),
            ],
            EventCategory::Game => &[("PAUSED", "GAME.Paused")],
            EventCategory::Default | EventCategory::Custom => &[],
        }
    }

    /// Whether options are entered by the user instead of picked from `options()`
    pub fn is_custom(&self) -> bool {
        matches!(self, EventCategory::Custom)
    }

    /// Whether `option` is acceptable for this category
    pub fn accepts_option(&self, option: &str) -> bool {
        self.is_custom() || self.options().iter().any(|(key, _)| *key == option)
    }
}
