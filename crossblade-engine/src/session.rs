//! Session state and event classification
//!
//! The host owns the game session (pause flag, combat tracker). Crossblade
//! reads a [`SessionSnapshot`] through [`SessionSource`] and derives the
//! current event from it with [`classify_event`].

use crossblade_common::config::CrossbladeSettings;
use crossblade_common::events::{EventLabel, TokenDisposition};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Point-in-time view of the host session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Game is paused
    #[serde(default)]
    pub paused: bool,

    /// Active combat encounter, if any
    #[serde(default)]
    pub combat: Option<CombatSnapshot>,
}

/// Combat encounter state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombatSnapshot {
    /// Combat has begun (round 1 or later)
    #[serde(default)]
    pub started: bool,

    /// Combatant whose turn it is
    #[serde(default)]
    pub combatant: Option<CombatantSnapshot>,
}

/// The combatant whose turn it is
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombatantSnapshot {
    #[serde(default)]
    pub name: Option<String>,

    /// Raw token disposition code; absent when the combatant has no token
    #[serde(default)]
    pub disposition: Option<i64>,
}

impl SessionSnapshot {
    /// Session in combat with the given combatant disposition
    pub fn in_combat(disposition: Option<i64>) -> Self {
        Self {
            paused: false,
            combat: Some(CombatSnapshot {
                started: true,
                combatant: Some(CombatantSnapshot {
                    name: None,
                    disposition,
                }),
            }),
        }
    }

    fn combat_started(&self) -> bool {
        self.combat.as_ref().is_some_and(|combat| combat.started)
    }

    fn active_disposition(&self) -> Option<TokenDisposition> {
        self.combat
            .as_ref()?
            .combatant
            .as_ref()?
            .disposition
            .and_then(TokenDisposition::from_raw)
    }
}

/// Derive the current event from session state
///
/// Priority order, first match wins:
/// 1. pause overrides everything when `pause_triggers_event` is set
/// 2. outside combat: `GAME: PAUSED` when paused, otherwise `DEFAULT`
/// 3. in combat: the active combatant's disposition, `DEFAULT` if unknown
pub fn classify_event(settings: &CrossbladeSettings, session: &SessionSnapshot) -> EventLabel {
    if settings.pause_triggers_event && session.paused {
        return EventLabel::game_paused();
    }
    if !session.combat_started() {
        return if session.paused {
            EventLabel::game_paused()
        } else {
            EventLabel::default()
        };
    }
    match session.active_disposition() {
        Some(disposition) => EventLabel::combatant(disposition),
        None => EventLabel::default(),
    }
}

/// Read access to the host session
pub trait SessionSource: Send + Sync {
    fn snapshot(&self) -> SessionSnapshot;
}

/// Session state pushed by the host
#[derive(Debug, Default)]
pub struct SharedSession {
    state: RwLock<SessionSnapshot>,
}

impl SharedSession {
    pub fn new(snapshot: SessionSnapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
        }
    }

    pub fn set(&self, snapshot: SessionSnapshot) {
        *self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = snapshot;
    }

    pub fn update(&self, apply: impl FnOnce(&mut SessionSnapshot)) {
        let mut state = self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        apply(&mut *state);
    }
}

impl SessionSource for SharedSession {
    fn snapshot(&self) -> SessionSnapshot {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
