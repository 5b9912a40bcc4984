//! Token disposition codes as reported by the host

use serde::{Deserialize, Serialize};

/// Disposition of a combatant's token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenDisposition {
    Friendly,
    Neutral,
    Hostile,
}

impl TokenDisposition {
    /// Map the host's raw disposition code (1, 0, -1)
    ///
    /// Unknown codes yield `None`.
    pub fn from_raw(code: i64) -> Option<Self> {
        match code {
            1 => Some(TokenDisposition::Friendly),
            0 => Some(TokenDisposition::Neutral),
            -1 => Some(TokenDisposition::Hostile),
            _ => None,
        }
    }

    pub fn raw(&self) -> i64 {
        match self {
            TokenDisposition::Friendly => 1,
            TokenDisposition::Neutral => 0,
            TokenDisposition::Hostile => -1,
        }
    }

    /// Option key within the COMBATANT category
    pub fn option_key(&self) -> &'static str {
        match self {
            TokenDisposition::Friendly => "FRIENDLY",
            TokenDisposition::Neutral => "NEUTRAL",
            TokenDisposition::Hostile => "HOSTILE",
        }
    }
}
