//! # Crossblade Common Library
//!
//! Shared code for the Crossblade crates including:
//! - Event labels and the event catalog (DEFAULT, COMBATANT, GAME, CUSTOM)
//! - Settings and TOML configuration loading
//! - Sync message types and the in-process SyncBus
//! - Authority election among session participants

pub mod authority;
pub mod config;
pub mod error;
pub mod events;
pub mod sync;

pub use authority::{elect_leader, is_leader, Participant};
pub use config::{CrossbladeSettings, LoggingConfig, TomlConfig};
pub use error::{Error, Result};
pub use events::{EventCategory, EventLabel, TokenDisposition};
pub use sync::{Envelope, SyncBus, SyncMessage, Transport};
