//! Configuration loading
//!
//! Crossblade reads a small TOML file with two tables:
//!
//! ```toml
//! [crossblade]
//! enabled = true
//! pause_triggers_event = false
//! global_playlist_volume = 0.8
//! fade_debounce_ms = 100
//!
//! [logging]
//! level = "debug"
//! ```
//!
//! Every field has a built-in default. A missing file is not an error
//! (defaults are used with a warning); an unparsable file is.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{error, warn};

/// Runtime settings consumed by the crossfade engine
///
/// Mirrors the host's world settings: the module enable switch, whether a
/// paused game overrides combat events, and the host's global playlist volume
/// multiplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossbladeSettings {
    /// Master switch for layered crossfading
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// When true, a paused game yields `GAME: PAUSED` even during combat
    #[serde(default)]
    pub pause_triggers_event: bool,

    /// Multiplier applied to every locally faded volume (0.0-1.0)
    #[serde(default = "default_global_playlist_volume")]
    pub global_playlist_volume: f32,

    /// Fade duration, shared with the host's own volume-change debounce
    #[serde(default = "default_fade_debounce_ms")]
    pub fade_debounce_ms: u64,

    /// How long a non-leader waits for the leader's event classification
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    /// SyncBus channel capacity
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_global_playlist_volume() -> f32 {
    1.0
}

fn default_fade_debounce_ms() -> u64 {
    100 // host PlaylistSound volume debounce
}

fn default_query_timeout_ms() -> u64 {
    5000
}

fn default_bus_capacity() -> usize {
    100
}

impl Default for CrossbladeSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            pause_triggers_event: false,
            global_playlist_volume: default_global_playlist_volume(),
            fade_debounce_ms: default_fade_debounce_ms(),
            query_timeout_ms: default_query_timeout_ms(),
            bus_capacity: default_bus_capacity(),
        }
    }
}

impl CrossbladeSettings {
    pub fn fade_duration(&self) -> Duration {
        Duration::from_millis(self.fade_debounce_ms)
    }

    /// Clamp out-of-range values in place
    pub fn normalize(&mut self) {
        if !self.global_playlist_volume.is_finite() {
            warn!(
                "Invalid global_playlist_volume {}, using default",
                self.global_playlist_volume
            );
            self.global_playlist_volume = default_global_playlist_volume();
        }
        self.global_playlist_volume = self.global_playlist_volume.clamp(0.0, 1.0);
        if self.bus_capacity == 0 {
            self.bus_capacity = default_bus_capacity();
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Contents of `crossblade.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub crossblade: CrossbladeSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TomlConfig {
    /// Parse configuration text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let mut config: TomlConfig = toml::from_str(text)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.crossblade.normalize();
        Ok(config)
    }

    /// Load configuration from a file
    ///
    /// Read failures surface as [`Error::Io`], bad contents as [`Error::Config`].
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            error!("Failed to read config file {:?}: {}", path, e);
            Error::Io(e)
        })?;
        Self::from_toml_str(&text)
    }

    /// Load configuration, falling back to defaults when the file is absent
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }
        Self::load(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = CrossbladeSettings::default();
        assert!(settings.enabled);
        assert!(!settings.pause_triggers_event);
        assert_eq!(settings.global_playlist_volume, 1.0);
        assert_eq!(settings.fade_duration(), Duration::from_millis(100));
    }

    #[test]
    fn test_empty_text_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config, TomlConfig::default());
    }

    #[test]
    fn test_partial_table() {
        let config = TomlConfig::from_toml_str(
            "[crossblade]\npause_triggers_event = true\nglobal_playlist_volume = 0.5\n",
        )
        .unwrap();
        assert!(config.crossblade.enabled);
        assert!(config.crossblade.pause_triggers_event);
        assert_eq!(config.crossblade.global_playlist_volume, 0.5);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_volume_is_clamped() {
        let config =
            TomlConfig::from_toml_str("[crossblade]\nglobal_playlist_volume = 3.5\n").unwrap();
        assert_eq!(config.crossblade.global_playlist_volume, 1.0);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = TomlConfig::from_toml_str("[crossblade\nenabled = ");
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
