//! Playlist data as mirrored from the host
//!
//! The host owns playlists and their persistence; the controller keeps a
//! [`PlaylistLibrary`] copy that the host refreshes whenever a playlist or
//! one of its tracks changes.

use crate::audio::SoundId;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::debug;

/// Persisted layer entry: `{ src, events: [[CATEGORY, OPTION?], ...] }`
///
/// `events` stays as raw JSON so malformed entries can be dropped one by one
/// when the layer map is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoundLayerConfig {
    #[serde(default)]
    pub src: String,

    #[serde(default)]
    pub events: Vec<Value>,
}

impl SoundLayerConfig {
    /// Build an entry from `[CATEGORY, OPTION?]` string sequences
    pub fn new(src: &str, events: &[&[&str]]) -> Self {
        Self {
            src: src.to_string(),
            events: events
                .iter()
                .map(|event| Value::from(event.iter().map(|part| Value::from(*part)).collect::<Vec<_>>()))
                .collect(),
        }
    }

    /// Parse the persisted `soundLayers` flag
    ///
    /// A value that is not an array yields no layers; entries that are not
    /// objects of the expected shape are skipped.
    pub fn parse_flags(value: &Value) -> Vec<Self> {
        let Some(entries) = value.as_array() else {
            debug!("soundLayers flag is not an array, ignoring");
            return Vec::new();
        };
        entries
            .iter()
            .filter_map(|entry| match serde_json::from_value::<SoundLayerConfig>(entry.clone()) {
                Ok(layer) => Some(layer),
                Err(e) => {
                    debug!("Skipping malformed sound layer entry: {}", e);
                    None
                }
            })
            .collect()
    }
}

/// A playlist track (host "playlist sound")
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaylistTrack {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Source of the base sound
    #[serde(default)]
    pub path: String,

    /// Track volume (0.0-1.0) before the global playlist multiplier
    #[serde(default = "default_volume")]
    pub volume: f32,

    #[serde(default)]
    pub playing: bool,

    /// Host sound currently loaded for `path`
    #[serde(default)]
    pub base_sound: Option<SoundId>,

    /// Persisted layer configuration
    #[serde(default, deserialize_with = "deserialize_sound_layers")]
    pub sound_layers: Vec<SoundLayerConfig>,
}

fn default_volume() -> f32 {
    0.5
}

/// Host flags are not validated, so a bad entry drops only itself
fn deserialize_sound_layers<'de, D>(deserializer: D) -> Result<Vec<SoundLayerConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(SoundLayerConfig::parse_flags(&value))
}

impl PlaylistTrack {
    pub fn new(id: &str, name: &str, path: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            path: path.to_string(),
            volume: default_volume(),
            ..Self::default()
        }
    }

    /// Whether anything that feeds the layer map differs from `other`
    pub fn layers_changed(&self, other: &PlaylistTrack) -> bool {
        self.path != other.path
            || self.base_sound != other.base_sound
            || self.sound_layers != other.sound_layers
    }
}

/// A host playlist
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub playing: bool,

    #[serde(default)]
    pub sounds: Vec<PlaylistTrack>,
}

impl Playlist {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn track(&self, track_id: &str) -> Option<&PlaylistTrack> {
        self.sounds.iter().find(|track| track.id == track_id)
    }

    pub fn track_mut(&mut self, track_id: &str) -> Option<&mut PlaylistTrack> {
        self.sounds.iter_mut().find(|track| track.id == track_id)
    }

    pub fn track_ref(&self, track: &PlaylistTrack) -> TrackRef {
        TrackRef::new(&self.id, &track.id)
    }
}

/// Reference to a track within its playlist
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackRef {
    pub playlist_id: String,
    pub track_id: String,
}

const UUID_PLAYLIST: &str = "Playlist";
const UUID_SOUND: &str = "PlaylistSound";

impl TrackRef {
    pub fn new(playlist_id: &str, track_id: &str) -> Self {
        Self {
            playlist_id: playlist_id.to_string(),
            track_id: track_id.to_string(),
        }
    }

    /// Host document uuid: `Playlist.<playlist>.PlaylistSound.<track>`
    pub fn uuid(&self) -> String {
        format!(
            "{}.{}.{}.{}",
            UUID_PLAYLIST, self.playlist_id, UUID_SOUND, self.track_id
        )
    }

    /// Parse a host document uuid
    pub fn from_uuid(uuid: &str) -> Option<Self> {
        let mut parts = uuid.split('.');
        match (parts.next(), parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(UUID_PLAYLIST), Some(playlist_id), Some(UUID_SOUND), Some(track_id), None)
                if !playlist_id.is_empty() && !track_id.is_empty() =>
            {
                Some(Self::new(playlist_id, track_id))
            }
            _ => None,
        }
    }
}

impl fmt::Display for TrackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.playlist_id, self.track_id)
    }
}

/// The controller's copy of the host playlists
#[derive(Debug, Clone, Default)]
pub struct PlaylistLibrary {
    playlists: Vec<Playlist>,
}

impl PlaylistLibrary {
    pub fn new(playlists: Vec<Playlist>) -> Self {
        Self { playlists }
    }

    pub fn playlists(&self) -> &[Playlist] {
        &self.playlists
    }

    pub fn get(&self, playlist_id: &str) -> Option<&Playlist> {
        self.playlists.iter().find(|p| p.id == playlist_id)
    }

    pub fn get_mut(&mut self, playlist_id: &str) -> Option<&mut Playlist> {
        self.playlists.iter_mut().find(|p| p.id == playlist_id)
    }

    /// Playlists currently playing
    pub fn playing(&self) -> impl Iterator<Item = &Playlist> {
        self.playlists.iter().filter(|p| p.playing)
    }

    /// Resolve ids, silently dropping unknown ones
    pub fn resolve<'a>(&'a self, playlist_ids: &'a [String]) -> impl Iterator<Item = &'a Playlist> {
        self.playlists
            .iter()
            .filter(move |p| playlist_ids.iter().any(|id| *id == p.id))
    }

    pub fn track(&self, track_ref: &TrackRef) -> Option<(&Playlist, &PlaylistTrack)> {
        let playlist = self.get(&track_ref.playlist_id)?;
        let track = playlist.track(&track_ref.track_id)?;
        Some((playlist, track))
    }

    pub fn track_mut(&mut self, track_ref: &TrackRef) -> Option<&mut PlaylistTrack> {
        self.get_mut(&track_ref.playlist_id)?
            .track_mut(&track_ref.track_id)
    }

    /// Resolve a host document uuid to an existing track
    pub fn resolve_uuid(&self, uuid: &str) -> Option<TrackRef> {
        let track_ref = TrackRef::from_uuid(uuid)?;
        self.track(&track_ref).map(|_| track_ref)
    }

    /// Insert or replace a playlist, returning the previous version
    pub fn upsert(&mut self, playlist: Playlist) -> Option<Playlist> {
        match self.get_mut(&playlist.id) {
            Some(existing) => Some(std::mem::replace(existing, playlist)),
            None => {
                self.playlists.push(playlist);
                None
            }
        }
    }

    pub fn remove(&mut self, playlist_id: &str) -> Option<Playlist> {
        let index = self.playlists.iter().position(|p| p.id == playlist_id)?;
        Some(self.playlists.remove(index))
    }
}
