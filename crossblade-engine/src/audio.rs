//! Audio engine seam
//!
//! Crossblade never decodes or mixes audio. It asks the host's audio engine
//! to create sounds for layer sources and to fade them to target volumes.
//! [`RecordingAudioEngine`] is an in-memory implementation for dry runs.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use uuid::Uuid;

/// Handle to a sound owned by the host audio engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoundId(Uuid);

impl SoundId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SoundId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Host audio engine operations used by crossfading
pub trait AudioEngine: Send + Sync {
    /// Create a non-preloaded, non-singleton sound for `src`
    fn create_sound(&self, src: &str) -> Result<SoundId>;

    /// Whether the sound failed to load after creation
    fn is_failed(&self, _sound: SoundId) -> bool {
        false
    }

    /// Fade `sound` to `volume` over `duration`
    ///
    /// A new fade on the same sound replaces any fade still in flight.
    fn fade(&self, sound: SoundId, volume: f32, duration: Duration) -> Result<()>;

    /// Release a layer sound that is no longer referenced
    fn release(&self, _sound: SoundId) {}
}

/// A fade as seen by [`RecordingAudioEngine`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordedFade {
    pub sound: SoundId,
    pub volume: f32,
    pub duration: Duration,
}

#[derive(Debug, Default)]
struct Recording {
    sources: HashMap<SoundId, String>,
    fades: Vec<RecordedFade>,
    released: Vec<SoundId>,
    failing_sources: HashSet<String>,
    broken_sources: HashSet<String>,
}

/// In-memory audio engine that records every request
///
/// Sources registered with [`fail_source`](Self::fail_source) are refused at
/// creation; sources registered with [`break_source`](Self::break_source)
/// are created but report `is_failed`.
#[derive(Debug, Default)]
pub struct RecordingAudioEngine {
    inner: Mutex<Recording>,
}

impl RecordingAudioEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Recording> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register an existing host sound (e.g. a track's base sound)
    pub fn register(&self, src: &str) -> SoundId {
        let id = SoundId::new();
        self.lock().sources.insert(id, src.to_string());
        id
    }

    /// Refuse to create sounds for `src`
    pub fn fail_source(&self, src: &str) {
        self.lock().failing_sources.insert(src.to_string());
    }

    /// Create sounds for `src` in a failed state
    pub fn break_source(&self, src: &str) {
        self.lock().broken_sources.insert(src.to_string());
    }

    pub fn source_of(&self, sound: SoundId) -> Option<String> {
        self.lock().sources.get(&sound).cloned()
    }

    /// All fades requested so far, in request order
    pub fn fades(&self) -> Vec<RecordedFade> {
        self.lock().fades.clone()
    }

    /// Most recent fade target per sound
    pub fn last_volumes(&self) -> HashMap<SoundId, f32> {
        self.lock()
            .fades
            .iter()
            .map(|fade| (fade.sound, fade.volume))
            .collect()
    }

    pub fn last_volume(&self, sound: SoundId) -> Option<f32> {
        self.lock()
            .fades
            .iter()
            .rev()
            .find(|fade| fade.sound == sound)
            .map(|fade| fade.volume)
    }

    pub fn released(&self) -> Vec<SoundId> {
        self.lock().released.clone()
    }

    pub fn clear_fades(&self) {
        self.lock().fades.clear();
    }
}

impl AudioEngine for RecordingAudioEngine {
    fn create_sound(&self, src: &str) -> Result<SoundId> {
        let mut recording = self.lock();
        if recording.failing_sources.contains(src) {
            return Err(Error::SoundCreation {
                src: src.to_string(),
                reason: "source refused by audio engine".to_string(),
            });
        }
        let id = SoundId::new();
        recording.sources.insert(id, src.to_string());
        Ok(id)
    }

    fn is_failed(&self, sound: SoundId) -> bool {
        let recording = self.lock();
        recording
            .sources
            .get(&sound)
            .is_some_and(|src| recording.broken_sources.contains(src))
    }

    fn fade(&self, sound: SoundId, volume: f32, duration: Duration) -> Result<()> {
        let mut recording = self.lock();
        if !recording.sources.contains_key(&sound) {
            return Err(Error::Fade(format!("unknown sound {}", sound)));
        }
        recording.fades.push(RecordedFade {
            sound,
            volume,
            duration,
        });
        Ok(())
    }

    fn release(&self, sound: SoundId) {
        let mut recording = self.lock();
        recording.sources.remove(&sound);
        recording.released.push(sound);
    }
}
