//! Layer maps
//!
//! A layer map associates each layer sound of a track with the set of events
//! it is audible for. Maps are built from the track's persisted layer
//! configuration on first use and cached in a side-table keyed by track,
//! so host track objects are never mutated.

use crate::audio::{AudioEngine, SoundId};
use crate::playlist::{PlaylistTrack, TrackRef};
use crossblade_common::events::{EventLabel, OPTION_SEPARATOR};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

/// One audible layer of a track
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub sound: SoundId,
    pub src: String,
    pub events: BTreeSet<EventLabel>,
}

impl Layer {
    pub fn responds_to(&self, event: &EventLabel) -> bool {
        self.events.contains(event)
    }
}

/// Layer sound → events it responds to
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerMap {
    layers: BTreeMap<SoundId, Layer>,
}

impl LayerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a layer; an existing layer for the same sound is replaced
    pub fn insert(&mut self, layer: Layer) -> Option<Layer> {
        self.layers.insert(layer.sound, layer)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn get(&self, sound: SoundId) -> Option<&Layer> {
        self.layers.get(&sound)
    }

    pub fn contains(&self, sound: SoundId) -> bool {
        self.layers.contains_key(&sound)
    }

    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }

    /// Distinct layer sounds
    pub fn sounds(&self) -> impl Iterator<Item = SoundId> + '_ {
        self.layers.keys().copied()
    }

    /// Whether any layer lists `event`
    pub fn responds_to(&self, event: &EventLabel) -> bool {
        self.layers.values().any(|layer| layer.responds_to(event))
    }
}

/// Normalize one persisted event entry
///
/// Entries are sequences like `["COMBATANT", "HOSTILE"]`; the first two
/// elements are joined with `": "`. Non-sequences and empty sequences are
/// rejected.
pub fn normalize_event(entry: &Value) -> Option<EventLabel> {
    let parts = entry.as_array().filter(|parts| !parts.is_empty())?;
    let label = parts
        .iter()
        .take(2)
        .map(part_to_string)
        .collect::<Vec<_>>()
        .join(OPTION_SEPARATOR);
    Some(EventLabel::new(label))
}

fn part_to_string(part: &Value) -> String {
    match part {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Find or create the sound for a layer source
///
/// The base sound is reused when it is loaded from the same source.
/// Creation errors are logged and yield `None`.
fn resolve_layer_sound(track: &PlaylistTrack, src: &str, audio: &dyn AudioEngine) -> Option<SoundId> {
    if let Some(base) = track.base_sound {
        if track.path == src {
            return Some(base);
        }
    }
    match audio.create_sound(src) {
        Ok(sound) => Some(sound),
        Err(e) => {
            warn!("Could not create layer sound for {}: {}", src, e);
            None
        }
    }
}

/// Build the layer map of a track from its persisted configuration
///
/// Entries without a source or without events are skipped, as are entries
/// whose sound cannot be created or has failed. When several entries resolve
/// to the same sound the last one wins.
pub fn build_layer_map(track: &PlaylistTrack, audio: &dyn AudioEngine) -> LayerMap {
    debug!("Building layer map for {}", track.name);
    let mut map = LayerMap::new();

    // Sounds can only be bound to a persisted track with a source
    if track.id.is_empty() || track.path.is_empty() {
        return map;
    }

    for entry in &track.sound_layers {
        if entry.src.is_empty() || entry.events.is_empty() {
            continue;
        }
        let Some(sound) = resolve_layer_sound(track, &entry.src, audio) else {
            continue;
        };
        if audio.is_failed(sound) {
            warn!("Layer sound {} failed to load, skipping", entry.src);
            if Some(sound) != track.base_sound {
                audio.release(sound);
            }
            continue;
        }
        let events = entry.events.iter().filter_map(normalize_event).collect();
        map.insert(Layer {
            sound,
            src: entry.src.clone(),
            events,
        });
    }

    debug!("Layer map for {} has {} layer(s)", track.name, map.len());
    map
}

/// Side-table of layer maps keyed by track
#[derive(Debug, Default)]
pub struct LayerMapCache {
    maps: HashMap<TrackRef, LayerMap>,
}

impl LayerMapCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, track_ref: &TrackRef) -> Option<&LayerMap> {
        self.maps.get(track_ref)
    }

    /// Cached map for the track, built on first use
    pub fn get_or_build(
        &mut self,
        track_ref: &TrackRef,
        track: &PlaylistTrack,
        audio: &dyn AudioEngine,
    ) -> &LayerMap {
        self.maps
            .entry(track_ref.clone())
            .or_insert_with(|| build_layer_map(track, audio))
    }

    /// Drop the cached map and release its layer-only sounds
    ///
    /// `base_sound` is never released; it belongs to the host track.
    pub fn invalidate(
        &mut self,
        track_ref: &TrackRef,
        base_sound: Option<SoundId>,
        audio: &dyn AudioEngine,
    ) -> bool {
        let Some(map) = self.maps.remove(track_ref) else {
            return false;
        };
        for sound in map.sounds().filter(|sound| Some(*sound) != base_sound) {
            audio.release(sound);
        }
        debug!("Invalidated layer map for {}", track_ref);
        true
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::RecordingAudioEngine;
    use crate::playlist::SoundLayerConfig;
    use serde_json::json;

    fn track_with(layers: Vec<SoundLayerConfig>, audio: &RecordingAudioEngine) -> PlaylistTrack {
        let mut track = PlaylistTrack::new("s1", "Theme", "theme.ogg");
        track.base_sound = Some(audio.register("theme.ogg"));
        track.sound_layers = layers;
        track
    }

    #[test]
    fn test_single_layer() {
        let audio = RecordingAudioEngine::new();
        let track = track_with(vec![SoundLayerConfig::new("a.ogg", &[&["COMBATANT", "HOSTILE"]])], &audio);

        let map = build_layer_map(&track, &audio);
        assert_eq!(map.len(), 1);
        let layer = map.layers().next().unwrap();
        assert_eq!(layer.src, "a.ogg");
        assert_eq!(
            layer.events.iter().map(EventLabel::as_str).collect::<Vec<_>>(),
            vec!["COMBATANT: HOSTILE"]
        );
    }

    #[test]
    fn test_normalize_event() {
        assert_eq!(normalize_event(&json!(["DEFAULT"])).unwrap(), "DEFAULT");
        assert_eq!(normalize_event(&json!(["GAME", "PAUSED", "extra"])).unwrap(), "GAME: PAUSED");
        assert_eq!(normalize_event(&json!(["CUSTOM", 3])).unwrap(), "CUSTOM: 3");
        assert_eq!(normalize_event(&json!(["CUSTOM", null])).unwrap(), "CUSTOM: ");
        assert!(normalize_event(&json!([])).is_none());
        assert!(normalize_event(&json!("DEFAULT")).is_none());
        assert!(normalize_event(&json!({ "category": "GAME" })).is_none());
    }

    #[test]
    fn test_malformed_events_are_filtered() {
        let audio = RecordingAudioEngine::new();
        let layer = SoundLayerConfig {
            src: "a.ogg".to_string(),
            events: vec![json!("GAME"), json!([]), json!(["GAME", "PAUSED"])],
        };
        let map = build_layer_map(&track_with(vec![layer], &audio), &audio);
        let events: Vec<_> = map.layers().next().unwrap().events.iter().cloned().collect();
        assert_eq!(events, vec![EventLabel::game_paused()]);
    }

    #[test]
    fn test_entries_without_src_or_events_are_skipped() {
        let audio = RecordingAudioEngine::new();
        let track = track_with(
            vec![
                SoundLayerConfig::new("", &[&["DEFAULT"]]),
                SoundLayerConfig::new("b.ogg", &[]),
            ],
            &audio,
        );
        assert!(build_layer_map(&track, &audio).is_empty());
    }

    #[test]
    fn test_base_sound_is_reused_for_matching_src() {
        let audio = RecordingAudioEngine::new();
        let track = track_with(vec![SoundLayerConfig::new("theme.ogg", &[&["DEFAULT"]])], &audio);

        let map = build_layer_map(&track, &audio);
        assert!(map.contains(track.base_sound.unwrap()));
    }

    #[test]
    fn test_failed_sounds_are_skipped() {
        let audio = RecordingAudioEngine::new();
        audio.fail_source("missing.ogg");
        audio.break_source("corrupt.ogg");
        let track = track_with(
            vec![
                SoundLayerConfig::new("missing.ogg", &[&["DEFAULT"]]),
                SoundLayerConfig::new("corrupt.ogg", &[&["DEFAULT"]]),
                SoundLayerConfig::new("ok.ogg", &[&["DEFAULT"]]),
            ],
            &audio,
        );
        let map = build_layer_map(&track, &audio);
        assert_eq!(map.len(), 1);
        let ok = map.layers().next().unwrap();
        assert_eq!(ok.src, "ok.ogg");

        // The corrupt sound was created, so it goes back to the engine
        let released = audio.released();
        assert_eq!(released.len(), 1);
        assert_ne!(released[0], ok.sound);
        assert_ne!(Some(released[0]), track.base_sound);
        assert_eq!(audio.source_of(released[0]), None);
    }

    #[test]
    fn test_failed_base_sound_is_not_released() {
        let audio = RecordingAudioEngine::new();
        audio.break_source("theme.ogg");
        let track = track_with(vec![SoundLayerConfig::new("theme.ogg", &[&["DEFAULT"]])], &audio);

        assert!(build_layer_map(&track, &audio).is_empty());
        assert!(audio.released().is_empty());
    }

    #[test]
    fn test_shared_sound_last_write_wins() {
        let audio = RecordingAudioEngine::new();
        let track = track_with(
            vec![
                SoundLayerConfig::new("theme.ogg", &[&["COMBATANT", "HOSTILE"]]),
                SoundLayerConfig::new("theme.ogg", &[&["GAME", "PAUSED"]]),
            ],
            &audio,
        );
        let map = build_layer_map(&track, &audio);
        assert_eq!(map.len(), 1);
        let layer = map.get(track.base_sound.unwrap()).unwrap();
        assert!(layer.responds_to(&EventLabel::game_paused()));
        assert!(!layer.responds_to(&EventLabel::new("COMBATANT: HOSTILE")));
    }

    #[test]
    fn test_track_without_path_has_no_layers() {
        let audio = RecordingAudioEngine::new();
        let mut track = PlaylistTrack::new("s1", "Theme", "");
        track.sound_layers = vec![SoundLayerConfig::new("a.ogg", &[&["DEFAULT"]])];
        assert!(build_layer_map(&track, &audio).is_empty());
    }

    #[test]
    fn test_cache_builds_once_and_releases_layer_sounds() {
        let audio = RecordingAudioEngine::new();
        let track = track_with(
            vec![
                SoundLayerConfig::new("theme.ogg", &[&["DEFAULT"]]),
                SoundLayerConfig::new("a.ogg", &[&["COMBATANT", "HOSTILE"]]),
            ],
            &audio,
        );
        let track_ref = TrackRef::new("p1", "s1");
        let mut cache = LayerMapCache::new();

        let first = cache.get_or_build(&track_ref, &track, &audio).clone();
        let second = cache.get_or_build(&track_ref, &track, &audio).clone();
        assert_eq!(first, second);

        assert!(cache.invalidate(&track_ref, track.base_sound, &audio));
        let released = audio.released();
        assert_eq!(released.len(), 1);
        assert_ne!(Some(released[0]), track.base_sound);

        assert!(!cache.invalidate(&track_ref, track.base_sound, &audio));
        assert!(cache.is_empty());
    }
}
