//! Crossfade volume engine
//!
//! Pure computation of the target volume of each sound of a track given the
//! current event. Nothing here touches audio or shared state: the caller
//! passes the current event and the track's layer map in a
//! [`CrossfadeContext`].

use crate::audio::SoundId;
use crate::layers::LayerMap;
use crossblade_common::events::EventLabel;
use std::collections::BTreeSet;

/// Everything the volume engine needs to know about one track
#[derive(Debug, Clone, Copy)]
pub struct CrossfadeContext<'a> {
    /// Track's layer map
    pub layers: &'a LayerMap,
    /// Track's base sound, if loaded
    pub base_sound: Option<SoundId>,
    /// Current event
    pub event: &'a EventLabel,
    /// Crossfade feature switch
    pub enabled: bool,
}

impl<'a> CrossfadeContext<'a> {
    /// Event used for matching
    ///
    /// A non-default event that no layer responds to falls back to DEFAULT.
    pub fn effective_event(&self) -> EventLabel {
        if !self.event.is_default() && !self.layers.responds_to(self.event) {
            EventLabel::default()
        } else {
            self.event.clone()
        }
    }

    /// Distinct layer sounds, optionally including the base sound
    pub fn unique_sounds(&self, include_base: bool) -> BTreeSet<SoundId> {
        let mut sounds: BTreeSet<SoundId> = self.layers.sounds().collect();
        if include_base {
            sounds.extend(self.base_sound);
        }
        sounds
    }

    /// Layer sounds other than the base sound
    pub fn layer_only_sounds(&self) -> BTreeSet<SoundId> {
        let mut sounds = self.unique_sounds(false);
        if let Some(base) = self.base_sound {
            sounds.remove(&base);
        }
        sounds
    }
}

/// Target volume of `sound` for the current event
///
/// - the base sound defaults to `base_volume`, every other sound to 0
/// - with crossfading disabled or no layers, the default stands
/// - when some layer responds to the (effective) event, responding layers
///   get `base_volume` and everything else, base sound included, gets 0
pub fn compute_volume(context: &CrossfadeContext<'_>, sound: SoundId, base_volume: f32) -> f32 {
    let is_base = context.base_sound == Some(sound);
    let default_volume = if is_base { base_volume } else { 0.0 };

    if !context.enabled || context.layers.is_empty() {
        return default_volume;
    }

    let event = context.effective_event();
    let active_layers = context
        .layers
        .layers()
        .filter(|layer| layer.responds_to(&event))
        .count();
    if active_layers == 0 {
        return default_volume;
    }

    match context.layers.get(sound) {
        Some(layer) if layer.responds_to(&event) => base_volume,
        Some(_) => 0.0,
        None if is_base => 0.0,
        // Not a sound of this track
        None => default_volume,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::Layer;

    fn layer(sound: SoundId, events: &[&str]) -> Layer {
        Layer {
            sound,
            src: format!("{}.ogg", sound),
            events: events.iter().map(|e| EventLabel::new(*e)).collect(),
        }
    }

    struct Fixture {
        base: SoundId,
        l1: SoundId,
        l2: SoundId,
        map: LayerMap,
    }

    fn fixture() -> Fixture {
        let base = SoundId::new();
        let l1 = SoundId::new();
        let l2 = SoundId::new();
        let mut map = LayerMap::new();
        map.insert(layer(l1, &["COMBATANT: HOSTILE"]));
        map.insert(layer(l2, &["DEFAULT"]));
        Fixture { base, l1, l2, map }
    }

    fn context<'a>(f: &'a Fixture, event: &'a EventLabel) -> CrossfadeContext<'a> {
        CrossfadeContext {
            layers: &f.map,
            base_sound: Some(f.base),
            event,
            enabled: true,
        }
    }

    #[test]
    fn test_hostile_event_activates_hostile_layer() {
        let f = fixture();
        let event = EventLabel::new("COMBATANT: HOSTILE");
        let ctx = context(&f, &event);

        assert_eq!(compute_volume(&ctx, f.base, 0.8), 0.0);
        assert_eq!(compute_volume(&ctx, f.l1, 0.8), 0.8);
        assert_eq!(compute_volume(&ctx, f.l2, 0.8), 0.0);
    }

    #[test]
    fn test_default_event_activates_default_layer() {
        let f = fixture();
        let event = EventLabel::default();
        let ctx = context(&f, &event);

        assert_eq!(compute_volume(&ctx, f.base, 0.8), 0.0);
        assert_eq!(compute_volume(&ctx, f.l1, 0.8), 0.0);
        assert_eq!(compute_volume(&ctx, f.l2, 0.8), 0.8);
    }

    #[test]
    fn test_unknown_event_without_default_layer_keeps_base() {
        let base = SoundId::new();
        let l1 = SoundId::new();
        let mut map = LayerMap::new();
        map.insert(layer(l1, &["COMBATANT: HOSTILE"]));
        let event = EventLabel::custom("FOO");
        let ctx = CrossfadeContext {
            layers: &map,
            base_sound: Some(base),
            event: &event,
            enabled: true,
        };

        assert_eq!(ctx.effective_event(), EventLabel::default());
        assert_eq!(compute_volume(&ctx, base, 0.8), 0.8);
        assert_eq!(compute_volume(&ctx, l1, 0.8), 0.0);
    }

    #[test]
    fn test_disabled_returns_default_targets() {
        let f = fixture();
        let event = EventLabel::new("COMBATANT: HOSTILE");
        let mut ctx = context(&f, &event);
        ctx.enabled = false;

        assert_eq!(compute_volume(&ctx, f.base, 0.6), 0.6);
        assert_eq!(compute_volume(&ctx, f.l1, 0.6), 0.0);
    }

    #[test]
    fn test_empty_map_returns_default_targets() {
        let map = LayerMap::new();
        let base = SoundId::new();
        for event in [EventLabel::default(), EventLabel::game_paused(), EventLabel::custom("X")] {
            let ctx = CrossfadeContext {
                layers: &map,
                base_sound: Some(base),
                event: &event,
                enabled: true,
            };
            assert_eq!(compute_volume(&ctx, base, 0.5), 0.5);
            assert_eq!(compute_volume(&ctx, SoundId::new(), 0.5), 0.0);
        }
    }

    #[test]
    fn test_category_only_layer_does_not_match_option() {
        let base = SoundId::new();
        let l1 = SoundId::new();
        let mut map = LayerMap::new();
        map.insert(layer(l1, &["COMBATANT"]));
        let event = EventLabel::new("COMBATANT: HOSTILE");
        let ctx = CrossfadeContext {
            layers: &map,
            base_sound: Some(base),
            event: &event,
            enabled: true,
        };

        assert_eq!(compute_volume(&ctx, base, 1.0), 1.0);
        assert_eq!(compute_volume(&ctx, l1, 1.0), 0.0);
    }

    #[test]
    fn test_base_sound_as_layer_follows_its_events() {
        let base = SoundId::new();
        let l1 = SoundId::new();
        let mut map = LayerMap::new();
        map.insert(layer(base, &["DEFAULT"]));
        map.insert(layer(l1, &["GAME: PAUSED"]));

        let paused = EventLabel::game_paused();
        let ctx = CrossfadeContext {
            layers: &map,
            base_sound: Some(base),
            event: &paused,
            enabled: true,
        };
        assert_eq!(compute_volume(&ctx, base, 0.7), 0.0);
        assert_eq!(compute_volume(&ctx, l1, 0.7), 0.7);

        let default = EventLabel::default();
        let ctx = CrossfadeContext { event: &default, ..ctx };
        assert_eq!(compute_volume(&ctx, base, 0.7), 0.7);
        assert_eq!(compute_volume(&ctx, l1, 0.7), 0.0);
    }

    #[test]
    fn test_unique_and_layer_only_sounds() {
        let f = fixture();
        let event = EventLabel::default();
        let ctx = context(&f, &event);

        assert_eq!(ctx.unique_sounds(false).len(), 2);
        assert_eq!(ctx.unique_sounds(true).len(), 3);
        assert!(!ctx.layer_only_sounds().contains(&f.base));

        let mut map = f.map.clone();
        map.insert(layer(f.base, &["GAME: PAUSED"]));
        let ctx = CrossfadeContext { layers: &map, ..ctx };
        assert_eq!(ctx.unique_sounds(true).len(), 3);
        assert_eq!(ctx.layer_only_sounds().len(), 2);
    }
}
