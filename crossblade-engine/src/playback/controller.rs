//! Crossfade controller
//!
//! Owns the current event and orchestrates crossfade passes: it decides which
//! playlists and tracks are eligible, builds their layer maps on demand, and
//! hands each track to the [`LocalFader`].
//!
//! The current event is the only piece of crossfade state. It starts as
//! `DEFAULT`, is overwritten verbatim by [`Controller::set_current_event`],
//! and is never persisted.

use crate::audio::{AudioEngine, SoundId};
use crate::error::{Error, Result};
use crate::layers::{LayerMap, LayerMapCache};
use crate::playback::fader::{FadeBatch, LocalFader};
use crate::playlist::{Playlist, PlaylistLibrary, PlaylistTrack, SoundLayerConfig, TrackRef};
use crate::session::{classify_event, SessionSource};
use crate::volume::CrossfadeContext;
use crossblade_common::config::CrossbladeSettings;
use crossblade_common::events::EventLabel;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Fades issued for one track during a pass
#[derive(Debug)]
pub struct TrackFade {
    pub track: TrackRef,
    pub batch: FadeBatch,
}

/// Result of a crossfade pass
#[derive(Debug, Default)]
pub struct CrossfadePass {
    tracks: Vec<TrackFade>,
}

impl CrossfadePass {
    pub fn tracks(&self) -> &[TrackFade] {
        &self.tracks
    }

    /// References of the tracks that were crossfaded
    pub fn track_refs(&self) -> Vec<TrackRef> {
        self.tracks.iter().map(|fade| fade.track.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Target requested for `sound` of `track`, if it was crossfaded
    pub fn target(&self, track: &TrackRef, sound: SoundId) -> Option<f32> {
        self.tracks
            .iter()
            .find(|fade| fade.track == *track)
            .and_then(|fade| fade.batch.target(sound))
    }

    /// Wait for every fade of the pass
    pub async fn settle(self) {
        for fade in self.tracks {
            fade.batch.settle().await;
        }
    }
}

#[derive(Debug, Default)]
struct Registry {
    library: PlaylistLibrary,
    layer_maps: LayerMapCache,
}

/// Crossfade orchestration for one participant
pub struct Controller {
    current_event: RwLock<EventLabel>,
    settings: RwLock<CrossbladeSettings>,
    registry: RwLock<Registry>,
    audio: Arc<dyn AudioEngine>,
    session: Arc<dyn SessionSource>,
    fader: LocalFader,
}

impl Controller {
    pub fn new(
        audio: Arc<dyn AudioEngine>,
        session: Arc<dyn SessionSource>,
        mut settings: CrossbladeSettings,
    ) -> Self {
        settings.normalize();
        Self {
            current_event: RwLock::new(EventLabel::default()),
            settings: RwLock::new(settings),
            registry: RwLock::new(Registry::default()),
            fader: LocalFader::new(Arc::clone(&audio)),
            audio,
            session,
        }
    }

    // ========================================================================
    // Event state
    // ========================================================================

    pub async fn current_event(&self) -> EventLabel {
        self.current_event.read().await.clone()
    }

    /// Overwrite the current event
    ///
    /// Labels are not validated; callers pass canonical labels.
    pub async fn set_current_event(&self, event: impl Into<EventLabel>) {
        let event = event.into();
        debug!("Current event set to {}", event);
        *self.current_event.write().await = event;
    }

    /// Classify the host session with the current settings
    pub async fn classify_event(&self) -> EventLabel {
        let settings = self.settings.read().await.clone();
        classify_event(&settings, &self.session.snapshot())
    }

    pub async fn settings(&self) -> CrossbladeSettings {
        self.settings.read().await.clone()
    }

    pub async fn update_settings(&self, mut settings: CrossbladeSettings) {
        settings.normalize();
        *self.settings.write().await = settings;
    }

    // ========================================================================
    // Library maintenance
    // ========================================================================

    /// Insert or replace a playlist mirrored from the host
    ///
    /// Cached layer maps of tracks whose layers, source, or base sound
    /// changed (or that were removed) are invalidated.
    pub async fn upsert_playlist(&self, playlist: Playlist) {
        let mut registry = self.registry.write().await;
        let Registry {
            library,
            layer_maps,
        } = &mut *registry;

        let playlist_id = playlist.id.clone();
        let previous = library.upsert(playlist);
        let Some(previous) = previous else {
            return;
        };
        let Some(current) = library.get(&playlist_id) else {
            return;
        };
        for old_track in &previous.sounds {
            let stale = current
                .track(&old_track.id)
                .map_or(true, |new_track| new_track.layers_changed(old_track));
            if stale {
                let track_ref = TrackRef::new(&playlist_id, &old_track.id);
                layer_maps.invalidate(&track_ref, old_track.base_sound, self.audio.as_ref());
            }
        }
    }

    /// Remove a playlist and drop its cached layer maps
    pub async fn remove_playlist(&self, playlist_id: &str) -> Option<Playlist> {
        let mut registry = self.registry.write().await;
        let Registry {
            library,
            layer_maps,
        } = &mut *registry;

        let removed = library.remove(playlist_id)?;
        for track in &removed.sounds {
            let track_ref = removed.track_ref(track);
            layer_maps.invalidate(&track_ref, track.base_sound, self.audio.as_ref());
        }
        Some(removed)
    }

    /// Modify one track in place
    ///
    /// Invalidates its layer map when the change affects layers.
    pub async fn update_track(
        &self,
        track_ref: &TrackRef,
        apply: impl FnOnce(&mut PlaylistTrack),
    ) -> Result<()> {
        let mut registry = self.registry.write().await;
        let Registry {
            library,
            layer_maps,
        } = &mut *registry;

        let track = library
            .track_mut(track_ref)
            .ok_or_else(|| Error::NotFound(format!("track {}", track_ref)))?;
        let before = track.clone();
        apply(&mut *track);
        if track.layers_changed(&before) {
            layer_maps.invalidate(track_ref, before.base_sound, self.audio.as_ref());
        }
        Ok(())
    }

    /// Replace the persisted layer configuration of a track
    pub async fn set_track_layers(
        &self,
        track_ref: &TrackRef,
        layers: Vec<SoundLayerConfig>,
    ) -> Result<()> {
        self.update_track(track_ref, |track| track.sound_layers = layers)
            .await
    }

    /// Remove all layer configuration of a track
    ///
    /// Returns the number of entries removed; clearing a track without
    /// configuration (or an unknown track) is a no-op returning 0.
    pub async fn clear_track_layers(&self, track_ref: &TrackRef) -> usize {
        let mut removed = 0;
        let result = self
            .update_track(track_ref, |track| {
                removed = std::mem::take(&mut track.sound_layers).len();
            })
            .await;
        if let Err(e) = result {
            debug!("Nothing to clear: {}", e);
        }
        removed
    }

    /// Force the layer map of a track to be rebuilt on next use
    pub async fn invalidate_layers(&self, track_ref: &TrackRef) -> bool {
        let mut registry = self.registry.write().await;
        let base_sound = registry
            .library
            .track(track_ref)
            .and_then(|(_, track)| track.base_sound);
        registry
            .layer_maps
            .invalidate(track_ref, base_sound, self.audio.as_ref())
    }

    /// Copy of a playlist
    pub async fn playlist(&self, playlist_id: &str) -> Option<Playlist> {
        self.registry.read().await.library.get(playlist_id).cloned()
    }

    /// Ids of the playlists currently playing
    pub async fn playing_playlist_ids(&self) -> Vec<String> {
        self.registry
            .read()
            .await
            .library
            .playing()
            .map(|playlist| playlist.id.clone())
            .collect()
    }

    /// Resolve a host document uuid to a known track
    pub async fn resolve_uuid(&self, uuid: &str) -> Option<TrackRef> {
        self.registry.read().await.library.resolve_uuid(uuid)
    }

    /// Layer map of a track, built on first use
    pub async fn layer_map(&self, track_ref: &TrackRef) -> Option<LayerMap> {
        let mut registry = self.registry.write().await;
        let Registry {
            library,
            layer_maps,
        } = &mut *registry;

        let (_, track) = library.track(track_ref)?;
        Some(
            layer_maps
                .get_or_build(track_ref, track, self.audio.as_ref())
                .clone(),
        )
    }

    // ========================================================================
    // Crossfading
    // ========================================================================

    /// Playlists with at least one track that has layers
    ///
    /// An empty id list considers every known playlist.
    pub async fn eligible_playlists(&self, playlist_ids: &[String]) -> Vec<String> {
        let mut registry = self.registry.write().await;
        let Registry {
            library,
            layer_maps,
        } = &mut *registry;

        let candidates: Vec<&Playlist> = if playlist_ids.is_empty() {
            library.playlists().iter().collect()
        } else {
            library.resolve(playlist_ids).collect()
        };

        candidates
            .into_iter()
            .filter(|playlist| {
                playlist.sounds.iter().any(|track| {
                    !layer_maps
                        .get_or_build(&playlist.track_ref(track), track, self.audio.as_ref())
                        .is_empty()
                })
            })
            .map(|playlist| playlist.id.clone())
            .collect()
    }

    /// Crossfade the playing layered tracks of the given playlists
    ///
    /// An empty id list means every playlist currently playing; unknown ids
    /// are dropped.
    pub async fn crossfade_playlists(&self, playlist_ids: &[String]) -> CrossfadePass {
        let tracks = {
            let mut registry = self.registry.write().await;
            let Registry {
                library,
                layer_maps,
            } = &mut *registry;

            let playlists: Vec<&Playlist> = if playlist_ids.is_empty() {
                library.playing().collect()
            } else {
                library.resolve(playlist_ids).collect()
            };
            debug!("Crossfading {} playlist(s)", playlists.len());

            let mut tracks = Vec::new();
            for playlist in playlists {
                for track in playlist.sounds.iter().filter(|track| track.playing) {
                    let track_ref = playlist.track_ref(track);
                    let map = layer_maps.get_or_build(&track_ref, track, self.audio.as_ref());
                    if !map.is_empty() {
                        tracks.push(track_ref);
                    }
                }
            }
            tracks
        };
        self.crossfade_sounds(&tracks).await
    }

    /// Resynchronize the given tracks against current volume targets
    ///
    /// Only tracks that are playing, or whose playlist is playing, are
    /// considered. Tracks that do not resolve or have no base sound are
    /// skipped.
    pub async fn crossfade_sounds(&self, tracks: &[TrackRef]) -> CrossfadePass {
        let event = self.current_event().await;
        let settings = self.settings().await;

        let mut registry = self.registry.write().await;
        let Registry {
            library,
            layer_maps,
        } = &mut *registry;

        let mut pass = CrossfadePass::default();
        for track_ref in tracks {
            let Some((playlist, track)) = library.track(track_ref) else {
                debug!("Track {} no longer exists, skipping", track_ref);
                continue;
            };
            if !(track.playing || playlist.playing) {
                continue;
            }
            let Some(base_sound) = track.base_sound else {
                continue;
            };

            info!("Handling crossfade for {}", track.name);
            let layers = layer_maps.get_or_build(track_ref, track, self.audio.as_ref());
            let context = CrossfadeContext {
                layers,
                base_sound: Some(base_sound),
                event: &event,
                enabled: settings.enabled,
            };
            let batch = self.fader.apply(&context, track.volume, &settings, true);
            pass.tracks.push(TrackFade {
                track: track_ref.clone(),
                batch,
            });
        }
        debug!("Crossfaded {} track(s) for {}", pass.len(), event);
        pass
    }

    /// Fade the layers of one track after a host volume change
    ///
    /// Mirrors a host-side volume slider: only layer sounds are faded, the
    /// host fades the base sound itself.
    pub async fn apply_local_fade(&self, track_ref: &TrackRef, volume: f32) -> Option<FadeBatch> {
        let event = self.current_event().await;
        let settings = self.settings().await;

        let mut registry = self.registry.write().await;
        let Registry {
            library,
            layer_maps,
        } = &mut *registry;

        let (_, track) = library.track(track_ref)?;
        let layers = layer_maps.get_or_build(track_ref, track, self.audio.as_ref());
        let context = CrossfadeContext {
            layers,
            base_sound: track.base_sound,
            event: &event,
            enabled: settings.enabled,
        };
        Some(self.fader.apply(&context, volume, &settings, false))
    }
}
