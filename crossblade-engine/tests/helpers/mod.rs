//! Test helpers for crossblade-engine integration tests
//!
//! Provides a controller wired to a [`RecordingAudioEngine`] and builders for
//! layered playlists.

#![allow(dead_code)]

use std::sync::Arc;

use crossblade_common::config::CrossbladeSettings;
use crossblade_engine::{
    Controller, Playlist, PlaylistTrack, RecordingAudioEngine, SessionSnapshot, SharedSession,
    SoundId, SoundLayerConfig, TrackRef,
};

/// Controller plus the host doubles behind it
pub struct Harness {
    pub audio: Arc<RecordingAudioEngine>,
    pub session: Arc<SharedSession>,
    pub controller: Arc<Controller>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(CrossbladeSettings::default())
    }

    pub fn with_settings(settings: CrossbladeSettings) -> Self {
        let audio = Arc::new(RecordingAudioEngine::new());
        let session = Arc::new(SharedSession::new(SessionSnapshot::default()));
        let controller = Arc::new(Controller::new(audio.clone(), session.clone(), settings));
        Self {
            audio,
            session,
            controller,
        }
    }

    /// Playing track with a loaded base sound
    pub fn track(&self, id: &str, path: &str, volume: f32, layers: Vec<SoundLayerConfig>) -> PlaylistTrack {
        let mut track = PlaylistTrack::new(id, &format!("Track {}", id), path);
        track.volume = volume;
        track.playing = true;
        track.base_sound = Some(self.audio.register(path));
        track.sound_layers = layers;
        track
    }

    /// Playing playlist holding the given tracks
    pub fn playlist(&self, id: &str, tracks: Vec<PlaylistTrack>) -> Playlist {
        let mut playlist = Playlist::new(id, &format!("Playlist {}", id));
        playlist.playing = true;
        playlist.sounds = tracks;
        playlist
    }

    /// Battle playlist `p1` with track `s1` (volume 0.8):
    /// `hostile.ogg` on `COMBATANT: HOSTILE`, `calm.ogg` on `DEFAULT`
    pub async fn battle(&self) -> Battle {
        let track = self.track(
            "s1",
            "theme.ogg",
            0.8,
            vec![
                SoundLayerConfig::new("hostile.ogg", &[&["COMBATANT", "HOSTILE"]]),
                SoundLayerConfig::new("calm.ogg", &[&["DEFAULT"]]),
            ],
        );
        let base = track.base_sound.unwrap();
        self.controller
            .upsert_playlist(self.playlist("p1", vec![track]))
            .await;

        let track_ref = TrackRef::new("p1", "s1");
        let hostile = self.layer_sound(&track_ref, "hostile.ogg").await;
        let calm = self.layer_sound(&track_ref, "calm.ogg").await;
        Battle {
            track_ref,
            base,
            hostile,
            calm,
        }
    }

    /// Sound of the layer with source `src`
    pub async fn layer_sound(&self, track_ref: &TrackRef, src: &str) -> SoundId {
        let map = self.controller.layer_map(track_ref).await.unwrap();
        let sound = map
            .layers()
            .find(|layer| layer.src == src)
            .map(|layer| layer.sound)
            .unwrap();
        sound
    }
}

/// Sounds of the battle fixture
pub struct Battle {
    pub track_ref: TrackRef,
    pub base: SoundId,
    pub hostile: SoundId,
    pub calm: SoundId,
}
