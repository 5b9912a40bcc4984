//! # Crossblade Engine (crossblade-engine)
//!
//! Event-driven layered crossfading for tabletop session playlists.
//!
//! **Purpose:** Classify the session into an event, build per-track layer
//! maps from persisted configuration, compute target volumes, and fade local
//! sounds towards them. A [`Synchronizer`] keeps every participant on the
//! same event.
//!
//! **Architecture:** The host owns audio, playlists, and the session. It is
//! reached through the [`AudioEngine`] and [`SessionSource`] traits and
//! through [`Transport`](crossblade_common::sync::Transport) for messages.

pub mod audio;
pub mod error;
pub mod layers;
pub mod playback;
pub mod playlist;
pub mod session;
pub mod sync;
pub mod volume;

pub use audio::{AudioEngine, RecordingAudioEngine, SoundId};
pub use error::{Error, Result};
pub use layers::{build_layer_map, Layer, LayerMap, LayerMapCache};
pub use playback::{Controller, CrossfadePass, FadeBatch, LocalFader};
pub use playlist::{Playlist, PlaylistLibrary, PlaylistTrack, SoundLayerConfig, TrackRef};
pub use session::{classify_event, SessionSnapshot, SessionSource, SharedSession};
pub use sync::Synchronizer;
pub use volume::{compute_volume, CrossfadeContext};
