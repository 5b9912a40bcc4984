//! Local fade execution
//!
//! Turns the volume engine's targets into fade requests on the local audio
//! engine. Every sound is faded by its own task so a failing fade never
//! holds up or cancels its siblings. Superseding an in-flight fade is left
//! to the audio engine: a newer request on the same sound replaces the old
//! one.

use crate::audio::{AudioEngine, SoundId};
use crate::volume::{compute_volume, CrossfadeContext};
use crossblade_common::config::CrossbladeSettings;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A single requested fade
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeRequest {
    pub sound: SoundId,
    pub volume: f32,
}

/// Fades issued for one track
///
/// Dropping the batch detaches its tasks; [`settle`](Self::settle) waits
/// for them.
#[derive(Debug, Default)]
pub struct FadeBatch {
    requests: Vec<FadeRequest>,
    tasks: Vec<JoinHandle<()>>,
}

impl FadeBatch {
    pub fn requests(&self) -> &[FadeRequest] {
        &self.requests
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Target requested for `sound`, if any
    pub fn target(&self, sound: SoundId) -> Option<f32> {
        self.requests
            .iter()
            .find(|request| request.sound == sound)
            .map(|request| request.volume)
    }

    /// Wait for every fade task of the batch to finish
    pub async fn settle(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!("Fade task ended abnormally: {}", e);
            }
        }
    }
}

/// Applies computed volumes to local playback
pub struct LocalFader {
    audio: Arc<dyn AudioEngine>,
}

impl LocalFader {
    pub fn new(audio: Arc<dyn AudioEngine>) -> Self {
        Self { audio }
    }

    /// Fade every sound of a track towards its target for the current event
    ///
    /// `volume` is the track volume; the global playlist volume is applied
    /// here. Layer sounds are always faded, the base sound only when
    /// `include_base` is set. A track without a loaded base sound is left
    /// alone.
    pub fn apply(
        &self,
        context: &CrossfadeContext<'_>,
        volume: f32,
        settings: &CrossbladeSettings,
        include_base: bool,
    ) -> FadeBatch {
        let mut batch = FadeBatch::default();
        if context.base_sound.is_none() {
            return batch;
        }

        let local_volume = volume * settings.global_playlist_volume;
        let duration = settings.fade_duration();

        for sound in context.unique_sounds(include_base) {
            let target = compute_volume(context, sound, local_volume);
            debug!("Fading sound {} to {:.3}", sound, target);
            batch.requests.push(FadeRequest {
                sound,
                volume: target,
            });
            if let Some(task) = self.dispatch(sound, target, duration) {
                batch.tasks.push(task);
            }
        }
        batch
    }

    /// Issue one fade in its own task
    ///
    /// Outside a tokio runtime the fade is requested inline.
    fn dispatch(&self, sound: SoundId, volume: f32, duration: Duration) -> Option<JoinHandle<()>> {
        let audio = Arc::clone(&self.audio);
        match Handle::try_current() {
            Ok(handle) => Some(handle.spawn(async move {
                fade_logged(audio.as_ref(), sound, volume, duration);
            })),
            Err(_) => {
                fade_logged(audio.as_ref(), sound, volume, duration);
                None
            }
        }
    }
}

fn fade_logged(audio: &dyn AudioEngine, sound: SoundId, volume: f32, duration: Duration) {
    if let Err(e) = audio.fade(sound, volume, duration) {
        warn!("Fade of sound {} to {:.3} failed: {}", sound, volume, e);
    }
}
