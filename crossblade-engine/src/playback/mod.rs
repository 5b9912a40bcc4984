//! Crossfade orchestration and local fade execution

pub mod controller;
pub mod fader;

pub use controller::{Controller, CrossfadePass, TrackFade};
pub use fader::{FadeBatch, FadeRequest, LocalFader};
