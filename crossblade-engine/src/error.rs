//! Error types for crossblade-engine
//!
//! Defines engine error types using thiserror for clear error propagation.
//! Crossfade operations themselves never fail: these errors surface from the
//! host seams (sound creation, fades, transport) and are logged at the
//! boundary where a sound or track is dropped from the operation.

use thiserror::Error;

/// Main error type for crossblade-engine
#[derive(Error, Debug)]
pub enum Error {
    /// Errors from the common crate (config, IO, transport)
    #[error(transparent)]
    Common(#[from] crossblade_common::Error),

    /// Audio engine refused to create a sound for a layer source
    #[error("Sound creation failed for {src}: {reason}")]
    SoundCreation { src: String, reason: String },

    /// Audio engine rejected a fade request
    #[error("Fade failed: {0}")]
    Fade(String),

    /// Referenced playlist, track, or sound does not resolve
    #[error("Not found: {0}")]
    NotFound(String),

    /// No active privileged participant to answer an event query
    #[error("No authoritative participant available")]
    NoLeader,

    /// The leader did not answer an event query in time
    #[error("Event query timed out after {0} ms")]
    QueryTimeout(u64),

    /// Sync message could not be sent or its reply was dropped
    #[error("Sync error: {0}")]
    Sync(String),
}

/// Convenience Result type using crossblade-engine Error
pub type Result<T> = std::result::Result<T, Error>;
