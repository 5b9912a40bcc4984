//! Common error types for Crossblade

use thiserror::Error;

/// Common result type for Crossblade operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the Crossblade crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parsing or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A sync message could not be delivered
    #[error("Transport error: {0}")]
    Transport(String),
}
