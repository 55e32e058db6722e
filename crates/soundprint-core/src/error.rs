//! Error taxonomy of the fingerprinting engine

use thiserror::Error;

/// Errors raised by the pipeline stages and the repository
#[derive(Debug, Error)]
pub enum SoundprintError {
    /// Empty or too-short audio, malformed image dimensions, length mismatch
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Missing or inconsistent permutation set, invalid configuration values
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The store could not complete a read or write
    #[error("persistence error: {0:#}")]
    Persistence(anyhow::Error),

    /// Upstream audio decoding failed
    #[error("decode error: {0}")]
    Decode(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SoundprintError>;

impl SoundprintError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        SoundprintError::InvalidInput(msg.into())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        SoundprintError::Configuration(msg.into())
    }
}
