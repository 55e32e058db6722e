//! Audio decoding and resampling
//!
//! Supports WAV, MP3, FLAC and OGG Vorbis using pure Rust decoders. Output
//! is always a mono buffer at the requested sample rate.

mod decoder;
mod resample;

pub use decoder::{decode_audio, header_duration, AudioData};
pub use resample::resample_linear;

use std::path::Path;

/// Supported audio formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
    Flac,
    Ogg,
    Unknown,
}

impl AudioFormat {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("wav") | Some("wave") => AudioFormat::Wav,
            Some("mp3") => AudioFormat::Mp3,
            Some("flac") => AudioFormat::Flac,
            Some("ogg") => AudioFormat::Ogg,
            _ => AudioFormat::Unknown,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Flac => "flac",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Unknown => "unknown",
        }
    }
}

/// Whether the scanner should pick up this file
pub fn is_supported(path: &Path) -> bool {
    AudioFormat::from_path(path) != AudioFormat::Unknown
}
