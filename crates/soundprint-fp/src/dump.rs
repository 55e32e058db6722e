//! JSON debug dump of an inserted track
//!
//! Holds the log spectrogram and the set bit positions of every fingerprint
//! so they can be inspected or plotted outside the engine.

use serde::{Deserialize, Serialize};

/// Complete JSON dump file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintDump {
    pub version: String,
    pub metadata: DumpMetadata,
    pub spectrogram: DumpSpectrogram,
    pub fingerprints: Vec<DumpFingerprint>,
}

/// Metadata about the dumped track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpMetadata {
    pub track_id: i64,
    pub title: String,
    pub file_path: String,
    pub duration_ms: i64,
    pub signature_len: usize,
    pub created_at: String,
}

/// Log spectrogram, `[frame][bin]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpSpectrogram {
    pub num_frames: usize,
    pub num_bins: usize,
    pub frames: Vec<Vec<f32>>,
}

/// One fingerprint, stored sparsely
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpFingerprint {
    pub song_order: usize,
    pub set_bits: Vec<usize>,
}

impl FingerprintDump {
    /// Create a new dump without fingerprints
    pub fn new(
        track_id: i64,
        title: String,
        file_path: String,
        duration_ms: i64,
        signature_len: usize,
        frames: Vec<Vec<f32>>,
    ) -> Self {
        let num_frames = frames.len();
        let num_bins = frames.first().map(|f| f.len()).unwrap_or(0);

        Self {
            version: "1.0".to_string(),
            metadata: DumpMetadata {
                track_id,
                title,
                file_path,
                duration_ms,
                signature_len,
                created_at: chrono::Utc::now().to_rfc3339(),
            },
            spectrogram: DumpSpectrogram {
                num_frames,
                num_bins,
                frames,
            },
            fingerprints: Vec::new(),
        }
    }

    /// Add a fingerprint given the positions of its set bits
    pub fn add_fingerprint(&mut self, set_bits: Vec<usize>) {
        let song_order = self.fingerprints.len();
        self.fingerprints.push(DumpFingerprint {
            song_order,
            set_bits,
        });
    }

    /// Save to JSON file
    pub fn save(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json_str = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json_str)?;
        Ok(())
    }

    /// Load from JSON file
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let json_str = std::fs::read_to_string(path)?;
        let dump: FingerprintDump = serde_json::from_str(&json_str)?;
        Ok(dump)
    }
}
