//! Soundprint Core - Wavelet Fingerprinting and Similarity Search
//!
//! Audio is turned into a log-frequency spectrogram, cut into overlapping
//! windows, and each window is reduced to a sparse binary signature of its
//! strongest Haar wavelet coefficients. Signatures are bucketed with MinHash
//! locality-sensitive hashing so similar audio can be found without
//! comparing against every stored window.

pub mod audio;
pub mod config;
pub mod debug;
pub mod encoder;
pub mod error;
pub mod hashing;
pub mod model;
pub mod permutation;
pub mod repository;
pub mod scan;
pub mod settings;
pub mod signature;
pub mod spectrogram;
pub mod store;
pub mod wavelet;

#[cfg(test)]
mod testing;

pub use config::FingerprintConfig;
pub use debug::JsonDumpHook;
pub use encoder::{encode_signature, ExtractedFingerprints, FingerprintPipeline};
pub use error::{Result, SoundprintError};
pub use hashing::{hamming_distance, jaccard_similarity, MinHasher};
pub use model::{Fingerprint, HashBin, NewTrack, PendingFingerprint, Tags, Track};
pub use permutation::{generate_for_config, generate_permutations, Permutations};
pub use repository::{
    InsertDebugHook, InsertReport, QueryOptions, QueryOutcome, QueryResult, Repository,
};
pub use scan::{scan_directory, CancelFlag, FileOutcome, FileReport, ScanOptions, ScanSummary};
pub use settings::SoundprintSettings;
pub use signature::Signature;
pub use spectrogram::{compute_spectrogram, Spectrogram};
pub use store::{open_store, FingerprintStore, MemoryStore, PostgresStore};
