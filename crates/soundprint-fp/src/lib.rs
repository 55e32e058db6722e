//! Soundprint file formats: permutation artifact and debug dumps

pub mod dump;
pub mod permutations;

pub use dump::{DumpFingerprint, DumpMetadata, DumpSpectrogram, FingerprintDump};
pub use permutations::{FormatError, PermutationFile};
