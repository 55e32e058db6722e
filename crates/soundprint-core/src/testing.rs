//! Shared fixtures for unit tests

use crate::config::FingerprintConfig;
use crate::permutation::generate_for_config;
use crate::repository::Repository;
use crate::store::{FingerprintStore, MemoryStore};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use std::sync::Arc;

pub fn creation_config() -> FingerprintConfig {
    FingerprintConfig::tiny()
}

/// Query windows every 4 frames, so every stored window has an exact twin
pub fn query_config() -> FingerprintConfig {
    FingerprintConfig {
        stride: 4,
        ..FingerprintConfig::tiny()
    }
}

pub fn repository_with(store: Arc<dyn FingerprintStore>) -> Repository {
    let mut rng = StdRng::seed_from_u64(1234);
    let permutations = generate_for_config(&creation_config(), &mut rng).unwrap();
    Repository::new(
        store,
        Arc::new(permutations),
        creation_config(),
        query_config(),
    )
    .unwrap()
}

pub fn memory_repository() -> Repository {
    repository_with(Arc::new(MemoryStore::new()))
}

/// Seeded white noise in [-0.5, 0.5)
pub fn noise(seed: u64, len: usize) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(-0.5..0.5)).collect()
}

/// 16-bit mono WAV
pub fn write_wav(path: &Path, samples: &[f32], rate: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &s in samples {
        writer.write_sample((s * 32767.0) as i16).unwrap();
    }
    writer.finalize().unwrap();
}
