//! Fingerprint encoding
//!
//! Keeps the sign of the `top_wavelets` largest-magnitude wavelet
//! coefficients at their row-major positions.

use crate::config::FingerprintConfig;
use crate::error::{Result, SoundprintError};
use crate::signature::Signature;
use crate::spectrogram::{compute_spectrogram, Spectrogram};
use crate::wavelet::{analysis_windows, decompose_image};
use rayon::prelude::*;
use std::time::Instant;

/// Encode one decomposed image into a signature of `rows * cols` bits
///
/// Ranking is by absolute value, descending; equal magnitudes keep their
/// row-major order so the output is reproducible bit for bit.
pub fn encode_signature(image: &[Vec<f64>], top_wavelets: usize) -> Result<Signature> {
    let cols = image.first().map(|r| r.len()).unwrap_or(0);
    if cols == 0 || image.iter().any(|r| r.len() != cols) {
        return Err(SoundprintError::invalid(
            "cannot encode an empty or ragged coefficient image",
        ));
    }

    let coefficients: Vec<f64> = image.iter().flatten().copied().collect();
    let mut order: Vec<usize> = (0..coefficients.len()).collect();
    // sort_by is stable
    order.sort_by(|&a, &b| coefficients[b].abs().total_cmp(&coefficients[a].abs()));

    let mut signature = Signature::new(coefficients.len());
    for &index in order.iter().take(top_wavelets) {
        if coefficients[index] > 0.0 {
            signature.set(index, true);
        }
    }
    Ok(signature)
}

/// Spectrogram and per-window signatures of one buffer
#[derive(Debug, Clone)]
pub struct ExtractedFingerprints {
    pub spectrogram: Spectrogram,
    pub signatures: Vec<Signature>,
}

/// Spectrogram, wavelet and encoder stages chained together
#[derive(Debug, Clone)]
pub struct FingerprintPipeline {
    config: FingerprintConfig,
}

impl FingerprintPipeline {
    pub fn new(config: FingerprintConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FingerprintConfig {
        &self.config
    }

    /// Fingerprint an already padded mono buffer
    pub fn run(&self, samples: &[f32]) -> Result<ExtractedFingerprints> {
        let started = Instant::now();

        let spectrogram = compute_spectrogram(samples, &self.config)?;
        let windows = analysis_windows(&spectrogram, &self.config);
        if windows.is_empty() {
            return Err(SoundprintError::invalid(format!(
                "{} spectrogram frames do not fill one {}-frame window",
                spectrogram.num_frames, self.config.fingerprint_length
            )));
        }

        let top_wavelets = self.config.top_wavelets;
        let signatures = windows
            .into_par_iter()
            .map(|mut image| {
                decompose_image(&mut image)?;
                encode_signature(&image, top_wavelets)
            })
            .collect::<Result<Vec<_>>>()?;

        log::debug!(
            "Extracted {} signatures from {} frames in {:?}",
            signatures.len(),
            spectrogram.num_frames,
            started.elapsed()
        );

        Ok(ExtractedFingerprints {
            spectrogram,
            signatures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrogram::pad_for_analysis;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_sign_of_top_coefficients() {
        let image = vec![vec![0.1, -5.0], vec![3.0, -0.2]];
        let sig = encode_signature(&image, 2).unwrap();
        // top two: -5.0 (index 1, negative) and 3.0 (index 2, positive)
        assert_eq!(sig.len(), 4);
        assert_eq!(sig.ones().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_ties_resolved_by_scan_order() {
        let image = vec![vec![1.0, 1.0, 1.0, 1.0]];
        let sig = encode_signature(&image, 2).unwrap();
        assert_eq!(sig.ones().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_sparsity_and_determinism() {
        let mut rng = StdRng::seed_from_u64(3);
        let image: Vec<Vec<f64>> = (0..8)
            .map(|_| (0..8).map(|_| rng.gen_range(0.5..2.0)).collect())
            .collect();

        let first = encode_signature(&image, 10).unwrap();
        let second = encode_signature(&image, 10).unwrap();
        assert_eq!(first, second);
        // all coefficients positive and non-zero
        assert_eq!(first.count_ones(), 10);
    }

    #[test]
    fn test_zero_coefficients_stay_unset() {
        let image = vec![vec![0.0; 4]; 2];
        let sig = encode_signature(&image, 5).unwrap();
        assert_eq!(sig.count_ones(), 0);
    }

    #[test]
    fn test_rejects_ragged_image() {
        let image = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(encode_signature(&image, 1).is_err());
    }

    #[test]
    fn test_pipeline_window_count() {
        let config = FingerprintConfig::tiny();
        let pipeline = FingerprintPipeline::new(config.clone()).unwrap();

        let mut rng = StdRng::seed_from_u64(11);
        let samples: Vec<f32> = (0..8000).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let extracted = pipeline.run(&samples).unwrap();

        let frames = (8000 - config.window_size) / config.hop_size() + 1;
        let windows = (frames - config.fingerprint_length) / config.stride + 1;
        assert_eq!(extracted.spectrogram.num_frames, frames);
        assert_eq!(extracted.signatures.len(), windows);
        assert!(extracted
            .signatures
            .iter()
            .all(|s| s.len() == config.signature_len() && s.count_ones() <= config.top_wavelets));
    }

    #[test]
    fn test_pipeline_on_padded_short_buffer() {
        let config = FingerprintConfig::tiny();
        let pipeline = FingerprintPipeline::new(config.clone()).unwrap();

        let padded = pad_for_analysis(&[0.5; 100], &config).unwrap();
        assert_eq!(pipeline.run(&padded).unwrap().signatures.len(), 1);

        let unpadded = vec![0.5; config.window_size];
        assert!(matches!(
            pipeline.run(&unpadded),
            Err(SoundprintError::InvalidInput(_))
        ));
    }
}
