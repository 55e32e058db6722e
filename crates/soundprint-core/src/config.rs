//! Fingerprinting parameters
//!
//! One instance drives track creation, a second, denser one drives queries.

use crate::error::{Result, SoundprintError};
use serde::{Deserialize, Serialize};

/// Parameters of the spectrogram, wavelet, encoder and hashing stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintConfig {
    // Audio
    pub sampling_rate: u32,
    pub seconds_to_analyze: u32,

    // Spectrogram
    pub window_size: usize,
    pub overlap: usize,
    pub start_frequency: f32,
    pub end_frequency: f32,
    pub log_bins: usize,

    // Analysis windows
    pub fingerprint_length: usize,
    /// Frames between the start of two consecutive analysis windows
    pub stride: usize,
    pub top_wavelets: usize,

    // LSH
    pub number_of_hash_tables: usize,
    pub number_of_keys: usize,
    pub start_index: usize,
    pub end_index: usize,

    // Query only
    pub optimized_signature_count: usize,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            sampling_rate: 32000,
            seconds_to_analyze: 60,

            window_size: 2048,
            overlap: 1984,
            start_frequency: 40.0,
            end_frequency: 16000.0,
            log_bins: 32,

            fingerprint_length: 128,
            stride: 80,
            top_wavelets: 200,

            number_of_hash_tables: 25,
            number_of_keys: 16,
            start_index: 0,
            end_index: 32 * 128,

            optimized_signature_count: 64,
        }
    }
}

impl FingerprintConfig {
    /// Query preset: same analysis as creation, denser windows
    pub fn query() -> Self {
        Self {
            stride: 16,
            ..Self::default()
        }
    }

    /// Samples between two spectrogram frames
    pub fn hop_size(&self) -> usize {
        self.window_size - self.overlap
    }

    /// Bits per signature
    pub fn signature_len(&self) -> usize {
        self.log_bins * self.fingerprint_length
    }

    /// Smallest buffer that yields at least one analysis window
    pub fn min_samples(&self) -> usize {
        let one_window = self.window_size + (self.fingerprint_length - 1) * self.hop_size();
        (self.window_size + self.overlap).max(one_window)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| -> Result<()> { Err(SoundprintError::Configuration(msg)) };

        if self.sampling_rate == 0 {
            return fail("sampling_rate must be > 0".into());
        }
        if self.window_size == 0 || self.overlap >= self.window_size {
            return fail(format!(
                "overlap ({}) must be < window_size ({})",
                self.overlap, self.window_size
            ));
        }
        if !(self.start_frequency > 0.0 && self.start_frequency < self.end_frequency) {
            return fail("start_frequency must be > 0 and < end_frequency".into());
        }
        if self.end_frequency > self.sampling_rate as f32 / 2.0 {
            return fail(format!(
                "end_frequency ({}) exceeds Nyquist ({})",
                self.end_frequency,
                self.sampling_rate / 2
            ));
        }
        if !self.log_bins.is_power_of_two() {
            return fail(format!("log_bins ({}) must be a power of two", self.log_bins));
        }
        if !self.fingerprint_length.is_power_of_two() {
            return fail(format!(
                "fingerprint_length ({}) must be a power of two",
                self.fingerprint_length
            ));
        }
        if self.stride == 0 {
            return fail("stride must be > 0".into());
        }
        if self.top_wavelets == 0 || self.top_wavelets > self.signature_len() {
            return fail(format!(
                "top_wavelets ({}) must be in 1..={}",
                self.top_wavelets,
                self.signature_len()
            ));
        }
        if self.number_of_hash_tables == 0 {
            return fail("number_of_hash_tables must be > 0".into());
        }
        if self.number_of_keys == 0 || self.number_of_keys > 63 {
            return fail(format!(
                "number_of_keys ({}) must be in 1..=63",
                self.number_of_keys
            ));
        }
        if self.start_index >= self.end_index || self.end_index > self.signature_len() {
            return fail(format!(
                "index range {}..{} must be non-empty and within 0..{}",
                self.start_index,
                self.end_index,
                self.signature_len()
            ));
        }
        if self.number_of_keys > self.end_index - self.start_index {
            return fail(format!(
                "cannot draw {} distinct keys from {} indices",
                self.number_of_keys,
                self.end_index - self.start_index
            ));
        }
        Ok(())
    }

    /// Small parameters for fast unit tests
    #[cfg(test)]
    pub(crate) fn tiny() -> Self {
        Self {
            sampling_rate: 8000,
            seconds_to_analyze: 60,
            window_size: 256,
            overlap: 192,
            start_frequency: 100.0,
            end_frequency: 4000.0,
            log_bins: 16,
            fingerprint_length: 16,
            stride: 8,
            top_wavelets: 40,
            number_of_hash_tables: 12,
            number_of_keys: 6,
            start_index: 0,
            end_index: 256,
            optimized_signature_count: 4,
        }
    }
}
