//! Log-frequency spectrogram
//!
//! Hann-windowed FFT frames folded into logarithmically spaced bands
//! between `start_frequency` and `end_frequency`.

use crate::config::FingerprintConfig;
use crate::error::{Result, SoundprintError};
use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;

/// Floor applied before taking the logarithm of band energy
const ENERGY_FLOOR: f32 = 1e-10;

/// Spectrogram representation
#[derive(Debug, Clone)]
pub struct Spectrogram {
    /// Log energy values [time_frame][log_bin]
    pub frames: Vec<Vec<f32>>,
    /// Number of time frames
    pub num_frames: usize,
    /// Number of log bins
    pub num_bins: usize,
}

/// Zero-pad a decoded buffer so it yields at least one analysis window
pub fn pad_for_analysis(samples: &[f32], config: &FingerprintConfig) -> Result<Vec<f32>> {
    if samples.is_empty() {
        return Err(SoundprintError::invalid("audio buffer is empty"));
    }
    let mut padded = samples.to_vec();
    if padded.len() < config.min_samples() {
        padded.resize(config.min_samples(), 0.0);
    }
    Ok(padded)
}

/// Compute the log spectrogram of a mono buffer
///
/// The buffer must already be padded; anything shorter than one FFT window
/// is rejected.
pub fn compute_spectrogram(samples: &[f32], config: &FingerprintConfig) -> Result<Spectrogram> {
    let fft_size = config.window_size;
    let hop_size = config.hop_size();

    if samples.is_empty() {
        return Err(SoundprintError::invalid("audio buffer is empty"));
    }
    if samples.len() < fft_size {
        return Err(SoundprintError::invalid(format!(
            "audio buffer has {} samples, one window needs {}",
            samples.len(),
            fft_size
        )));
    }

    let num_frames = (samples.len() - fft_size) / hop_size + 1;
    let edges = log_band_edges(config);

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(fft_size);
    let window = create_hann_window(fft_size);

    let mut frames = Vec::with_capacity(num_frames);
    let mut buffer = vec![Complex::new(0.0f32, 0.0); fft_size];

    for frame_idx in 0..num_frames {
        let start = frame_idx * hop_size;
        for (i, slot) in buffer.iter_mut().enumerate() {
            *slot = Complex::new(samples[start + i] * window[i], 0.0);
        }

        fft.process(&mut buffer);
        frames.push(fold_to_log_bins(&buffer, &edges));
    }

    Ok(Spectrogram {
        num_frames,
        num_bins: config.log_bins,
        frames,
    })
}

/// FFT index boundaries of the log bands, `log_bins + 1` entries
fn log_band_edges(config: &FingerprintConfig) -> Vec<usize> {
    // bin k sits at k * rate / window_size, so nyquist is bin window_size / 2
    let half = config.window_size / 2;
    let nyquist = config.sampling_rate as f64 / 2.0;
    let start = config.start_frequency as f64;
    let ratio = config.end_frequency as f64 / start;

    let mut edges = Vec::with_capacity(config.log_bins + 1);
    for i in 0..=config.log_bins {
        let freq = start * ratio.powf(i as f64 / config.log_bins as f64);
        let mut index = (freq / nyquist * half as f64).round() as usize;
        if let Some(&prev) = edges.last() {
            // every band covers at least one FFT bin
            index = index.max(prev + 1);
        }
        edges.push(index);
    }
    edges
}

fn fold_to_log_bins(spectrum: &[Complex<f32>], edges: &[usize]) -> Vec<f32> {
    let usable = spectrum.len() / 2 + 1;

    edges
        .windows(2)
        .map(|band| {
            let lo = band[0].min(usable);
            let hi = band[1].min(usable);
            let energy = if hi > lo {
                spectrum[lo..hi].iter().map(|c| c.norm_sqr()).sum::<f32>() / (hi - lo) as f32
            } else {
                0.0
            };
            energy.max(ENERGY_FLOOR).ln()
        })
        .collect()
}

/// Create Hann window
fn create_hann_window(size: usize) -> Vec<f32> {
    if size == 1 {
        return vec![1.0];
    }
    (0..size)
        .map(|i| {
            let x = i as f32 / (size - 1) as f32;
            0.5 * (1.0 - (2.0 * PI * x).cos())
        })
        .collect()
}
