//! Standard 2-D Haar wavelet decomposition
//!
//! Every column is decomposed first, then every row. Each 1-D pass scales
//! the vector by `1/sqrt(n)` and then repeatedly replaces pairs with their
//! scaled sum and difference while halving the active length.

use crate::config::FingerprintConfig;
use crate::error::{Result, SoundprintError};
use crate::spectrogram::Spectrogram;
use std::f64::consts::SQRT_2;

/// Decompose an image in place (`image[row][col]`)
pub fn decompose_image(image: &mut [Vec<f64>]) -> Result<()> {
    let (rows, cols) = check_dimensions(image)?;
    let mut temp = vec![0.0; rows.max(cols)];
    let mut column = vec![0.0; rows];

    for col in 0..cols {
        for row in 0..rows {
            column[row] = image[row][col];
        }
        decompose_array(&mut column, &mut temp);
        for row in 0..rows {
            image[row][col] = column[row];
        }
    }

    for row in image.iter_mut() {
        decompose_array(row, &mut temp);
    }

    Ok(())
}

/// Exact inverse of [`decompose_image`]
pub fn reconstruct_image(image: &mut [Vec<f64>]) -> Result<()> {
    let (rows, cols) = check_dimensions(image)?;
    let mut temp = vec![0.0; rows.max(cols)];
    let mut column = vec![0.0; rows];

    for row in image.iter_mut() {
        reconstruct_array(row, &mut temp);
    }

    for col in 0..cols {
        for row in 0..rows {
            column[row] = image[row][col];
        }
        reconstruct_array(&mut column, &mut temp);
        for row in 0..rows {
            image[row][col] = column[row];
        }
    }

    Ok(())
}

/// Cut the spectrogram into `fingerprint_length`-frame images every `stride` frames
pub fn analysis_windows(spectrogram: &Spectrogram, config: &FingerprintConfig) -> Vec<Vec<Vec<f64>>> {
    let length = config.fingerprint_length;
    if spectrogram.num_frames < length {
        return Vec::new();
    }

    (0..=spectrogram.num_frames - length)
        .step_by(config.stride.max(1))
        .map(|start| {
            spectrogram.frames[start..start + length]
                .iter()
                .map(|frame| frame.iter().map(|&v| v as f64).collect())
                .collect()
        })
        .collect()
}

fn check_dimensions(image: &[Vec<f64>]) -> Result<(usize, usize)> {
    let rows = image.len();
    let cols = image.first().map(|r| r.len()).unwrap_or(0);

    if rows == 0 || cols == 0 {
        return Err(SoundprintError::invalid("wavelet image is empty"));
    }
    if image.iter().any(|r| r.len() != cols) {
        return Err(SoundprintError::invalid("wavelet image is not rectangular"));
    }
    if !rows.is_power_of_two() || !cols.is_power_of_two() {
        return Err(SoundprintError::invalid(format!(
            "wavelet image dimensions {}x{} must be powers of two",
            rows, cols
        )));
    }
    Ok((rows, cols))
}

fn decompose_array(array: &mut [f64], temp: &mut [f64]) {
    let n = array.len();
    let norm = (n as f64).sqrt();
    for value in array.iter_mut() {
        *value /= norm;
    }

    let mut h = n;
    while h > 1 {
        let half = h / 2;
        for i in 0..half {
            temp[i] = (array[2 * i] + array[2 * i + 1]) / SQRT_2;
            temp[half + i] = (array[2 * i] - array[2 * i + 1]) / SQRT_2;
        }
        array[..h].copy_from_slice(&temp[..h]);
        h = half;
    }
}

fn reconstruct_array(array: &mut [f64], temp: &mut [f64]) {
    let n = array.len();

    let mut h = 2;
    while h <= n {
        let half = h / 2;
        for i in 0..half {
            temp[2 * i] = (array[i] + array[half + i]) / SQRT_2;
            temp[2 * i + 1] = (array[i] - array[half + i]) / SQRT_2;
        }
        array[..h].copy_from_slice(&temp[..h]);
        h *= 2;
    }

    let norm = (n as f64).sqrt();
    for value in array.iter_mut() {
        *value *= norm;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_constant_vector_collapses() {
        let mut data = vec![1.0, 1.0, 1.0, 1.0];
        let mut temp = vec![0.0; 4];
        decompose_array(&mut data, &mut temp);
        assert_relative_eq!(data[0], 1.0, epsilon = 1e-12);
        for v in &data[1..] {
            assert_relative_eq!(*v, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_pair_difference() {
        let mut data = vec![3.0, 1.0];
        let mut temp = vec![0.0; 2];
        decompose_array(&mut data, &mut temp);
        // scaled by 1/sqrt(2), then (a+b)/sqrt(2), (a-b)/sqrt(2)
        assert_relative_eq!(data[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(data[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_roundtrip_reconstructs_image() {
        let mut rng = StdRng::seed_from_u64(7);
        let original: Vec<Vec<f64>> = (0..16)
            .map(|_| (0..8).map(|_| rng.gen_range(-5.0..5.0)).collect())
            .collect();

        let mut image = original.clone();
        decompose_image(&mut image).unwrap();
        assert_ne!(image, original);
        reconstruct_image(&mut image).unwrap();

        for (row, expected) in image.iter().zip(&original) {
            for (a, b) in row.iter().zip(expected) {
                assert_relative_eq!(*a, *b, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_energy_concentrates_in_first_coefficient() {
        let mut image = vec![vec![2.0; 4]; 4];
        decompose_image(&mut image).unwrap();
        assert!(image[0][0].abs() > 0.0);
        let rest: f64 = image
            .iter()
            .flatten()
            .skip(1)
            .map(|v| v.abs())
            .sum();
        assert_relative_eq!(rest, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_malformed_images() {
        let mut ragged = vec![vec![1.0; 4], vec![1.0; 2]];
        assert!(matches!(
            decompose_image(&mut ragged),
            Err(SoundprintError::InvalidInput(_))
        ));

        let mut odd = vec![vec![1.0; 3]; 4];
        assert!(decompose_image(&mut odd).is_err());

        let mut empty: Vec<Vec<f64>> = Vec::new();
        assert!(decompose_image(&mut empty).is_err());
    }

    #[test]
    fn test_analysis_windows_stride() {
        let config = FingerprintConfig::tiny();
        let spectrogram = Spectrogram {
            frames: (0..40).map(|i| vec![i as f32; config.log_bins]).collect(),
            num_frames: 40,
            num_bins: config.log_bins,
        };

        let windows = analysis_windows(&spectrogram, &config);
        // starts 0, 8, 16, 24
        assert_eq!(windows.len(), 4);
        assert_eq!(windows[1][0][0], 8.0);
        assert_eq!(windows[3].len(), config.fingerprint_length);

        let short = Spectrogram {
            frames: vec![vec![0.0; config.log_bins]; 3],
            num_frames: 3,
            num_bins: config.log_bins,
        };
        assert!(analysis_windows(&short, &config).is_empty());
    }
}
