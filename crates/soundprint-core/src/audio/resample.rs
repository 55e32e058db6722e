//! Linear-interpolation resampling

/// Resample a mono buffer from `from_rate` to `to_rate`
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).floor() as usize;

    (0..output_len)
        .map(|i| {
            let src_pos = i as f64 * ratio;
            let src_idx = src_pos.floor() as usize;
            let frac = (src_pos - src_idx as f64) as f32;

            match samples.get(src_idx + 1) {
                Some(&next) => samples[src_idx] * (1.0 - frac) + next * frac,
                None => samples[src_idx.min(samples.len() - 1)],
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_same_rate_is_identity() {
        let input = vec![0.1, 0.2, 0.3];
        assert_eq!(resample_linear(&input, 8000, 8000), input);
    }

    #[test]
    fn test_downsample_by_two() {
        let input: Vec<f32> = (0..8).map(|i| i as f32).collect();
        let output = resample_linear(&input, 16000, 8000);
        assert_eq!(output, vec![0.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_upsample_interpolates() {
        let output = resample_linear(&[0.0, 1.0], 8000, 16000);
        assert_eq!(output.len(), 4);
        assert_relative_eq!(output[1], 0.5);
        assert_relative_eq!(output[3], 1.0);
    }
}
