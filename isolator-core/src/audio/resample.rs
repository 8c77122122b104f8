//! Linear-interpolation sample-rate conversion.
//!
//! ## Design
//!
//! Only the copy of a frame that is handed to the VAD is resampled; the
//! isolated output keeps the original samples at the original rate. Linear
//! interpolation aliases on down-conversion, which is acceptable for a
//! classifier that only needs the coarse envelope.
//!
//! ## Usage
//!
//! ```ignore
//! let vad_input = resample(&frame, 48_000, 16_000); // 960 → 320 samples
//! ```

/// Convert `samples` from `in_rate` to `out_rate`.
///
/// Output length is `round(samples.len() * out_rate / in_rate)`. Each output
/// sample interpolates between the two nearest source samples; the right
/// neighbour falls back to the left one past the end of the input, and a
/// source index past the end reads as silence.
///
/// When `in_rate == out_rate` the input is returned as-is.
pub fn resample(samples: &[f32], in_rate: u32, out_rate: u32) -> Vec<f32> {
    if in_rate == out_rate {
        return samples.to_vec();
    }

    let ratio = out_rate as f64 / in_rate as f64;
    let out_len = output_len(samples.len(), in_rate, out_rate);

    (0..out_len)
        .map(|i| {
            let position = i as f64 / ratio;
            let idx = position.floor() as usize;
            let frac = (position - idx as f64) as f32;

            let current = samples.get(idx).copied().unwrap_or(0.0);
            let next = samples.get(idx + 1).copied().unwrap_or(current);

            current + frac * (next - current)
        })
        .collect()
}

/// Number of samples `resample` produces for an input of `len` samples.
pub fn output_len(len: usize, in_rate: u32, out_rate: u32) -> usize {
    if in_rate == out_rate {
        return len;
    }
    (len as f64 * out_rate as f64 / in_rate as f64).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn passthrough_identity() {
        let samples: Vec<f32> = (0..480).map(|i| i as f32 * 0.001).collect();
        for rate in [8_000, 16_000, 44_100, 48_000] {
            assert_eq!(resample(&samples, rate, rate), samples);
        }
    }

    #[test]
    fn ratio_48k_to_16k_correct_length() {
        let out = resample(&vec![0.0f32; 960], 48_000, 16_000);
        assert_eq!(out.len(), 320);
    }

    #[test]
    fn length_law_rounds_to_nearest() {
        // 220 * 16000 / 11025 = 319.27 → 319
        assert_eq!(resample(&vec![0.1; 220], 11_025, 16_000).len(), 319);
        // 441 * 16000 / 22050 = 320
        assert_eq!(resample(&vec![0.1; 441], 22_050, 16_000).len(), 320);
        // 3 * 16000 / 48000 = 1
        assert_eq!(resample(&[0.1, 0.2, 0.3], 48_000, 16_000).len(), 1);
        // 5 * 3 / 2 = 7.5 → 8
        assert_eq!(resample(&[0.0; 5], 2, 3).len(), 8);
        assert_eq!(output_len(5, 2, 3), 8);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(resample(&[], 44_100, 16_000).is_empty());
        assert!(resample(&[], 8_000, 16_000).is_empty());
    }

    #[test]
    fn single_sample_upsample_clamps_at_edge() {
        let out = resample(&[0.5], 8_000, 32_000);
        assert_eq!(out.len(), 4);
        for s in out {
            assert_abs_diff_eq!(s, 0.5, epsilon = 1e-6);
        }
    }

    #[test]
    fn upsample_interpolates_between_neighbours() {
        let out = resample(&[0.0, 1.0], 1, 2);
        // positions 0.0, 0.5, 1.0, 1.5
        assert_eq!(out.len(), 4);
        assert_abs_diff_eq!(out[0], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(out[1], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(out[2], 1.0, epsilon = 1e-6);
        // right neighbour past the end falls back to the last sample
        assert_abs_diff_eq!(out[3], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn downsample_picks_every_third_sample() {
        let samples: Vec<f32> = (0..9).map(|i| i as f32 * 0.1).collect();
        let out = resample(&samples, 48_000, 16_000);
        assert_eq!(out.len(), 3);
        assert_abs_diff_eq!(out[0], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(out[1], 0.3, epsilon = 1e-6);
        assert_abs_diff_eq!(out[2], 0.6, epsilon = 1e-6);
    }
}
