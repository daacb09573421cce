//! Audio resampling and downmixing
//!
//! Pure sample-rate conversion and channel-mixing helpers used by the
//! preprocessor (C3) to normalize arbitrary input audio down to mono,
//! 16 kHz float samples.

use tracing::debug;

/// Downmix interleaved multi-channel samples to mono by averaging channels.
pub fn downmix_to_mono(samples: &[f32], channels: u8) -> Vec<f32> {
    let channels = channels as usize;
    if channels <= 1 {
        return samples.to_vec();
    }

    let frames = samples.len() / channels;
    let mut mono = Vec::with_capacity(frames);
    for frame in 0..frames {
        let mut sum = 0.0f32;
        for ch in 0..channels {
            sum += samples[frame * channels + ch];
        }
        mono.push(sum / channels as f32);
    }

    debug!(
        "downmixed {} channels: {} -> {} samples",
        channels,
        samples.len(),
        mono.len()
    );
    mono
}

/// Resample mono audio using linear interpolation.
///
/// Cubic/polyphase resampling is acceptable per spec; linear interpolation
/// is the cheapest correct choice and is what the source conversion ratio
/// needs for arbitrary, non-integer rate changes.
pub fn resample_linear(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if samples.is_empty() || source_rate == target_rate {
        return samples.to_vec();
    }

    let ratio = target_rate as f64 / source_rate as f64;
    let input_len = samples.len();
    let output_len = (input_len as f64 * ratio) as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let input_index = i as f64 / ratio;
        let floor_idx = input_index.floor() as usize;
        let ceil_idx = (input_index.ceil() as usize).min(input_len - 1);

        if floor_idx == ceil_idx {
            output.push(samples[floor_idx]);
        } else {
            let fraction = (input_index - floor_idx as f64) as f32;
            let low = samples[floor_idx];
            let high = samples[ceil_idx];
            output.push(low + (high - low) * fraction);
        }
    }

    output
}

/// Scale samples so the peak absolute amplitude sits at `target_dbfs`
/// (e.g. -1.0 dBFS). A silent clip (all zeros) is left untouched.
pub fn normalize_peak(samples: &mut [f32], target_dbfs: f32) {
    let peak = samples.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));
    if peak <= f32::EPSILON {
        return;
    }

    let target_linear = 10f32.powf(target_dbfs / 20.0);
    let gain = target_linear / peak;
    for sample in samples.iter_mut() {
        *sample = (*sample * gain).clamp(-1.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(sample_rate: u32, channels: u8, duration_secs: f32) -> Vec<f32> {
        let frames = (sample_rate as f32 * duration_secs) as usize;
        let mut samples = Vec::with_capacity(frames * channels as usize);
        for i in 0..frames {
            let t = i as f32 / sample_rate as f32;
            let s = (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5;
            for _ in 0..channels {
                samples.push(s);
            }
        }
        samples
    }

    #[test]
    fn no_resampling_when_rates_match() {
        let samples = tone(16000, 1, 1.0);
        let result = resample_linear(&samples, 16000, 16000);
        assert_eq!(result.len(), samples.len());
    }

    #[test]
    fn downsamples_48k_to_16k_within_tolerance() {
        let samples = tone(48000, 1, 1.0);
        let result = resample_linear(&samples, 48000, 16000);
        let expected = samples.len() / 3;
        let tolerance = expected / 10;
        assert!((result.len() as i64 - expected as i64).abs() < tolerance as i64);
    }

    #[test]
    fn downmix_averages_channels() {
        let samples = vec![1.0, -1.0, 0.5, 0.5];
        let mono = downmix_to_mono(&samples, 2);
        assert_eq!(mono, vec![0.0, 0.5]);
    }

    #[test]
    fn downmix_mono_is_identity() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(downmix_to_mono(&samples, 1), samples);
    }

    #[test]
    fn peak_normalize_scales_to_target() {
        let mut samples = vec![0.1, -0.2, 0.4];
        normalize_peak(&mut samples, -1.0);
        let target_linear = 10f32.powf(-1.0 / 20.0);
        let peak = samples.iter().fold(0.0f32, |a, &s| a.max(s.abs()));
        assert!((peak - target_linear).abs() < 1e-4);
    }

    #[test]
    fn peak_normalize_leaves_silence_untouched() {
        let mut samples = vec![0.0, 0.0, 0.0];
        normalize_peak(&mut samples, -1.0);
        assert_eq!(samples, vec![0.0, 0.0, 0.0]);
    }
}
