//! C3 — Preprocessor
//!
//! Turns an arbitrary [`AudioHandle`] into a [`ProcessedAudio`]: mono,
//! 16 kHz, float samples in `[-1, 1]`, peak-normalized to -1 dBFS.

use std::path::Path;

use async_trait::async_trait;
use tracing::{info, warn};

use super::resampler::{downmix_to_mono, normalize_peak, resample_linear};
use super::types::{AudioError, AudioHandle, ProcessedAudio, MIN_AUDIO_DURATION_MS};

const PEAK_TARGET_DBFS: f32 = -1.0;

/// Decodes, downmixes, resamples and normalizes audio for the ASR port.
///
/// `setup`/`teardown` are idempotent, matching the other plugin contracts
/// (§6); `process` itself stays synchronous — decode/resample is CPU-bound
/// once the bytes are in memory, and the kernel only ever calls it while
/// already holding the preprocessor's slot lock.
#[async_trait]
pub trait Preprocessor: Send + Sync {
    async fn setup(&mut self) -> Result<(), AudioError> {
        Ok(())
    }

    async fn teardown(&mut self) -> Result<(), AudioError> {
        Ok(())
    }

    fn process(&self, handle: AudioHandle) -> Result<ProcessedAudio, AudioError>;
}

/// Default preprocessor: WAV/PCM via `hound`, linear-interpolation resample.
#[derive(Debug, Default)]
pub struct DefaultPreprocessor;

#[async_trait]
impl Preprocessor for DefaultPreprocessor {
    fn process(&self, handle: AudioHandle) -> Result<ProcessedAudio, AudioError> {
        let (samples, sample_rate, channels) = match handle {
            // The handle's declared sample_rate/channels are a caller hint;
            // trust what's actually in the container instead.
            AudioHandle::Path { path, .. } => decode_wav(&path)?,
            AudioHandle::Samples {
                samples,
                sample_rate,
                channels,
            } => (samples, sample_rate, channels),
        };

        if samples.is_empty() {
            return Err(AudioError::EmptyAudio);
        }
        if sample_rate == 0 {
            return Err(AudioError::InvalidSampleRate(sample_rate));
        }

        let mono = downmix_to_mono(&samples, channels);
        let mut resampled = resample_linear(&mono, sample_rate, ProcessedAudio::TARGET_SAMPLE_RATE);

        if resampled.is_empty() {
            return Err(AudioError::EmptyAudio);
        }

        let duration_ms =
            (resampled.len() as f32 / ProcessedAudio::TARGET_SAMPLE_RATE as f32 * 1000.0) as u32;
        if duration_ms < MIN_AUDIO_DURATION_MS {
            return Err(AudioError::TooShort {
                duration_ms,
                minimum_ms: MIN_AUDIO_DURATION_MS,
            });
        }

        normalize_peak(&mut resampled, PEAK_TARGET_DBFS);

        info!(
            duration_ms,
            sample_rate = ProcessedAudio::TARGET_SAMPLE_RATE,
            "preprocessed audio"
        );

        Ok(ProcessedAudio {
            samples: resampled,
            sample_rate: ProcessedAudio::TARGET_SAMPLE_RATE,
        })
    }
}

/// Decode samples out of a WAV file, returning (samples, sample_rate, channels).
///
/// Non-float PCM is converted to `f32` in `[-1, 1]`; any container hound
/// can't parse (not a WAV, or an unsupported codec) becomes
/// `AudioError::UnsupportedFormat`.
fn decode_wav(path: &Path) -> Result<(Vec<f32>, u32, u8), AudioError> {
    let reader = hound::WavReader::open(path).map_err(|e| AudioError::UnsupportedFormat {
        message: e.to_string(),
    })?;

    let spec = reader.spec();
    let channels = spec.channels as u8;
    let sample_rate = spec.sample_rate;

    let samples: Result<Vec<f32>, _> = match spec.sample_format {
        hound::SampleFormat::Float => reader.into_samples::<f32>().collect(),
        hound::SampleFormat::Int => {
            let max_value = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_value))
                .collect()
        }
    };

    let samples = samples.map_err(|e| AudioError::Io {
        message: e.to_string(),
    })?;

    if samples.is_empty() {
        warn!(path = %path.display(), "decoded WAV with zero frames");
    }

    Ok((samples, sample_rate, channels))
}
