//! Audio-related type definitions
//!
//! Common types used by the preprocessor (C3) that feeds the ASR port.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Input audio handed to the preprocessor: either a path to a container
/// file on disk, or already-decoded samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AudioHandle {
    Path {
        path: PathBuf,
        sample_rate: u32,
        channels: u8,
    },
    Samples {
        samples: Vec<f32>,
        sample_rate: u32,
        channels: u8,
    },
}

impl AudioHandle {
    pub fn sample_rate(&self) -> u32 {
        match self {
            AudioHandle::Path { sample_rate, .. } => *sample_rate,
            AudioHandle::Samples { sample_rate, .. } => *sample_rate,
        }
    }

    pub fn channels(&self) -> u8 {
        match self {
            AudioHandle::Path { channels, .. } => *channels,
            AudioHandle::Samples { channels, .. } => *channels,
        }
    }
}

/// A processed handle: guaranteed mono, 16 kHz, float samples in [-1, 1].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl ProcessedAudio {
    pub const TARGET_SAMPLE_RATE: u32 = 16_000;

    pub fn duration_seconds(&self) -> f32 {
        self.samples.len() as f32 / Self::TARGET_SAMPLE_RATE as f32
    }
}

/// Minimum audio duration the preprocessor will pass on to ASR.
pub const MIN_AUDIO_DURATION_MS: u32 = 80;

/// Preprocessor/audio errors, matching the kinds in spec §4.3.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("unsupported audio container: {message}")]
    UnsupportedFormat { message: String },

    #[error("audio contains zero frames after decode")]
    EmptyAudio,

    #[error("audio too short: {duration_ms}ms (minimum {minimum_ms}ms)")]
    TooShort { duration_ms: u32, minimum_ms: u32 },

    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    #[error("audio I/O failed: {message}")]
    Io { message: String },
}
