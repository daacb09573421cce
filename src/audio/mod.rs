//! Audio preprocessing (C3)
//!
//! Turns caller-supplied audio (a WAV path or raw decoded samples) into the
//! mono/16kHz/normalized form the ASR port requires.

pub mod preprocess;
pub mod resampler;
pub mod types;

pub use preprocess::{DefaultPreprocessor, Preprocessor};
pub use types::*;
