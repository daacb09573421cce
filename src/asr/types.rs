//! ASR-related type definitions
//!
//! Shared data passed across the ASR port (C4).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The kind of output an ASR backend produces, declared statically per
/// plugin. The kernel refuses to wire anything but `Ipa` unless the plugin's
/// config carries an explicit `require_ipa = false` override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputType {
    Ipa,
    Text,
    None,
}

/// Result of `ASRBackend::transcribe`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscribeOutput {
    /// Raw-IPA tokens as produced by the backend, pre-normalization.
    pub tokens: Vec<String>,
    pub raw_text: Option<String>,
    /// Surfaced to the result but never affects scoring (`backend`, `model`, `lang`).
    pub meta: HashMap<String, String>,
}

/// ASR processing errors, matching the kinds §4.4/§7 require.
#[derive(Debug, Error)]
pub enum ASRError {
    #[error("ASR backend not ready: {message}")]
    NotReady { message: String },

    #[error("transcription failed: {message}")]
    TranscriptionFailed { message: String },

    #[error("invalid audio format: {message}")]
    InvalidAudioFormat { message: String },

    #[error("unsupported language: {language}")]
    UnsupportedLanguage { language: String },
}
