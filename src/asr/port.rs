//! C4 — ASR port contract
//!
//! Concrete backends (Whisper and friends) are external collaborators;
//! this module only defines the boundary the kernel composes against.

use async_trait::async_trait;

use crate::audio::ProcessedAudio;

use super::types::{ASRError, OutputType, TranscribeOutput};

/// A pluggable speech-to-IPA backend.
///
/// `setup`/`teardown` are idempotent; `transcribe` must not be called before
/// `setup` completes (the kernel enforces this, surfacing `ASRError::NotReady`
/// if a caller bypasses it).
#[async_trait]
pub trait ASRBackend: Send + Sync {
    /// Declares what `transcribe` produces. The kernel only wires backends
    /// that declare `Ipa`, unless this plugin's config sets
    /// `require_ipa = false`.
    fn output_type(&self) -> OutputType;

    async fn setup(&mut self) -> Result<(), ASRError>;

    async fn teardown(&mut self) -> Result<(), ASRError>;

    async fn transcribe(
        &self,
        audio: &ProcessedAudio,
        lang: Option<&str>,
    ) -> Result<TranscribeOutput, ASRError>;
}
