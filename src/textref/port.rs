//! C5 — Text-to-IPA port contract.

use async_trait::async_trait;

use super::types::{TextRefError, ToIpaOutput};

#[async_trait]
pub trait TextRefProvider: Send + Sync {
    async fn setup(&mut self) -> Result<(), TextRefError>;

    async fn teardown(&mut self) -> Result<(), TextRefError>;

    async fn to_ipa(&self, text: &str, lang: Option<&str>) -> Result<ToIpaOutput, TextRefError>;
}

/// External G2P collaborator invoked for OOV words. A single batch call per
/// `to_ipa` request amortizes the cost of an external phonemizer process.
#[async_trait]
pub trait G2pFallback: Send + Sync {
    /// One IPA string per input word, aligned by index. An entry that
    /// fails to phonemize is an empty string, not a partial failure.
    async fn phonemize_batch(
        &self,
        words: &[String],
        lang: Option<&str>,
    ) -> Result<Vec<String>, TextRefError>;
}
