//! C5 — lexicon-first text-to-IPA provider with G2P fallback.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

use crate::ipa::tokenize::{tokenize, TokenizeOptions};

use super::cache::TextRefCache;
use super::port::{G2pFallback, TextRefProvider};
use super::types::{TextRefError, ToIpaOutput};

const PROVIDER_NAME: &str = "lexicon";

/// NFD → lowercase → strip punctuation except `'`/`-` → trim. Apostrophes
/// and hyphens are kept because they carry phonetic weight (elision,
/// compound boundaries); everything else is noise for lexicon lookup.
pub fn normalize_word(word: &str) -> String {
    let nfd: String = word.nfd().collect();
    let lower = nfd.to_lowercase();
    let cleaned: String = lower
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '\'' || *c == '-')
        .collect();
    cleaned.trim().to_string()
}

fn split_words(text: &str) -> Vec<String> {
    text.split_whitespace().map(|w| w.to_string()).collect()
}

/// Lexicon-first `TextRefProvider`: looks up each word's IPA transcription
/// in a preloaded pack lexicon, batching OOV words into one G2P fallback
/// call.
pub struct LexiconTextRef {
    lexicon: Arc<HashMap<String, String>>,
    fallback: Option<Arc<dyn G2pFallback>>,
    default_lang: String,
    cache: Option<Arc<TextRefCache>>,
}

impl LexiconTextRef {
    pub fn new(
        lexicon: HashMap<String, String>,
        fallback: Option<Arc<dyn G2pFallback>>,
        default_lang: impl Into<String>,
        cache: Option<Arc<TextRefCache>>,
    ) -> Self {
        let normalized = lexicon
            .into_iter()
            .map(|(k, v)| (normalize_word(&k), v))
            .collect();
        Self {
            lexicon: Arc::new(normalized),
            fallback,
            default_lang: default_lang.into(),
            cache,
        }
    }

    pub fn lookup(&self, word: &str) -> Option<&str> {
        self.lexicon.get(&normalize_word(word)).map(|s| s.as_str())
    }

    pub fn contains(&self, word: &str) -> bool {
        self.lexicon.contains_key(&normalize_word(word))
    }

    pub fn len(&self) -> usize {
        self.lexicon.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lexicon.is_empty()
    }

    /// Owned-parameter form of the compute step so it can be moved whole
    /// into a `'static` closure passed to `TextRefCache::get_or_compute`.
    async fn compute_ipa(
        lexicon: Arc<HashMap<String, String>>,
        fallback: Option<Arc<dyn G2pFallback>>,
        text: String,
        lang: String,
    ) -> Result<ToIpaOutput, TextRefError> {
        let words = split_words(&text);
        let tokenize_opts = TokenizeOptions::default();

        let mut word_tokens: Vec<Vec<String>> = vec![Vec::new(); words.len()];
        let mut oov_indices: Vec<usize> = Vec::new();
        let mut lexicon_hits = 0usize;

        for (idx, word) in words.iter().enumerate() {
            let key = normalize_word(word);
            if let Some(ipa_str) = lexicon.get(&key) {
                word_tokens[idx] = tokenize(ipa_str, &tokenize_opts);
                lexicon_hits += 1;
            } else {
                oov_indices.push(idx);
            }
        }

        let mut oov_skipped = 0usize;
        if !oov_indices.is_empty() {
            match &fallback {
                Some(fallback) => {
                    let oov_words: Vec<String> =
                        oov_indices.iter().map(|&i| words[i].clone()).collect();
                    match fallback.phonemize_batch(&oov_words, Some(&lang)).await {
                        Ok(ipa_strings) => {
                            for (slot, &idx) in oov_indices.iter().enumerate() {
                                let ipa_str = ipa_strings.get(slot).map(|s| s.as_str()).unwrap_or("");
                                if ipa_str.is_empty() {
                                    oov_skipped += 1;
                                } else {
                                    word_tokens[idx] = tokenize(ipa_str, &tokenize_opts);
                                }
                            }
                        }
                        Err(err) => {
                            debug!(error = %err, "g2p fallback failed, skipping OOV words");
                            oov_skipped = oov_indices.len();
                        }
                    }
                }
                None => {
                    oov_skipped = oov_indices.len();
                }
            }
        }

        let mut all_tokens = Vec::new();
        for tokens in &word_tokens {
            all_tokens.extend(tokens.iter().cloned());
        }

        let mut meta = HashMap::new();
        meta.insert("method".to_string(), "lexicon".to_string());
        meta.insert("lang".to_string(), lang.clone());
        meta.insert("total_words".to_string(), words.len().to_string());
        meta.insert("lexicon_hits".to_string(), lexicon_hits.to_string());
        meta.insert("oov_count".to_string(), oov_indices.len().to_string());
        meta.insert("oov_skipped".to_string(), oov_skipped.to_string());
        meta.insert("has_g2p_fallback".to_string(), fallback.is_some().to_string());

        Ok(ToIpaOutput {
            tokens: all_tokens,
            meta,
        })
    }
}

#[async_trait]
impl TextRefProvider for LexiconTextRef {
    async fn setup(&mut self) -> Result<(), TextRefError> {
        Ok(())
    }

    async fn teardown(&mut self) -> Result<(), TextRefError> {
        Ok(())
    }

    async fn to_ipa(&self, text: &str, lang: Option<&str>) -> Result<ToIpaOutput, TextRefError> {
        let cleaned = text.trim();
        if cleaned.is_empty() {
            return Err(TextRefError::EmptyText);
        }

        let resolved_lang = lang.unwrap_or(&self.default_lang).to_string();

        match &self.cache {
            Some(cache) => {
                let lexicon = self.lexicon.clone();
                let fallback = self.fallback.clone();
                let text_owned = cleaned.to_string();
                let lang_owned = resolved_lang.clone();
                cache
                    .get_or_compute(cleaned, &resolved_lang, PROVIDER_NAME, move || {
                        Self::compute_ipa(lexicon, fallback, text_owned, lang_owned)
                    })
                    .await
            }
            None => {
                Self::compute_ipa(self.lexicon.clone(), self.fallback.clone(), cleaned.to_string(), resolved_lang).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::textref::cache::CacheConfig;

    struct StubFallback {
        responses: HashMap<String, String>,
    }

    #[async_trait]
    impl G2pFallback for StubFallback {
        async fn phonemize_batch(
            &self,
            words: &[String],
            _lang: Option<&str>,
        ) -> Result<Vec<String>, TextRefError> {
            Ok(words
                .iter()
                .map(|w| self.responses.get(&normalize_word(w)).cloned().unwrap_or_default())
                .collect())
        }
    }

    fn lexicon() -> HashMap<String, String> {
        HashMap::from([
            ("ola".to_string(), "o l a".to_string()),
            ("hola".to_string(), "o l a".to_string()),
        ])
    }

    #[tokio::test]
    async fn finds_words_in_lexicon() {
        let provider = LexiconTextRef::new(lexicon(), None, "es", None);
        let result = provider.to_ipa("ola", Some("es")).await.unwrap();
        assert_eq!(result.tokens, vec!["o", "l", "a"]);
        assert_eq!(result.meta["oov_count"], "0");
    }

    #[test]
    fn normalize_word_strips_punctuation_keeps_apostrophe_and_hyphen() {
        // NFD decomposes é into e + combining acute; the combining mark is
        // not alphanumeric, so it's dropped along with the punctuation —
        // accented and unaccented spellings key to the same lexicon entry.
        assert_eq!(normalize_word("¡Olé!"), "ole");
        assert_eq!(normalize_word("don't"), "don't");
        assert_eq!(normalize_word("co-op"), "co-op");
    }

    #[tokio::test]
    async fn oov_without_fallback_is_skipped_not_an_error() {
        let provider = LexiconTextRef::new(lexicon(), None, "es", None);
        let result = provider.to_ipa("ola xyz123qqq", Some("es")).await.unwrap();
        assert_eq!(result.tokens, vec!["o", "l", "a"]);
        assert_eq!(result.meta["oov_skipped"], "1");
    }

    #[tokio::test]
    async fn oov_with_fallback_contributes_tokens() {
        let fallback = Arc::new(StubFallback {
            responses: HashMap::from([("mundo".to_string(), "m u n d o".to_string())]),
        });
        let provider = LexiconTextRef::new(lexicon(), Some(fallback), "es", None);
        let result = provider.to_ipa("ola mundo", Some("es")).await.unwrap();
        assert_eq!(result.tokens, vec!["o", "l", "a", "m", "u", "n", "d", "o"]);
        assert_eq!(result.meta["oov_skipped"], "0");
    }

    #[tokio::test]
    async fn empty_text_is_an_error() {
        let provider = LexiconTextRef::new(lexicon(), None, "es", None);
        let err = provider.to_ipa("   ", Some("es")).await.unwrap_err();
        assert!(matches!(err, TextRefError::EmptyText));
    }

    #[tokio::test]
    async fn preserves_word_order_across_lexicon_and_oov() {
        let fallback = Arc::new(StubFallback {
            responses: HashMap::from([("mundo".to_string(), "m u n d o".to_string())]),
        });
        let provider = LexiconTextRef::new(lexicon(), Some(fallback), "es", None);
        let result = provider.to_ipa("mundo ola", Some("es")).await.unwrap();
        assert_eq!(result.tokens, vec!["m", "u", "n", "d", "o", "o", "l", "a"]);
    }

    #[tokio::test]
    async fn to_ipa_goes_through_the_injected_cache() {
        let cache = Arc::new(TextRefCache::new(CacheConfig::default()));
        let provider = LexiconTextRef::new(lexicon(), None, "es", Some(cache.clone()));

        let first = provider.to_ipa("ola", Some("es")).await.unwrap();
        assert_eq!(first.tokens, vec!["o", "l", "a"]);
        assert_eq!(cache.stats().await.misses, 1);

        let second = provider.to_ipa("ola", Some("es")).await.unwrap();
        assert_eq!(second.tokens, first.tokens);
        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);

        assert!(cache.get("ola", "es", PROVIDER_NAME).await.is_some());
    }
}
