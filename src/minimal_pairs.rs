//! C10 — Minimal-pair generator.
//!
//! Two sources of pairs: a curated, hand-picked table per language (the
//! contrasts a teacher would actually drill), and pairs derived on the fly
//! from a caller-supplied IPA lexicon (same phoneme count, exactly one
//! differing slot). Grounded on `packs/minimal_pairs.py`.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinimalPair {
    pub word1: String,
    pub ipa1: String,
    pub word2: String,
    pub ipa2: String,
    pub phoneme1: String,
    pub phoneme2: String,
    pub position: usize,
    pub difficulty: u8,
    pub language: String,
    pub tags: Vec<String>,
}

impl MinimalPair {
    pub fn contrast_label(&self) -> String {
        format!("{}/{}", self.phoneme1, self.phoneme2)
    }
}

fn mp(
    word1: &str,
    ipa1: &str,
    word2: &str,
    ipa2: &str,
    phoneme1: &str,
    phoneme2: &str,
    position: usize,
    difficulty: u8,
    language: &str,
    tags: &[&str],
) -> MinimalPair {
    MinimalPair {
        word1: word1.to_string(),
        ipa1: ipa1.to_string(),
        word2: word2.to_string(),
        ipa2: ipa2.to_string(),
        phoneme1: phoneme1.to_string(),
        phoneme2: phoneme2.to_string(),
        position,
        difficulty,
        language: language.to_string(),
        tags: tags.iter().map(|s| s.to_string()).collect(),
    }
}

fn curated_es_mx() -> Vec<MinimalPair> {
    vec![
        // Vibrantes: /r/ vs /ɾ/
        mp("pero", "p e ɾ o", "perro", "p e r o", "ɾ", "r", 2, 3, "es-mx", &["rhotic", "place"]),
        mp("caro", "k a ɾ o", "carro", "k a r o", "ɾ", "r", 2, 3, "es-mx", &["rhotic", "coda"]),
        mp("moro", "m o ɾ o", "morro", "m o r o", "ɾ", "r", 2, 3, "es-mx", &["rhotic"]),
        mp("cero", "s e ɾ o", "cerro", "s e r o", "ɾ", "r", 2, 3, "es-mx", &["rhotic"]),
        mp("para", "p a ɾ a", "parra", "p a r a", "ɾ", "r", 2, 3, "es-mx", &["rhotic"]),
        // Nasales: /n/ vs /ɲ/
        mp("año", "a ɲ o", "ano", "a n o", "ɲ", "n", 1, 2, "es-mx", &["nasal", "place"]),
        mp("soña", "s o ɲ a", "sona", "s o n a", "ɲ", "n", 1, 2, "es-mx", &["nasal", "place"]),
        mp("ñoño", "ɲ o ɲ o", "nono", "n o n o", "ɲ", "n", 0, 2, "es-mx", &["nasal", "place"]),
        // Oclusivas sordas/sonoras: /p/ vs /b/
        mp("pata", "p a t a", "bata", "b a t a", "p", "b", 0, 1, "es-mx", &["stop", "voicing", "onset"]),
        mp("poca", "p o k a", "boca", "b o k a", "p", "b", 0, 1, "es-mx", &["stop", "voicing"]),
        // /t/ vs /d/
        mp("tío", "t i o", "dio", "d i o", "t", "d", 0, 1, "es-mx", &["stop", "voicing"]),
        mp("toma", "t o m a", "doma", "d o m a", "t", "d", 0, 1, "es-mx", &["stop", "voicing"]),
        // /k/ vs /g/
        mp("cama", "k a m a", "gama", "g a m a", "k", "g", 0, 1, "es-mx", &["stop", "voicing", "velar"]),
        mp("cota", "k o t a", "gota", "g o t a", "k", "g", 0, 1, "es-mx", &["stop", "voicing", "velar"]),
        // Fricativas: /s/ vs /x/
        mp("saja", "s a x a", "jaja", "x a x a", "s", "x", 0, 2, "es-mx", &["fricative", "place"]),
        mp("cosa", "k o s a", "coja", "k o x a", "s", "x", 2, 2, "es-mx", &["fricative", "place"]),
        // Africada: /tʃ/ vs /ʃ/
        mp("chico", "tʃ i k o", "shico", "ʃ i k o", "tʃ", "ʃ", 0, 2, "es-mx", &["affricate", "fricative"]),
        // Vocales: /e/ vs /i/
        mp("pesa", "p e s a", "pisa", "p i s a", "e", "i", 1, 1, "es-mx", &["vowel"]),
        mp("seta", "s e t a", "sita", "s i t a", "e", "i", 1, 1, "es-mx", &["vowel"]),
        // Vocales: /o/ vs /u/
        mp("toro", "t o ɾ o", "turo", "t u ɾ o", "o", "u", 1, 1, "es-mx", &["vowel", "height"]),
        mp("boca", "b o k a", "buca", "b u k a", "o", "u", 1, 1, "es-mx", &["vowel", "height"]),
        // Vocales: /a/ vs /e/
        mp("casa", "k a s a", "queso", "k e s o", "a", "e", 1, 1, "es-mx", &["vowel"]),
        // Lateral: /l/ vs /r/
        mp("loca", "l o k a", "roca", "r o k a", "l", "r", 0, 2, "es-mx", &["lateral", "rhotic"]),
        mp("polo", "p o l o", "poro", "p o ɾ o", "l", "ɾ", 2, 2, "es-mx", &["lateral", "rhotic"]),
        // Nasal: /m/ vs /n/
        mp("mapa", "m a p a", "napa", "n a p a", "m", "n", 0, 1, "es-mx", &["nasal", "place"]),
        mp("cama", "k a m a", "cana", "k a n a", "m", "n", 2, 1, "es-mx", &["nasal", "place"]),
    ]
}

fn curated_en_us() -> Vec<MinimalPair> {
    vec![
        mp("think", "θ ɪ ŋ k", "sink", "s ɪ ŋ k", "θ", "s", 0, 2, "en-us", &["fricative", "dental"]),
        mp("math", "m æ θ", "mass", "m æ s", "θ", "s", 2, 2, "en-us", &["fricative", "dental", "coda"]),
        mp("then", "ð ɛ n", "den", "d ɛ n", "ð", "d", 0, 2, "en-us", &["fricative", "dental", "voicing"]),
        mp("bad", "b æ d", "bed", "b ɛ d", "æ", "ɛ", 1, 2, "en-us", &["vowel", "height"]),
        mp("bag", "b æ ɡ", "beg", "b ɛ ɡ", "æ", "ɛ", 1, 2, "en-us", &["vowel", "height"]),
        mp("ship", "ʃ ɪ p", "sheep", "ʃ iː p", "ɪ", "iː", 1, 2, "en-us", &["vowel", "length"]),
        mp("bit", "b ɪ t", "beat", "b iː t", "ɪ", "iː", 1, 2, "en-us", &["vowel", "length"]),
        mp("pat", "p æ t", "bat", "b æ t", "p", "b", 0, 1, "en-us", &["stop", "voicing"]),
        mp("vat", "v æ t", "bat", "b æ t", "v", "b", 0, 2, "en-us", &["fricative", "stop", "voicing"]),
    ]
}

/// A hand-entered curated pair carries `phoneme1`/`phoneme2`/`position`
/// directly rather than deriving them from `ipa1`/`ipa2`; re-derive them
/// here and drop (with a warning, not a panic) any entry where the table
/// and the actual tokenization disagree, instead of trusting the literal
/// data blind.
fn validate_curated_entry(pair: &MinimalPair) -> bool {
    let tokens1: Vec<String> = pair.ipa1.split_whitespace().map(|s| s.to_string()).collect();
    let tokens2: Vec<String> = pair.ipa2.split_whitespace().map(|s| s.to_string()).collect();

    match check_minimal_pair(&pair.word1, &tokens1, &pair.word2, &tokens2, &pair.language) {
        Some(derived) => {
            let ok = derived.position == pair.position
                && derived.phoneme1 == pair.phoneme1
                && derived.phoneme2 == pair.phoneme2;
            if !ok {
                warn!(
                    word1 = %pair.word1,
                    word2 = %pair.word2,
                    "curated minimal pair disagrees with its own ipa transcription, dropping"
                );
            }
            ok
        }
        None => {
            warn!(
                word1 = %pair.word1,
                word2 = %pair.word2,
                "curated minimal pair ipa transcriptions are not a single-phoneme contrast, dropping"
            );
            false
        }
    }
}

fn curated_table() -> &'static HashMap<&'static str, Vec<MinimalPair>> {
    static TABLE: OnceLock<HashMap<&'static str, Vec<MinimalPair>>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let es: Vec<MinimalPair> = curated_es_mx().into_iter().filter(validate_curated_entry).collect();
        let en: Vec<MinimalPair> = curated_en_us().into_iter().filter(validate_curated_entry).collect();
        let mut map = HashMap::new();
        map.insert("es-mx", es.clone());
        map.insert("es", es);
        map.insert("en-us", en.clone());
        map.insert("en", en);
        map
    })
}

/// Direct lookup of curated pairs for a language, with BCP-47 base-tag
/// fallback (`es-mx-regional` has no entry, falls back to `es-mx`'s base `es`
/// only once the full tag misses; a tag with no curated table at all, at any
/// fallback step, yields an empty list rather than an error).
pub fn get_curated_pairs(language: &str) -> Vec<MinimalPair> {
    let table = curated_table();
    if let Some(pairs) = table.get(language) {
        return pairs.clone();
    }
    let base = language.split('-').next().unwrap_or(language);
    table.get(base).cloned().unwrap_or_default()
}

/// If `tokens1` and `tokens2` are the same length and differ in exactly one
/// slot, returns the pair describing that contrast.
fn check_minimal_pair(
    word1: &str,
    tokens1: &[String],
    word2: &str,
    tokens2: &[String],
    language: &str,
) -> Option<MinimalPair> {
    if tokens1.len() != tokens2.len() {
        return None;
    }
    let mut diffs = tokens1
        .iter()
        .zip(tokens2.iter())
        .enumerate()
        .filter(|(_, (t1, t2))| t1 != t2);
    let (position, (phoneme1, phoneme2)) = diffs.next()?;
    if diffs.next().is_some() {
        return None;
    }

    Some(MinimalPair {
        word1: word1.to_string(),
        ipa1: tokens1.join(" "),
        word2: word2.to_string(),
        ipa2: tokens2.join(" "),
        phoneme1: phoneme1.clone(),
        phoneme2: phoneme2.clone(),
        position,
        difficulty: 1,
        language: language.to_string(),
        tags: Vec::new(),
    })
}

/// Generates minimal pairs from a caller-supplied IPA lexicon, and exposes
/// the curated tables for whichever language is configured.
pub struct MinimalPairGenerator {
    lexicon: Vec<(String, Vec<String>)>,
    language: String,
    max_pairs: usize,
    pair_cache: OnceLock<Vec<MinimalPair>>,
}

impl MinimalPairGenerator {
    pub fn from_lexicon(lexicon: HashMap<String, Vec<String>>, language: &str, max_pairs: usize) -> Self {
        let mut entries: Vec<(String, Vec<String>)> = lexicon.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Self {
            lexicon: entries,
            language: language.to_string(),
            max_pairs,
            pair_cache: OnceLock::new(),
        }
    }

    /// `lexicon` maps word to a single IPA string with phonemes separated by
    /// whitespace, e.g. `{"hola": "o l a"}`.
    pub fn from_lexicon_strings(lexicon: HashMap<String, String>, language: &str, max_pairs: usize) -> Self {
        let tokenized = lexicon
            .into_iter()
            .map(|(word, ipa)| (word, ipa.split_whitespace().map(|s| s.to_string()).collect()))
            .collect();
        Self::from_lexicon(tokenized, language, max_pairs)
    }

    pub fn find_pairs_for_phoneme(&self, phoneme: &str) -> Vec<MinimalPair> {
        self.build_all_pairs()
            .iter()
            .filter(|p| p.phoneme1 == phoneme || p.phoneme2 == phoneme)
            .cloned()
            .collect()
    }

    pub fn find_pairs_for_contrast(&self, phoneme1: &str, phoneme2: &str) -> Vec<MinimalPair> {
        self.build_all_pairs()
            .iter()
            .filter(|p| {
                (p.phoneme1 == phoneme1 && p.phoneme2 == phoneme2)
                    || (p.phoneme1 == phoneme2 && p.phoneme2 == phoneme1)
            })
            .cloned()
            .collect()
    }

    pub fn find_pairs_by_tag(&self, tag: &str) -> Vec<MinimalPair> {
        self.get_curated_pairs(None)
            .into_iter()
            .filter(|p| p.tags.iter().any(|t| t == tag))
            .collect()
    }

    pub fn find_pairs_by_difficulty(&self, difficulty: u8) -> Vec<MinimalPair> {
        self.get_curated_pairs(None)
            .into_iter()
            .filter(|p| p.difficulty == difficulty)
            .collect()
    }

    pub fn get_curated_pairs(&self, language: Option<&str>) -> Vec<MinimalPair> {
        get_curated_pairs(language.unwrap_or(&self.language))
    }

    pub fn iter_pairs(&self) -> impl Iterator<Item = &MinimalPair> {
        self.build_all_pairs().iter()
    }

    fn build_all_pairs(&self) -> &Vec<MinimalPair> {
        self.pair_cache.get_or_init(|| {
            let mut pairs = Vec::new();
            'outer: for (i, (w1, t1)) in self.lexicon.iter().enumerate() {
                if pairs.len() >= self.max_pairs {
                    break;
                }
                for (w2, t2) in &self.lexicon[i + 1..] {
                    if pairs.len() >= self.max_pairs {
                        break 'outer;
                    }
                    if let Some(pair) = check_minimal_pair(w1, t1, w2, t2, &self.language) {
                        pairs.push(pair);
                    }
                }
            }
            pairs
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curated_es_mx_contains_rhotic_contrast() {
        let pairs = get_curated_pairs("es-mx");
        assert!(pairs.iter().any(|p| p.word1 == "pero" && p.word2 == "perro"));
    }

    #[test]
    fn base_tag_fallback_resolves_regional_variant() {
        let pairs = get_curated_pairs("es-ar");
        assert!(!pairs.is_empty());
        assert_eq!(pairs, get_curated_pairs("es"));
    }

    #[test]
    fn unknown_language_yields_empty_list() {
        assert!(get_curated_pairs("zz").is_empty());
    }

    #[test]
    fn contrast_label_joins_both_phonemes() {
        let pair = &get_curated_pairs("en-us")[0];
        assert_eq!(pair.contrast_label(), "θ/s");
    }

    fn lex(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(w, ipa)| (w.to_string(), ipa.to_string())).collect()
    }

    #[test]
    fn derives_pair_from_lexicon_with_single_phoneme_difference() {
        let gen = MinimalPairGenerator::from_lexicon_strings(
            lex(&[("hola", "o l a"), ("mola", "m o l a"), ("cola", "k o l a")]),
            "es",
            500,
        );
        let pairs = gen.find_pairs_for_contrast("m", "k");
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].position, 0);
    }

    #[test]
    fn words_of_different_length_never_pair() {
        let gen = MinimalPairGenerator::from_lexicon_strings(
            lex(&[("o", "o"), ("hola", "o l a")]),
            "es",
            500,
        );
        assert!(gen.iter_pairs().next().is_none());
    }

    #[test]
    fn words_differing_in_more_than_one_slot_never_pair() {
        let gen = MinimalPairGenerator::from_lexicon_strings(
            lex(&[("bata", "b a t a"), ("poda", "p o d a")]),
            "es",
            500,
        );
        assert!(gen.iter_pairs().next().is_none());
    }

    #[test]
    fn max_pairs_caps_generated_output() {
        let words: HashMap<String, String> = (0..10)
            .map(|i| (format!("w{i}"), format!("a b {i}")))
            .collect();
        let gen = MinimalPairGenerator::from_lexicon_strings(words, "es", 3);
        assert_eq!(gen.iter_pairs().count(), 3);
    }

    #[test]
    fn find_pairs_for_phoneme_matches_either_side() {
        let gen = MinimalPairGenerator::from_lexicon_strings(
            lex(&[("pata", "p a t a"), ("bata", "b a t a")]),
            "es",
            500,
        );
        assert_eq!(gen.find_pairs_for_phoneme("b").len(), 1);
        assert_eq!(gen.find_pairs_for_phoneme("p").len(), 1);
        assert!(gen.find_pairs_for_phoneme("x").is_empty());
    }

    #[test]
    fn curated_pairs_filter_by_tag_and_difficulty() {
        let gen = MinimalPairGenerator::from_lexicon(HashMap::new(), "es-mx", 500);
        assert!(gen.find_pairs_by_tag("rhotic").len() >= 5);
        assert!(gen.find_pairs_by_difficulty(3).iter().all(|p| p.difficulty == 3));
    }
}
