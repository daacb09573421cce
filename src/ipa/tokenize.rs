//! C2 — Tokenizer
//!
//! Splits a normalized IPA string into segmental tokens, preserving
//! diacritics, tie-bars, and suprasegmentals. Ported line-for-line from
//! the greedy state machine this spec is distilled from.

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

const TIE_BARS: [char; 2] = ['\u{0361}', '\u{035C}'];
const LENGTH_MARKS: [char; 2] = ['\u{02D0}', '\u{02D1}'];

const SUPRASEGMENTALS: [char; 11] = [
    '\u{02C8}', // ˈ primary stress
    '\u{02CC}', // ˌ secondary stress
    '.',        // syllable break
    '|',        // minor break
    '\u{2016}', // ‖ major break
    '\u{203F}', // ‿ linking mark
    '\u{02E5}', // ˥ tone
    '\u{02E6}', // ˦ tone
    '\u{02E7}', // ˧ tone
    '\u{02E8}', // ˨ tone
    '\u{02E9}', // ˩ tone
];

const ATTACHABLE_MODIFIERS: [char; 15] = [
    '\u{02B0}', // ʰ aspiration
    '\u{02B1}', // ʱ breathy-voice
    '\u{02B2}', // ʲ palatalization
    '\u{02B7}', // ʷ labialization
    '\u{02BC}', // ʼ ejective
    '\u{02C0}', // ˀ glottalization
    '\u{02C1}', // ˁ pharyngealization
    '\u{02E0}', // ˠ velarization
    '\u{02E4}', // ˤ pharyngealization
    '\u{02DE}', // ˞ rhoticity
    '\u{1D5B}', // ᵛ
    '\u{1D50}', // ᵐ nasal release
    '\u{207F}', // ⁿ nasal release
    '\u{1D51}', // ᵑ nasal release
    '\u{1D5A}', // ᶺ
];

/// Standard IPA affricates, the tokenizer's default multigraph set.
pub const DEFAULT_MULTIGRAPHS: [&str; 4] = ["tʃ", "dʒ", "ts", "dz"];

/// Common ES/EN diphthongs, available as an opt-in multigraph set.
pub const DIPHTHONG_MULTIGRAPHS: [&str; 11] = [
    "aɪ", "aʊ", "ɔɪ", "oʊ", "eɪ", "ai", "ei", "oi", "au", "eu", "iu",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenizeOptions {
    pub multigraphs: Vec<String>,
    pub strip_suprasegmentals: bool,
}

impl Default for TokenizeOptions {
    fn default() -> Self {
        Self {
            multigraphs: DEFAULT_MULTIGRAPHS.iter().map(|s| s.to_string()).collect(),
            strip_suprasegmentals: false,
        }
    }
}

/// Split a normalized IPA string into tokens (§4.2's greedy state machine).
pub fn tokenize(text: &str, opts: &TokenizeOptions) -> Vec<String> {
    let mut multigraphs: Vec<&str> = opts.multigraphs.iter().map(|s| s.as_str()).collect();
    multigraphs.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));

    let normalized: String = text.nfc().collect();
    let chars: Vec<char> = if opts.strip_suprasegmentals {
        normalized
            .chars()
            .filter(|c| !SUPRASEGMENTALS.contains(c))
            .collect()
    } else {
        normalized.chars().collect()
    };
    let n = chars.len();

    let mut tokens: Vec<String> = Vec::new();
    let mut current: Vec<char> = Vec::new();
    let mut attach_next = false;
    let mut i = 0usize;

    let flush = |current: &mut Vec<char>, tokens: &mut Vec<String>| {
        if !current.is_empty() {
            tokens.push(current.iter().collect());
            current.clear();
        }
    };

    while i < n {
        let ch = chars[i];

        if current.is_empty() || !attach_next {
            let mut matched = false;
            for mg in &multigraphs {
                let mg_chars: Vec<char> = mg.chars().collect();
                let mg_len = mg_chars.len();
                if mg_len > 0 && i + mg_len <= n && chars[i..i + mg_len] == mg_chars[..] {
                    flush(&mut current, &mut tokens);
                    current.extend_from_slice(&chars[i..i + mg_len]);
                    i += mg_len;
                    matched = true;
                    break;
                }
            }
            if matched {
                continue;
            }
        }

        if ch.is_whitespace() {
            flush(&mut current, &mut tokens);
            attach_next = false;
            i += 1;
            continue;
        }
        if SUPRASEGMENTALS.contains(&ch) {
            flush(&mut current, &mut tokens);
            tokens.push(ch.to_string());
            attach_next = false;
            i += 1;
            continue;
        }
        if is_combining_mark(ch) {
            current.push(ch);
            i += 1;
            continue;
        }
        if LENGTH_MARKS.contains(&ch) || ATTACHABLE_MODIFIERS.contains(&ch) {
            current.push(ch);
            i += 1;
            continue;
        }
        if TIE_BARS.contains(&ch) {
            current.push(ch);
            attach_next = true;
            i += 1;
            continue;
        }

        if current.is_empty() {
            current.push(ch);
            i += 1;
            continue;
        }
        if attach_next {
            current.push(ch);
            attach_next = false;
            i += 1;
            continue;
        }

        flush(&mut current, &mut tokens);
        current.push(ch);
        i += 1;
    }

    flush(&mut current, &mut tokens);
    tokens.into_iter().filter(|t| !t.is_empty()).collect()
}

/// Unicode category Mn (combining mark) check, without pulling in a
/// dedicated unicode-categories crate: the set of combining marks the
/// tokenizer needs to recognize is exactly the ones `char::is_alphabetic`
/// excludes but that NFC leaves decomposed — detected via the general
/// category range used throughout IPA diacritics (U+0300..=U+036F and a
/// handful of spacing variants already covered by the explicit tables
/// above).
fn is_combining_mark(ch: char) -> bool {
    matches!(ch as u32, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x20D0..=0x20FF)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> TokenizeOptions {
        TokenizeOptions::default()
    }

    #[test]
    fn empty_input_yields_empty_list() {
        assert!(tokenize("", &opts()).is_empty());
    }

    #[test]
    fn splits_plain_segments() {
        assert_eq!(tokenize("ola", &opts()), vec!["o", "l", "a"]);
    }

    #[test]
    fn keeps_affricate_as_one_token() {
        assert_eq!(tokenize("tʃai", &opts()), vec!["tʃ", "a", "i"]);
    }

    #[test]
    fn combining_tilde_attaches_to_preceding_base() {
        let result = tokenize("a\u{0303}o", &opts());
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].chars().count(), 2);
    }

    #[test]
    fn stress_mark_is_its_own_token() {
        assert_eq!(tokenize("ˈola", &opts()), vec!["ˈ", "o", "l", "a"]);
    }

    #[test]
    fn consecutive_stress_marks_are_separate_tokens() {
        assert_eq!(tokenize("ˈˌa", &opts()), vec!["ˈ", "ˌ", "a"]);
    }

    #[test]
    fn tie_bar_fuses_two_bases_into_one_token() {
        let result = tokenize("t\u{0361}s", &opts());
        assert_eq!(result, vec!["t\u{0361}s"]);
    }

    #[test]
    fn trailing_tie_bar_with_no_base_does_not_error() {
        let result = tokenize("t\u{0361}", &opts());
        assert_eq!(result, vec!["t\u{0361}"]);
    }

    #[test]
    fn whitespace_flushes_current_token() {
        assert_eq!(tokenize("o l a", &opts()), vec!["o", "l", "a"]);
    }

    #[test]
    fn strip_suprasegmentals_discards_stress_and_breaks() {
        let options = TokenizeOptions {
            strip_suprasegmentals: true,
            ..TokenizeOptions::default()
        };
        assert_eq!(tokenize("ˈo.la", &options), vec!["o", "l", "a"]);
    }

    #[test]
    fn length_mark_attaches_to_preceding_base() {
        assert_eq!(tokenize("aː", &opts()), vec!["aː"]);
    }
}
