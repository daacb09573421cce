//! C1 — IPA Normalizer
//!
//! Canonicalizes provider-specific Unicode IPA so downstream tokenization
//! sees a consistent form. Pure function, no plugin trait — there is
//! exactly one normalization algorithm.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Code points stripped before the fold table is applied.
const STRIP_CHARS: [char; 5] = [
    '\u{200b}', // zero-width space
    '\u{200c}', // zero-width non-joiner
    '\u{200d}', // zero-width joiner
    '\u{feff}', // BOM
    '\u{fffe}', // noncharacter
];

/// Config for `normalize`. `allow_list`/`deny_list` operate on the
/// post-fold-table form; whitespace is always kept regardless of either
/// list. `replacements` is an additional ordered table applied after the
/// built-in fold table (longest source first, to avoid prefix overlap).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizeOptions {
    pub allow_list: Option<Vec<char>>,
    pub deny_list: Option<Vec<char>>,
    pub replacements: HashMap<String, String>,
}

/// Folds visually-similar Unicode variants onto their canonical IPA glyph.
///
/// `ɡ` (U+0261, the IPA voiced velar stop) is intentionally left mapped to
/// itself rather than folded to ASCII `g` — a prior fix elsewhere in the
/// pipeline already converts ASCII `g` to `ɡ`, and folding it back would
/// silently undo that.
fn fold_table() -> &'static HashMap<char, char> {
    use std::sync::OnceLock;
    static TABLE: OnceLock<HashMap<char, char>> = OnceLock::new();
    TABLE.get_or_init(|| {
        HashMap::from([
            ('ɡ', 'ɡ'),
            ('ɢ', 'ɢ'),
            ('ʔ', 'ʔ'),
            ('ɑ', 'ɑ'),
            ('α', 'ɑ'),
            ('ə', 'ə'),
            ('ǝ', 'ə'),
            ('ɪ', 'ɪ'),
            ('ı', 'ɪ'),
            ('ˈ', 'ˈ'),
            ('\'', 'ˈ'),
            ('ˌ', 'ˌ'),
            ('ː', 'ː'),
            (':', 'ː'),
            ('\u{0303}', '\u{0303}'),
            ('~', '\u{0303}'),
            ('ɹ', 'ɹ'),
            ('ɻ', 'ɻ'),
            ('ɫ', 'ɫ'),
            ('ʎ', 'ʎ'),
            ('ŋ', 'ŋ'),
            ('ɲ', 'ɲ'),
            ('ɴ', 'ɴ'),
            ('θ', 'θ'),
            ('ð', 'ð'),
            ('ʃ', 'ʃ'),
            ('ʒ', 'ʒ'),
            ('ç', 'ç'),
            ('χ', 'χ'),
            ('ʁ', 'ʁ'),
            ('ħ', 'ħ'),
            ('ʕ', 'ʕ'),
            ('ɾ', 'ɾ'),
            ('ɽ', 'ɽ'),
            ('ʀ', 'ʀ'),
            ('æ', 'æ'),
            ('ɛ', 'ɛ'),
            ('ɔ', 'ɔ'),
            ('ʊ', 'ʊ'),
            ('ʌ', 'ʌ'),
            ('ɒ', 'ɒ'),
            ('œ', 'œ'),
            ('ø', 'ø'),
            ('y', 'y'),
            ('ɨ', 'ɨ'),
            ('ʉ', 'ʉ'),
            ('ɯ', 'ɯ'),
            (' ', ' '),
            ('.', '.'),
            ('|', '|'),
            ('‖', '‖'),
        ])
    })
}

/// See §4.1: NFC → strip zero-widths → fold table → configured replacement
/// table (longest source first) → optional allow/deny filtering → collapse
/// whitespace → re-NFC.
pub fn normalize(text: &str, opts: &NormalizeOptions) -> String {
    let composed: String = text.nfc().collect();
    let stripped: String = composed.chars().filter(|c| !STRIP_CHARS.contains(c)).collect();

    let table = fold_table();
    let folded: String = stripped
        .chars()
        .map(|c| *table.get(&c).unwrap_or(&c))
        .collect();

    let replaced = apply_replacements(&folded, &opts.replacements);

    let filtered = match (&opts.allow_list, &opts.deny_list) {
        (Some(allow), _) => replaced
            .chars()
            .filter(|c| c.is_whitespace() || allow.contains(c))
            .collect(),
        (None, Some(deny)) => replaced
            .chars()
            .filter(|c| c.is_whitespace() || !deny.contains(c))
            .collect(),
        (None, None) => replaced,
    };

    let collapsed = collapse_whitespace(&filtered);
    collapsed.nfc().collect()
}

fn apply_replacements(text: &str, replacements: &HashMap<String, String>) -> String {
    if replacements.is_empty() {
        return text.to_string();
    }

    let mut ordered: Vec<(&String, &String)> = replacements.iter().collect();
    ordered.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let chars: Vec<char> = text.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    'outer: while i < chars.len() {
        for (src, dst) in &ordered {
            let src_chars: Vec<char> = src.chars().collect();
            let len = src_chars.len();
            if len > 0 && i + len <= chars.len() && chars[i..i + len] == src_chars[..] {
                out.push_str(dst);
                i += len;
                continue 'outer;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotent_on_plain_ipa() {
        let opts = NormalizeOptions::default();
        let once = normalize("ola", &opts);
        let twice = normalize(&once, &opts);
        assert_eq!(once, twice);
    }

    #[test]
    fn folds_greek_alpha_to_ipa_open_back() {
        let opts = NormalizeOptions::default();
        assert_eq!(normalize("α", &opts), "ɑ");
    }

    #[test]
    fn folds_ascii_apostrophe_to_primary_stress() {
        let opts = NormalizeOptions::default();
        assert_eq!(normalize("'ola", &opts), "ˈola");
    }

    #[test]
    fn folds_ascii_colon_to_length_mark() {
        let opts = NormalizeOptions::default();
        assert_eq!(normalize("a:", &opts), "aː");
    }

    #[test]
    fn folds_ascii_tilde_to_combining_tilde() {
        let opts = NormalizeOptions::default();
        let result = normalize("a~", &opts);
        assert_eq!(result.chars().last().unwrap(), '\u{0303}');
    }

    #[test]
    fn keeps_canonical_g_unchanged() {
        let opts = NormalizeOptions::default();
        assert_eq!(normalize("ɡato", &opts), "ɡato");
    }

    #[test]
    fn strips_zero_width_characters() {
        let opts = NormalizeOptions::default();
        assert_eq!(normalize("o\u{200b}la", &opts), "ola");
    }

    #[test]
    fn collapses_whitespace_runs() {
        let opts = NormalizeOptions::default();
        assert_eq!(normalize("o  l\t a", &opts), "o l a");
    }

    #[test]
    fn deny_list_drops_characters_but_keeps_whitespace() {
        let opts = NormalizeOptions {
            deny_list: Some(vec!['x']),
            ..Default::default()
        };
        assert_eq!(normalize("o x l a", &opts), "o  l a".split_whitespace().collect::<Vec<_>>().join(" "));
    }

    #[test]
    fn longer_replacement_wins_over_shorter_prefix() {
        let mut replacements = HashMap::new();
        replacements.insert("ab".to_string(), "X".to_string());
        replacements.insert("a".to_string(), "Y".to_string());
        let opts = NormalizeOptions {
            replacements,
            ..Default::default()
        };
        assert_eq!(normalize("ab", &opts), "X");
    }
}
