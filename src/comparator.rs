//! C7 — Comparator
//!
//! Weighted Levenshtein alignment over IPA token sequences, producing the
//! phone-level error taxonomy the rest of the system scores against.
//!
//! The alignment is a pure function of `(ref_tokens, hyp_tokens, weights)`:
//! given identical inputs it always produces byte-identical `ops`, which
//! matters because two `Kernel::run`s with the same plugins and the same
//! audio/text must be reproducible end to end.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ipa::IpaToken;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Weights {
    pub substitute: f64,
    pub insert: f64,
    pub delete: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            substitute: 1.0,
            insert: 1.0,
            delete: 1.0,
        }
    }
}

/// One step of the alignment backtrace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum AlignmentOp {
    Match { r#ref: IpaToken, hyp: IpaToken },
    Substitute { r#ref: IpaToken, hyp: IpaToken },
    Delete { r#ref: IpaToken },
    Insert { hyp: IpaToken },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhonemeStats {
    pub matches: u64,
    pub substitutions: u64,
    pub deletions: u64,
    pub insertions: u64,
}

impl PhonemeStats {
    pub fn errors(&self) -> u64 {
        self.substitutions + self.deletions + self.insertions
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareResult {
    pub per: f64,
    pub ops: Vec<AlignmentOp>,
    pub total_ref_tokens: usize,
    pub matches: usize,
    pub substitutions: usize,
    pub insertions: usize,
    pub deletions: usize,
    pub per_phoneme: HashMap<IpaToken, PhonemeStats>,
}

/// Aligns `ref_tokens` against `hyp_tokens` and scores the result (§4.7).
pub fn compare(
    ref_tokens: &[IpaToken],
    hyp_tokens: &[IpaToken],
    weights: Option<&Weights>,
) -> CompareResult {
    let default_weights = Weights::default();
    let weights = weights.unwrap_or(&default_weights);

    let n = ref_tokens.len();
    let m = hyp_tokens.len();

    let mut cost = vec![vec![0.0f64; m + 1]; n + 1];
    for i in 1..=n {
        cost[i][0] = i as f64 * weights.delete;
    }
    for j in 1..=m {
        cost[0][j] = j as f64 * weights.insert;
    }
    for i in 1..=n {
        for j in 1..=m {
            let sub_cost = if ref_tokens[i - 1] == hyp_tokens[j - 1] {
                0.0
            } else {
                weights.substitute
            };
            let diag = cost[i - 1][j - 1] + sub_cost;
            let up = cost[i - 1][j] + weights.delete;
            let left = cost[i][j - 1] + weights.insert;
            cost[i][j] = diag.min(up).min(left);
        }
    }

    let mut ops = Vec::new();
    let mut i = n;
    let mut j = m;

    while i > 0 || j > 0 {
        if i > 0 && j > 0 {
            let sub_cost = if ref_tokens[i - 1] == hyp_tokens[j - 1] {
                0.0
            } else {
                weights.substitute
            };
            let diag = cost[i - 1][j - 1] + sub_cost;
            if (cost[i][j] - diag).abs() < f64::EPSILON {
                if ref_tokens[i - 1] == hyp_tokens[j - 1] {
                    ops.push(AlignmentOp::Match {
                        r#ref: ref_tokens[i - 1].clone(),
                        hyp: hyp_tokens[j - 1].clone(),
                    });
                } else {
                    ops.push(AlignmentOp::Substitute {
                        r#ref: ref_tokens[i - 1].clone(),
                        hyp: hyp_tokens[j - 1].clone(),
                    });
                }
                i -= 1;
                j -= 1;
                continue;
            }
        }
        if i > 0 {
            let up = cost[i - 1][j] + weights.delete;
            if (cost[i][j] - up).abs() < f64::EPSILON {
                ops.push(AlignmentOp::Delete {
                    r#ref: ref_tokens[i - 1].clone(),
                });
                i -= 1;
                continue;
            }
        }
        // Left (insert) is the last resort in the tie-break order.
        ops.push(AlignmentOp::Insert {
            hyp: hyp_tokens[j - 1].clone(),
        });
        j -= 1;
    }

    ops.reverse();

    let mut matches = 0usize;
    let mut substitutions = 0usize;
    let mut insertions = 0usize;
    let mut deletions = 0usize;
    let mut per_phoneme: HashMap<IpaToken, PhonemeStats> = HashMap::new();

    for op in &ops {
        match op {
            AlignmentOp::Match { r#ref, .. } => {
                matches += 1;
                per_phoneme.entry(r#ref.clone()).or_default().matches += 1;
            }
            AlignmentOp::Substitute { r#ref, .. } => {
                substitutions += 1;
                per_phoneme.entry(r#ref.clone()).or_default().substitutions += 1;
            }
            AlignmentOp::Delete { r#ref } => {
                deletions += 1;
                per_phoneme.entry(r#ref.clone()).or_default().deletions += 1;
            }
            AlignmentOp::Insert { hyp } => {
                insertions += 1;
                per_phoneme.entry(hyp.clone()).or_default().insertions += 1;
            }
        }
    }

    let total_ref_tokens = n;
    let per = (substitutions + deletions + insertions) as f64 / (total_ref_tokens.max(1) as f64);

    CompareResult {
        per,
        ops,
        total_ref_tokens,
        matches,
        substitutions,
        insertions,
        deletions,
        per_phoneme,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &[&str]) -> Vec<IpaToken> {
        s.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn identical_sequences_are_all_matches() {
        let r = toks(&["o", "l", "a"]);
        let result = compare(&r, &r, None);
        assert_eq!(result.per, 0.0);
        assert_eq!(result.matches, 3);
        assert_eq!(result.substitutions + result.insertions + result.deletions, 0);
        assert!(result.ops.iter().all(|op| matches!(op, AlignmentOp::Match { .. })));
    }

    #[test]
    fn single_substitution_scenario_s2() {
        let r = toks(&["o", "l", "a"]);
        let h = toks(&["o", "ɾ", "a"]);
        let result = compare(&r, &h, None);
        assert!((result.per - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(result.ops[1], AlignmentOp::Substitute { r#ref: "l".into(), hyp: "ɾ".into() });
        assert_eq!(result.per_phoneme["l"].substitutions, 1);
    }

    #[test]
    fn insertion_scenario_s3() {
        let r = toks(&["o", "l", "a"]);
        let h = toks(&["o", "l", "a", "s"]);
        let result = compare(&r, &h, None);
        assert!((result.per - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(result.ops.last().unwrap(), &AlignmentOp::Insert { hyp: "s".into() });
        assert_eq!(result.per_phoneme["s"].insertions, 1);
    }

    #[test]
    fn deletion_scenario_s4() {
        let r = toks(&["h", "o", "l", "a"]);
        let h = toks(&["o", "l", "a"]);
        let result = compare(&r, &h, None);
        assert!((result.per - 1.0 / 4.0).abs() < 1e-9);
        assert_eq!(result.ops.first().unwrap(), &AlignmentOp::Delete { r#ref: "h".into() });
    }

    #[test]
    fn op_accounting_invariant() {
        let r = toks(&["a", "b", "c", "d"]);
        let h = toks(&["a", "x", "c", "e", "f"]);
        let result = compare(&r, &h, None);
        assert_eq!(
            result.matches + result.substitutions + result.deletions,
            result.total_ref_tokens
        );
        assert_eq!(result.matches + result.substitutions + result.insertions, h.len());
    }

    #[test]
    fn symmetry_of_counts_under_swap() {
        let a = toks(&["a", "b", "c"]);
        let b = toks(&["a", "x", "c", "y"]);
        let fwd = compare(&a, &b, None);
        let bwd = compare(&b, &a, None);
        assert_eq!(fwd.insertions, bwd.deletions);
        assert_eq!(fwd.deletions, bwd.insertions);
        assert_eq!(fwd.substitutions, bwd.substitutions);
        assert_eq!(fwd.matches, bwd.matches);
    }

    #[test]
    fn empty_sequences_yield_zero_per() {
        let result = compare(&[], &[], None);
        assert_eq!(result.per, 0.0);
        assert!(result.ops.is_empty());
    }

    #[test]
    fn empty_ref_with_hyp_yields_uncapped_per() {
        let h = toks(&["a", "b"]);
        let result = compare(&[], &h, None);
        assert_eq!(result.per, 2.0);
        assert_eq!(result.insertions, 2);
    }

    #[test]
    fn per_never_negative_and_bounded_by_construction() {
        let r = toks(&["a", "b", "c"]);
        let h = toks(&["x", "y"]);
        let result = compare(&r, &h, None);
        assert!(result.per >= 0.0);
        let upper = (result.substitutions + result.deletions + result.insertions) as f64
            / (result.total_ref_tokens.max(1) as f64);
        assert!(result.per <= upper + 1e-9);
    }

    #[test]
    fn custom_weights_affect_chosen_alignment() {
        let r = toks(&["a", "b"]);
        let h = toks(&["a"]);
        let cheap_delete = Weights {
            substitute: 10.0,
            insert: 10.0,
            delete: 0.1,
        };
        let result = compare(&r, &h, Some(&cheap_delete));
        assert!(matches!(result.ops.last().unwrap(), AlignmentOp::Delete { .. }));
    }
}
