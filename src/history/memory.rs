//! In-memory `HistoryPort` implementation. Volatile: data is lost on
//! process restart. This is the kernel's default and the one exercised by
//! the kernel's own tests; durability is an out-of-core concern (§4.9).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::comparator::AlignmentOp;

use super::port::HistoryPort;
use super::types::{AttemptRecord, HistoryError, HistorySummary, MasteryLevel, PhonemeMasteryStats};

#[derive(Default)]
pub struct InMemoryHistory {
    attempts: RwLock<HashMap<String, Vec<AttemptRecord>>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

/// The ref-anchored phoneme an op contributes to the mastery denominator:
/// `Match`/`Substitute`/`Delete` carry a `ref`, `Insert` does not and is
/// excluded, matching §4.9's "only ref-anchored ops contribute".
fn ref_phoneme(op: &AlignmentOp) -> Option<&str> {
    match op {
        AlignmentOp::Match { r#ref, .. } => Some(r#ref),
        AlignmentOp::Substitute { r#ref, .. } => Some(r#ref),
        AlignmentOp::Delete { r#ref } => Some(r#ref),
        AlignmentOp::Insert { .. } => None,
    }
}

fn is_correct(op: &AlignmentOp) -> bool {
    matches!(op, AlignmentOp::Match { .. })
}

#[async_trait]
impl HistoryPort for InMemoryHistory {
    async fn setup(&mut self) -> Result<(), HistoryError> {
        Ok(())
    }

    async fn teardown(&mut self) -> Result<(), HistoryError> {
        Ok(())
    }

    async fn record_attempt(
        &self,
        user_id: &str,
        lang: &str,
        text: &str,
        score: f64,
        per: f64,
        ops: Vec<AlignmentOp>,
        meta: HashMap<String, String>,
    ) -> Result<Uuid, HistoryError> {
        let attempt_id = Uuid::new_v4();
        let record = AttemptRecord {
            attempt_id,
            user_id: user_id.to_string(),
            lang: lang.to_string(),
            text: text.to_string(),
            score,
            per,
            ops,
            timestamp: Utc::now(),
            meta,
        };

        let mut attempts = self.attempts.write().await;
        attempts.entry(user_id.to_string()).or_default().push(record);
        Ok(attempt_id)
    }

    async fn get_attempts(
        &self,
        user_id: &str,
        lang: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<AttemptRecord>, HistoryError> {
        let attempts = self.attempts.read().await;
        let records = attempts.get(user_id).cloned().unwrap_or_default();

        let filtered: Vec<AttemptRecord> = match lang {
            Some(lang) => records.into_iter().filter(|r| r.lang == lang).collect(),
            None => records,
        };

        let newest_first: Vec<AttemptRecord> = filtered.into_iter().rev().collect();
        Ok(newest_first.into_iter().skip(offset).take(limit).collect())
    }

    async fn get_phoneme_stats(
        &self,
        user_id: &str,
        lang: &str,
    ) -> Result<Vec<PhonemeMasteryStats>, HistoryError> {
        let attempts = self.attempts.read().await;
        let records: Vec<&AttemptRecord> = attempts
            .get(user_id)
            .map(|records| records.iter().filter(|r| r.lang == lang).collect())
            .unwrap_or_default();

        let mut phoneme_attempts: HashMap<String, u64> = HashMap::new();
        let mut phoneme_correct: HashMap<String, u64> = HashMap::new();

        for record in &records {
            for op in &record.ops {
                let Some(phoneme) = ref_phoneme(op) else {
                    continue;
                };
                *phoneme_attempts.entry(phoneme.to_string()).or_insert(0) += 1;
                if is_correct(op) {
                    *phoneme_correct.entry(phoneme.to_string()).or_insert(0) += 1;
                }
            }
        }

        let mut stats: Vec<PhonemeMasteryStats> = phoneme_attempts
            .into_iter()
            .map(|(phoneme, attempts)| {
                let correct = phoneme_correct.get(&phoneme).copied().unwrap_or(0);
                let error_rate = (attempts - correct) as f64 / (attempts.max(1) as f64);
                PhonemeMasteryStats {
                    phoneme,
                    attempts,
                    correct,
                    error_rate,
                    mastery_level: MasteryLevel::from_error_rate(error_rate),
                }
            })
            .collect();

        stats.sort_by(|a, b| b.error_rate.partial_cmp(&a.error_rate).unwrap());
        Ok(stats)
    }

    async fn get_summary(&self, user_id: &str) -> Result<HistorySummary, HistoryError> {
        let attempts = self.attempts.read().await;
        let records = attempts.get(user_id).cloned().unwrap_or_default();

        if records.is_empty() {
            return Ok(HistorySummary::default());
        }

        let total = records.len() as u64;
        let avg_score = records.iter().map(|r| r.score).sum::<f64>() / records.len() as f64;

        let mut languages: Vec<String> = records.iter().map(|r| r.lang.clone()).collect();
        languages.sort();
        languages.dedup();

        let mut phoneme_errors: HashMap<String, u64> = HashMap::new();
        let mut phoneme_total: HashMap<String, u64> = HashMap::new();

        for record in &records {
            for op in &record.ops {
                let Some(phoneme) = ref_phoneme(op) else {
                    continue;
                };
                *phoneme_total.entry(phoneme.to_string()).or_insert(0) += 1;
                if !is_correct(op) {
                    *phoneme_errors.entry(phoneme.to_string()).or_insert(0) += 1;
                }
            }
        }

        let mut by_rate: Vec<(String, f64)> = phoneme_errors
            .iter()
            .map(|(phoneme, errors)| {
                let total = phoneme_total.get(phoneme).copied().unwrap_or(0).max(1);
                (phoneme.clone(), *errors as f64 / total as f64)
            })
            .collect();
        by_rate.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
        let top_errors = by_rate.into_iter().take(5).map(|(p, _)| p).collect();

        Ok(HistorySummary {
            total_attempts: total,
            avg_score,
            languages,
            top_errors,
        })
    }
}
