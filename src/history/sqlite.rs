//! Optional durable `HistoryPort` backed by SQLite (feature `sqlite-history`).
//!
//! Demonstrates the port is storage-agnostic; `InMemoryHistory` remains the
//! kernel's default. Grounded on the teacher's `Arc<Mutex<Connection>>` +
//! `tokio::task::spawn_blocking` pattern for driving a synchronous
//! `rusqlite::Connection` from async code without blocking the runtime.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::comparator::AlignmentOp;

use super::port::HistoryPort;
use super::types::{AttemptRecord, HistoryError, HistorySummary, MasteryLevel, PhonemeMasteryStats};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS attempts (
    attempt_id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    lang TEXT NOT NULL,
    text TEXT NOT NULL,
    score REAL NOT NULL,
    per REAL NOT NULL,
    ops_json TEXT NOT NULL,
    meta_json TEXT NOT NULL,
    timestamp_secs INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_attempts_user ON attempts(user_id);
";

pub struct SqliteHistory {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteHistory {
    pub fn open(path: &str) -> Result<Self, HistoryError> {
        let conn = Connection::open(path).map_err(|e| HistoryError::Backend {
            message: e.to_string(),
        })?;
        conn.execute_batch(SCHEMA).map_err(|e| HistoryError::Backend {
            message: e.to_string(),
        })?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn row_to_record(
        attempt_id: String,
        user_id: String,
        lang: String,
        text: String,
        score: f64,
        per: f64,
        ops_json: String,
        meta_json: String,
        timestamp_secs: i64,
    ) -> Result<AttemptRecord, HistoryError> {
        let ops: Vec<AlignmentOp> =
            serde_json::from_str(&ops_json).map_err(|e| HistoryError::Backend {
                message: e.to_string(),
            })?;
        let meta: HashMap<String, String> =
            serde_json::from_str(&meta_json).map_err(|e| HistoryError::Backend {
                message: e.to_string(),
            })?;
        let attempt_id = Uuid::parse_str(&attempt_id).map_err(|e| HistoryError::Backend {
            message: e.to_string(),
        })?;
        let timestamp: DateTime<Utc> = Utc
            .timestamp_opt(timestamp_secs, 0)
            .single()
            .unwrap_or_else(Utc::now);

        Ok(AttemptRecord {
            attempt_id,
            user_id,
            lang,
            text,
            score,
            per,
            ops,
            timestamp,
            meta,
        })
    }
}

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
impl HistoryPort for SqliteHistory {
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
        let ops_json = serde_json::to_string(&ops).map_err(|e| HistoryError::Backend {
            message: e.to_string(),
        })?;
        let meta_json = serde_json::to_string(&meta).map_err(|e| HistoryError::Backend {
            message: e.to_string(),
        })?;
        let now = Utc::now().timestamp();

        let conn = self.conn.clone();
        let (user_id, lang, text) = (user_id.to_string(), lang.to_string(), text.to_string());
        let id_str = attempt_id.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT INTO attempts (attempt_id, user_id, lang, text, score, per, ops_json, meta_json, timestamp_secs)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![id_str, user_id, lang, text, score, per, ops_json, meta_json, now],
            )
        })
        .await
        .map_err(|e| HistoryError::Backend { message: e.to_string() })?
        .map_err(|e| HistoryError::Backend { message: e.to_string() })?;

        Ok(attempt_id)
    }

    async fn get_attempts(
        &self,
        user_id: &str,
        lang: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<AttemptRecord>, HistoryError> {
        let conn = self.conn.clone();
        let user_id = user_id.to_string();
        let lang = lang.map(|s| s.to_string());

        let rows = tokio::task::spawn_blocking(move || -> rusqlite::Result<Vec<_>> {
            let conn = conn.blocking_lock();
            let mut stmt = conn.prepare(
                "SELECT attempt_id, user_id, lang, text, score, per, ops_json, meta_json, timestamp_secs
                 FROM attempts WHERE user_id = ?1 AND (?2 IS NULL OR lang = ?2)
                 ORDER BY timestamp_secs DESC LIMIT ?3 OFFSET ?4",
            )?;
            let mapped = stmt.query_map(params![user_id, lang, limit as i64, offset as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, f64>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, i64>(8)?,
                ))
            })?;
            mapped.collect::<rusqlite::Result<Vec<_>>>()
        })
        .await
        .map_err(|e| HistoryError::Backend { message: e.to_string() })?
        .map_err(|e| HistoryError::Backend { message: e.to_string() })?;

        rows.into_iter()
            .map(|(id, u, l, t, s, p, o, m, ts)| Self::row_to_record(id, u, l, t, s, p, o, m, ts))
            .collect()
    }

    async fn get_phoneme_stats(
        &self,
        user_id: &str,
        lang: &str,
    ) -> Result<Vec<PhonemeMasteryStats>, HistoryError> {
        let records = self.get_attempts(user_id, Some(lang), usize::MAX, 0).await?;

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
        let records = self.get_attempts(user_id, None, usize::MAX, 0).await?;
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

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_and_reads_back_an_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.sqlite3");
        let history = SqliteHistory::open(path.to_str().unwrap()).unwrap();

        let ops = vec![AlignmentOp::Match {
            r#ref: "o".into(),
            hyp: "o".into(),
        }];
        let id = history
            .record_attempt("u1", "es", "ola", 100.0, 0.0, ops, HashMap::new())
            .await
            .unwrap();

        let attempts = history.get_attempts("u1", None, 10, 0).await.unwrap();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].attempt_id, id);
    }
}
