//! Shared types for the history port (C9).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::comparator::AlignmentOp;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub attempt_id: Uuid,
    pub user_id: String,
    pub lang: String,
    pub text: String,
    pub score: f64,
    pub per: f64,
    pub ops: Vec<AlignmentOp>,
    pub timestamp: DateTime<Utc>,
    pub meta: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasteryLevel {
    Beginner,
    Developing,
    Proficient,
    Mastered,
}

/// Thresholds from §3: `<0.05 mastered, <0.20 proficient, <0.50 developing,
/// else beginner`.
impl MasteryLevel {
    pub fn from_error_rate(error_rate: f64) -> Self {
        if error_rate < 0.05 {
            MasteryLevel::Mastered
        } else if error_rate < 0.20 {
            MasteryLevel::Proficient
        } else if error_rate < 0.50 {
            MasteryLevel::Developing
        } else {
            MasteryLevel::Beginner
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhonemeMasteryStats {
    pub phoneme: String,
    pub attempts: u64,
    pub correct: u64,
    pub error_rate: f64,
    pub mastery_level: MasteryLevel,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistorySummary {
    pub total_attempts: u64,
    pub avg_score: f64,
    pub languages: Vec<String>,
    pub top_errors: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history backend failure: {message}")]
    Backend { message: String },
}
