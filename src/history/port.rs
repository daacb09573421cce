//! C9 — History port contract. Storage strategy is left to the impl; the
//! kernel's default is `InMemoryHistory`, with an optional SQLite-backed
//! implementation behind the `sqlite-history` feature.

use async_trait::async_trait;
use uuid::Uuid;

use crate::comparator::AlignmentOp;

use super::types::{AttemptRecord, HistoryError, HistorySummary, PhonemeMasteryStats};

#[async_trait]
pub trait HistoryPort: Send + Sync {
    async fn setup(&mut self) -> Result<(), HistoryError>;

    async fn teardown(&mut self) -> Result<(), HistoryError>;

    #[allow(clippy::too_many_arguments)]
    async fn record_attempt(
        &self,
        user_id: &str,
        lang: &str,
        text: &str,
        score: f64,
        per: f64,
        ops: Vec<AlignmentOp>,
        meta: std::collections::HashMap<String, String>,
    ) -> Result<Uuid, HistoryError>;

    async fn get_attempts(
        &self,
        user_id: &str,
        lang: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<AttemptRecord>, HistoryError>;

    async fn get_phoneme_stats(
        &self,
        user_id: &str,
        lang: &str,
    ) -> Result<Vec<PhonemeMasteryStats>, HistoryError>;

    async fn get_summary(&self, user_id: &str) -> Result<HistorySummary, HistoryError>;
}
