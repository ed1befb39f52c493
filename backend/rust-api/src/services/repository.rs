use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::taxonomy::BlockTopicRow;
use crate::models::{AnswerEvent, FailureStreak, Question, QuestionFilters, StreakHit, TestResult};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("query failed: {0}")]
    Query(String),
    #[error("write failed: {0}")]
    Write(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn query(err: impl std::fmt::Display) -> Self {
        StoreError::Query(err.to_string())
    }

    pub fn write(err: impl std::fmt::Display) -> Self {
        StoreError::Write(err.to_string())
    }
}

/// (area, topic) key used by the review aggregation.
pub type AreaTopic = (String, String);

/// Access to the question bank, answer history, results and failure streaks.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// All questions matching the filters, unordered. `limit` is not applied here.
    async fn fetch_questions(&self, filters: &QuestionFilters) -> Result<Vec<Question>, StoreError>;

    /// One (area, topic) pair per question row; duplicates allowed.
    async fn fetch_area_topic_pairs(&self) -> Result<Vec<AreaTopic>, StoreError>;

    async fn fetch_block_rows(&self) -> Result<Vec<BlockTopicRow>, StoreError>;

    /// Inserts the rows only when the block table is empty. Returns whether anything was written.
    async fn seed_block_rows(&self, rows: &[BlockTopicRow]) -> Result<bool, StoreError>;

    async fn insert_answer_event(&self, event: &AnswerEvent) -> Result<(), StoreError>;

    async fn insert_test_result(&self, result: &TestResult) -> Result<(), StoreError>;

    async fn list_test_results(&self, user_id: Option<&str>) -> Result<Vec<TestResult>, StoreError>;

    async fn list_incorrect_answers_since(
        &self,
        user_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<Vec<AnswerEvent>, StoreError>;

    /// All-time attempt counts per (area, topic).
    async fn count_answers_by_area_topic(
        &self,
        user_id: Option<&str>,
    ) -> Result<HashMap<AreaTopic, u32>, StoreError>;

    /// Atomic increment-or-create keyed by (question, user). Returns the updated streak.
    async fn increment_failure_streak(
        &self,
        hit: &StreakHit,
        now: DateTime<Utc>,
    ) -> Result<FailureStreak, StoreError>;

    /// Flips `notified` to true if it is still false. Returns whether this call flipped it.
    async fn mark_streak_notified(
        &self,
        streak_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
