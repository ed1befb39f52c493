use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::repository::{AreaTopic, QuizRepository, StoreError};
use crate::models::taxonomy::BlockTopicRow;
use crate::models::{AnswerEvent, FailureStreak, Question, QuestionFilters, StreakHit, TestResult};

/// Process-local repository for tests and local runs without MongoDB.
///
/// `set_fail_reads` / `set_fail_writes` make every read or write fail, which is how
/// partial persistence and query failures are exercised.
#[derive(Default)]
pub struct InMemoryQuizRepository {
    questions: Mutex<Vec<Question>>,
    blocks: Mutex<Vec<BlockTopicRow>>,
    answers: Mutex<Vec<AnswerEvent>>,
    results: Mutex<Vec<TestResult>>,
    streaks: Mutex<Vec<FailureStreak>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl InMemoryQuizRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_questions(questions: Vec<Question>) -> Self {
        Self {
            questions: Mutex::new(questions),
            ..Self::default()
        }
    }

    pub async fn add_question(&self, question: Question) {
        self.questions.lock().await.push(question);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn answer_events(&self) -> Vec<AnswerEvent> {
        self.answers.lock().await.clone()
    }

    pub async fn test_results(&self) -> Vec<TestResult> {
        self.results.lock().await.clone()
    }

    pub async fn failure_streaks(&self) -> Vec<FailureStreak> {
        self.streaks.lock().await.clone()
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Query("simulated read failure".to_string()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Write("simulated write failure".to_string()));
        }
        Ok(())
    }
}

fn belongs_to(event_user: Option<&str>, user_id: Option<&str>) -> bool {
    user_id.map_or(true, |user| event_user == Some(user))
}

#[async_trait]
impl QuizRepository for InMemoryQuizRepository {
    async fn fetch_questions(&self, filters: &QuestionFilters) -> Result<Vec<Question>, StoreError> {
        self.check_read()?;
        let questions = self.questions.lock().await;
        Ok(questions
            .iter()
            .filter(|q| filters.matches(q))
            .cloned()
            .collect())
    }

    async fn fetch_area_topic_pairs(&self) -> Result<Vec<AreaTopic>, StoreError> {
        self.check_read()?;
        let questions = self.questions.lock().await;
        Ok(questions
            .iter()
            .map(|q| (q.area.clone(), q.topic.clone()))
            .collect())
    }

    async fn fetch_block_rows(&self) -> Result<Vec<BlockTopicRow>, StoreError> {
        self.check_read()?;
        Ok(self.blocks.lock().await.clone())
    }

    async fn seed_block_rows(&self, rows: &[BlockTopicRow]) -> Result<bool, StoreError> {
        self.check_write()?;
        let mut blocks = self.blocks.lock().await;
        if !blocks.is_empty() {
            return Ok(false);
        }
        blocks.extend_from_slice(rows);
        Ok(true)
    }

    async fn insert_answer_event(&self, event: &AnswerEvent) -> Result<(), StoreError> {
        self.check_write()?;
        self.answers.lock().await.push(event.clone());
        Ok(())
    }

    async fn insert_test_result(&self, result: &TestResult) -> Result<(), StoreError> {
        self.check_write()?;
        self.results.lock().await.push(result.clone());
        Ok(())
    }

    async fn list_test_results(&self, user_id: Option<&str>) -> Result<Vec<TestResult>, StoreError> {
        self.check_read()?;
        let results = self.results.lock().await;
        Ok(results
            .iter()
            .filter(|r| belongs_to(r.user_id.as_deref(), user_id))
            .cloned()
            .collect())
    }

    async fn list_incorrect_answers_since(
        &self,
        user_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<Vec<AnswerEvent>, StoreError> {
        self.check_read()?;
        let answers = self.answers.lock().await;
        Ok(answers
            .iter()
            .filter(|a| !a.correct && a.answered_at >= since)
            .filter(|a| belongs_to(a.user_id.as_deref(), user_id))
            .cloned()
            .collect())
    }

    async fn count_answers_by_area_topic(
        &self,
        user_id: Option<&str>,
    ) -> Result<HashMap<AreaTopic, u32>, StoreError> {
        self.check_read()?;
        let answers = self.answers.lock().await;
        let mut counts = HashMap::new();
        for answer in answers
            .iter()
            .filter(|a| belongs_to(a.user_id.as_deref(), user_id))
        {
            *counts
                .entry((answer.area.clone(), answer.topic.clone()))
                .or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn increment_failure_streak(
        &self,
        hit: &StreakHit,
        now: DateTime<Utc>,
    ) -> Result<FailureStreak, StoreError> {
        self.check_write()?;
        let mut streaks = self.streaks.lock().await;

        if let Some(existing) = streaks
            .iter_mut()
            .find(|s| s.question_id == hit.question_id && s.user_id == hit.user_id)
        {
            existing.failures += 1;
            existing.question_text = hit.question_text.clone();
            existing.justification = hit.justification.clone();
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let streak = FailureStreak {
            id: Uuid::new_v4().to_string(),
            question_id: hit.question_id.clone(),
            question_text: hit.question_text.clone(),
            justification: hit.justification.clone(),
            failures: 1,
            notified: false,
            user_id: hit.user_id.clone(),
            created_at: now,
            updated_at: now,
        };
        streaks.push(streak.clone());
        Ok(streak)
    }

    async fn mark_streak_notified(
        &self,
        streak_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.check_write()?;
        let mut streaks = self.streaks.lock().await;
        match streaks
            .iter_mut()
            .find(|s| s.id == streak_id && !s.notified)
        {
            Some(streak) => {
                streak.notified = true;
                streak.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_read()
    }
}
