use std::sync::Arc;

use rand::seq::SliceRandom;

use super::repository::{QuizRepository, StoreError};
use crate::models::{Question, QuestionFilters};

pub struct QuestionService {
    repository: Arc<dyn QuizRepository>,
}

impl QuestionService {
    pub fn new(repository: Arc<dyn QuizRepository>) -> Self {
        Self { repository }
    }

    /// Matching questions in uniformly random order, truncated to `limit`.
    /// No match is an empty list, not an error.
    pub async fn fetch(&self, filters: &QuestionFilters) -> Result<Vec<Question>, StoreError> {
        let mut questions = self.repository.fetch_questions(filters).await?;

        questions.shuffle(&mut rand::rng());
        if let Some(limit) = filters.limit {
            questions.truncate(limit);
        }

        tracing::debug!(
            "Fetched {} questions (area={:?}, topic={:?}, block={:?})",
            questions.len(),
            filters.area,
            filters.topic,
            filters.block
        );

        Ok(questions)
    }
}
