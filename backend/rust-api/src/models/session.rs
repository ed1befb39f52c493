use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use super::question::{Question, QuestionFilters, QuestionView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    AwaitingFilters,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("No hay preguntas para los filtros seleccionados")]
    NoQuestions,
    #[error("Session is not in progress")]
    NotInProgress,
    #[error("Session has already started")]
    AlreadyStarted,
    #[error("Option '{0}' does not exist for the current question")]
    UnknownOption(String),
    #[error("Select an option before continuing")]
    NoSelection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Moved(usize),
    Completed,
}

/// One test run, owned by the controller and persisted between requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSession {
    pub id: String,
    pub user_id: Option<String>,
    pub filters: QuestionFilters,
    pub state: SessionState,
    pub questions: Vec<Question>,
    pub current_index: usize,
    /// Committed choices keyed by question id.
    pub answers: HashMap<String, String>,
    /// Choice for the active question that `next` has not committed yet.
    pub pending: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TestSession {
    pub fn new(filters: QuestionFilters, user_id: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            filters,
            state: SessionState::AwaitingFilters,
            questions: Vec::new(),
            current_index: 0,
            answers: HashMap::new(),
            pending: None,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn begin(&mut self, questions: Vec<Question>, now: DateTime<Utc>) -> Result<(), SessionError> {
        if self.state != SessionState::AwaitingFilters {
            return Err(SessionError::AlreadyStarted);
        }
        if questions.is_empty() {
            return Err(SessionError::NoQuestions);
        }

        self.questions = questions;
        self.current_index = 0;
        self.answers.clear();
        self.pending = None;
        self.started_at = Some(now);
        self.state = SessionState::InProgress;
        Ok(())
    }

    pub fn current_question(&self) -> Option<&Question> {
        match self.state {
            SessionState::InProgress => self.questions.get(self.current_index),
            _ => None,
        }
    }

    pub fn select_option(&mut self, option: &str) -> Result<(), SessionError> {
        let question = self.current_question().ok_or(SessionError::NotInProgress)?;
        if !question.has_option(option) {
            return Err(SessionError::UnknownOption(option.to_string()));
        }
        self.pending = Some(option.to_string());
        Ok(())
    }

    /// Commits the pending choice, then advances or completes on the last question.
    pub fn next(&mut self, now: DateTime<Utc>) -> Result<Advance, SessionError> {
        let question_id = self
            .current_question()
            .map(|q| q.id.clone())
            .ok_or(SessionError::NotInProgress)?;
        let choice = self.pending.take().ok_or(SessionError::NoSelection)?;
        self.answers.insert(question_id, choice);

        if self.current_index + 1 >= self.questions.len() {
            self.state = SessionState::Completed;
            self.completed_at = Some(now);
            return Ok(Advance::Completed);
        }

        self.current_index += 1;
        self.pending = self.recorded_choice(self.current_index);
        Ok(Advance::Moved(self.current_index))
    }

    /// Steps back one question and restores its recorded choice. No-op at index 0.
    pub fn previous(&mut self) -> Result<usize, SessionError> {
        if self.state != SessionState::InProgress {
            return Err(SessionError::NotInProgress);
        }
        if self.current_index > 0 {
            self.current_index -= 1;
            self.pending = self.recorded_choice(self.current_index);
        }
        Ok(self.current_index)
    }

    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> u64 {
        let Some(started_at) = self.started_at else {
            return 0;
        };
        let end = self.completed_at.unwrap_or(now);
        (end - started_at).num_seconds().max(0) as u64
    }

    pub fn view(&self, now: DateTime<Utc>) -> SessionView {
        let total = self.questions.len();
        let progress = if total == 0 {
            0
        } else {
            (((self.current_index + 1) * 100) / total) as u32
        };

        SessionView {
            session_id: self.id.clone(),
            state: self.state,
            current_index: self.current_index,
            total_questions: total,
            answered_count: self.answers.len(),
            progress,
            pending_option: self.pending.clone(),
            question: self.current_question().map(QuestionView::from),
            elapsed_seconds: self.elapsed_seconds(now),
        }
    }

    fn recorded_choice(&self, index: usize) -> Option<String> {
        self.questions
            .get(index)
            .and_then(|q| self.answers.get(&q.id))
            .cloned()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: String,
    pub state: SessionState,
    pub current_index: usize,
    pub total_questions: usize,
    pub answered_count: usize,
    pub progress: u32,
    pub pending_option: Option<String>,
    pub question: Option<QuestionView>,
    pub elapsed_seconds: u64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSessionRequest {
    pub area: Option<String>,
    pub topic: Option<String>,
    pub block: Option<String>,
    #[validate(range(min = 1, max = 200, message = "limit must be between 1 and 200"))]
    pub limit: Option<usize>,
    pub user_id: Option<String>,
}

impl CreateSessionRequest {
    pub fn filters(&self) -> QuestionFilters {
        QuestionFilters {
            area: self.area.clone(),
            topic: self.topic.clone(),
            block: self.block.clone(),
            limit: self.limit,
        }
        .normalized()
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SelectOptionRequest {
    #[validate(length(min = 1, max = 8, message = "option must be a short key such as 'a'"))]
    pub option: String,
}
