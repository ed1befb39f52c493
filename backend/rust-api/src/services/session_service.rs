use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use super::question_service::QuestionService;
use super::repository::{QuizRepository, StoreError};
use super::scoring_service::ScoringService;
use super::session_store::SessionStore;
use crate::metrics::TEST_SESSIONS_TOTAL;
use crate::models::session::{Advance, CreateSessionRequest, SessionView};
use crate::models::test_result::TestOutcome;
use crate::models::{SessionError, TestSession};

#[derive(Debug, Error)]
pub enum SessionServiceError {
    #[error("Session not found")]
    NotFound,
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum NextResult {
    Moved(SessionView),
    Completed(TestOutcome),
}

/// Drives the test session state machine across requests.
pub struct SessionService {
    repository: Arc<dyn QuizRepository>,
    sessions: Arc<dyn SessionStore>,
    scoring: ScoringService,
}

impl SessionService {
    pub fn new(
        repository: Arc<dyn QuizRepository>,
        sessions: Arc<dyn SessionStore>,
        scoring: ScoringService,
    ) -> Self {
        Self {
            repository,
            sessions,
            scoring,
        }
    }

    pub async fn create_session(
        &self,
        req: CreateSessionRequest,
    ) -> Result<SessionView, SessionServiceError> {
        let filters = req.filters();
        let questions = QuestionService::new(self.repository.clone())
            .fetch(&filters)
            .await?;

        let now = Utc::now();
        let mut session = TestSession::new(filters, req.user_id);
        session.begin(questions, now)?;
        self.sessions.save(&session).await?;

        TEST_SESSIONS_TOTAL.with_label_values(&["created"]).inc();
        tracing::info!(
            "Test session {} started with {} questions (user={:?})",
            session.id,
            session.questions.len(),
            session.user_id
        );

        Ok(session.view(now))
    }

    pub async fn get_session(&self, session_id: &str) -> Result<SessionView, SessionServiceError> {
        let session = self.load(session_id).await?;
        Ok(session.view(Utc::now()))
    }

    pub async fn select_option(
        &self,
        session_id: &str,
        option: &str,
    ) -> Result<SessionView, SessionServiceError> {
        let mut session = self.load(session_id).await?;
        session.select_option(option)?;
        self.sessions.save(&session).await?;
        Ok(session.view(Utc::now()))
    }

    pub async fn next(&self, session_id: &str) -> Result<NextResult, SessionServiceError> {
        let mut session = self.load(session_id).await?;
        let now = Utc::now();

        match session.next(now)? {
            Advance::Moved(_) => {
                self.sessions.save(&session).await?;
                Ok(NextResult::Moved(session.view(now)))
            }
            Advance::Completed => {
                // Only the request that deletes the session gets to persist it
                if !self.sessions.remove(session_id).await? {
                    tracing::debug!("Test session {} already finalized", session_id);
                    return Err(SessionServiceError::NotFound);
                }
                let outcome = self.scoring.finalize(&session, now).await;

                TEST_SESSIONS_TOTAL.with_label_values(&["completed"]).inc();
                tracing::info!(
                    "Test session {} completed: {}/{} correct",
                    session_id,
                    outcome.score.correct_count,
                    outcome.total_questions
                );

                Ok(NextResult::Completed(outcome))
            }
        }
    }

    pub async fn previous(&self, session_id: &str) -> Result<SessionView, SessionServiceError> {
        let mut session = self.load(session_id).await?;
        session.previous()?;
        self.sessions.save(&session).await?;
        Ok(session.view(Utc::now()))
    }

    /// Back to menu: the session is dropped and nothing is persisted.
    pub async fn discard(&self, session_id: &str) -> Result<(), SessionServiceError> {
        if !self.sessions.remove(session_id).await? {
            return Err(SessionServiceError::NotFound);
        }

        TEST_SESSIONS_TOTAL.with_label_values(&["discarded"]).inc();
        tracing::info!("Test session {} discarded", session_id);
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<TestSession, SessionServiceError> {
        self.sessions
            .load(session_id)
            .await?
            .ok_or(SessionServiceError::NotFound)
    }
}
