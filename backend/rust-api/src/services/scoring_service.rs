use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::repository::QuizRepository;
use super::streak_service::StreakService;
use crate::metrics::{record_persistence_write, ANSWERS_RECORDED_TOTAL};
use crate::models::test_result::{QuestionReview, TestOutcome};
use crate::models::{
    AnswerEvent, PersistenceSummary, Question, ScoreSummary, StreakHit, TestResult, TestSession,
};

pub const DEFAULT_AREA: &str = "General";
pub const DEFAULT_TOPIC: &str = "Varios";

/// Integer percentage rounded half up. An empty total scores 0.
pub fn percentage(correct: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((200 * correct + total) / (2 * total)).min(100) as u32
}

/// A question counts as correct only when its recorded choice equals the correct key.
pub fn score(questions: &[Question], answers: &HashMap<String, String>) -> ScoreSummary {
    let correct_count = questions
        .iter()
        .filter(|q| q.is_correct(answers.get(&q.id).map(String::as_str)))
        .count() as u32;
    let total = questions.len() as u32;

    ScoreSummary {
        correct_count,
        incorrect_count: total - correct_count,
        percentage: percentage(correct_count.into(), total.into()),
    }
}

/// One aggregate result per test; area, topic and block come from the first question.
pub fn build_result(
    questions: &[Question],
    summary: &ScoreSummary,
    user_id: Option<&str>,
    taken_at: DateTime<Utc>,
) -> TestResult {
    let first = questions.first();
    TestResult {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.map(str::to_string),
        area: first.map_or_else(|| DEFAULT_AREA.to_string(), |q| q.area.clone()),
        topic: first.map_or_else(|| DEFAULT_TOPIC.to_string(), |q| q.topic.clone()),
        block: first.and_then(|q| q.block.clone()),
        total_questions: summary.total(),
        correct_count: summary.correct_count,
        incorrect_count: summary.incorrect_count,
        percentage: summary.percentage,
        passed: summary.passed(),
        taken_at,
    }
}

fn review_rows(questions: &[Question], answers: &HashMap<String, String>) -> Vec<QuestionReview> {
    questions
        .iter()
        .map(|q| {
            let selected = answers.get(&q.id).cloned();
            QuestionReview {
                question_id: q.id.clone(),
                area: q.area.clone(),
                topic: q.topic.clone(),
                prompt: q.prompt.clone(),
                options: q.options.clone(),
                correct: q.is_correct(selected.as_deref()),
                selected_option: selected,
                correct_option: q.correct_option.clone(),
                justification: q.justification.clone(),
            }
        })
        .collect()
}

/// Scores a completed session and writes its result, answer events and failure streaks.
pub struct ScoringService {
    repository: Arc<dyn QuizRepository>,
    streaks: StreakService,
}

impl ScoringService {
    pub fn new(repository: Arc<dyn QuizRepository>, streaks: StreakService) -> Self {
        Self {
            repository,
            streaks,
        }
    }

    pub async fn finalize(&self, session: &TestSession, now: DateTime<Utc>) -> TestOutcome {
        let summary = score(&session.questions, &session.answers);
        let result = build_result(
            &session.questions,
            &summary,
            session.user_id.as_deref(),
            now,
        );

        let persistence = self.persist(session, &result, now).await;
        if persistence.failed > 0 || persistence.streak_updates_failed > 0 {
            tracing::warn!(
                "Session {} persisted partially: {}/{} writes ok, {} streak updates failed",
                session.id,
                persistence.succeeded,
                persistence.attempted,
                persistence.streak_updates_failed
            );
        }

        let feedback = summary.feedback();
        TestOutcome {
            result_id: result.id,
            score: summary,
            total_questions: summary.total(),
            passed: summary.passed(),
            feedback,
            feedback_label: feedback.label().to_string(),
            elapsed_seconds: session.elapsed_seconds(now),
            questions: review_rows(&session.questions, &session.answers),
            persistence,
        }
    }

    /// Independent sequential writes. A failure is logged and counted, never retried,
    /// and never stops the remaining writes.
    async fn persist(
        &self,
        session: &TestSession,
        result: &TestResult,
        now: DateTime<Utc>,
    ) -> PersistenceSummary {
        let mut summary = PersistenceSummary::default();
        let user_id = session.user_id.as_deref();

        let ok = match self.repository.insert_test_result(result).await {
            Ok(()) => true,
            Err(err) => {
                tracing::error!("Failed to save result {} for session {}: {}", result.id, session.id, err);
                false
            }
        };
        record_persistence_write("test_result", ok);
        summary.record(ok);

        for question in &session.questions {
            let correct = question.is_correct(session.answers.get(&question.id).map(String::as_str));
            ANSWERS_RECORDED_TOTAL
                .with_label_values(&[if correct { "true" } else { "false" }])
                .inc();

            let event = AnswerEvent::for_question(question, user_id, correct, now);
            let ok = match self.repository.insert_answer_event(&event).await {
                Ok(()) => true,
                Err(err) => {
                    tracing::error!(
                        "Failed to save answer to question {} for session {}: {}",
                        question.id,
                        session.id,
                        err
                    );
                    false
                }
            };
            record_persistence_write("answer_event", ok);
            summary.record(ok);

            if !correct {
                let hit = StreakHit {
                    question_id: question.id.clone(),
                    question_text: question.prompt.clone(),
                    justification: question.justification.clone(),
                    user_id: user_id.map(str::to_string),
                };
                if let Err(err) = self.streaks.record_failure(hit).await {
                    tracing::error!(
                        "Failed to update failure streak for question {}: {}",
                        question.id,
                        err
                    );
                    summary.streak_updates_failed += 1;
                }
            }
        }

        summary
    }
}
