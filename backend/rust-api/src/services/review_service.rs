use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use super::relay_service::RelayService;
use super::repository::{AreaTopic, QuizRepository, StoreError};
use super::scoring_service::percentage;
use crate::config::ReviewConfig;
use crate::models::relay::{RelayOutcome, RelayRequest, ReviewExercisesRequest};
use crate::models::review::{
    ExerciseScore, GenerateExercisesRequest, GeneratedExercise, ReviewCandidate, ReviewUrgency,
    MAX_REVIEW_WINDOW_DAYS,
};
use crate::models::AnswerEvent;
use crate::utils::time::days_between;

/// Share of correct answers a review round needs to pass.
pub const REVIEW_PASS_PERCENTAGE: u32 = 80;

struct ErrorGroup {
    errors: u32,
    last_failure: DateTime<Utc>,
    block: Option<String>,
}

/// Ranks (area, topic) groups by error rate. Pure: same inputs, same ordered output.
pub fn rank_candidates(
    incorrect: &[AnswerEvent],
    attempts: &HashMap<AreaTopic, u32>,
    config: &ReviewConfig,
    now: DateTime<Utc>,
) -> Vec<ReviewCandidate> {
    let mut groups: BTreeMap<AreaTopic, ErrorGroup> = BTreeMap::new();
    for event in incorrect.iter().filter(|e| !e.correct) {
        let group = groups
            .entry((event.area.clone(), event.topic.clone()))
            .or_insert_with(|| ErrorGroup {
                errors: 0,
                last_failure: event.answered_at,
                block: event.sub_block.clone(),
            });
        group.errors += 1;
        if event.answered_at > group.last_failure {
            group.last_failure = event.answered_at;
            group.block = event.sub_block.clone();
        }
    }

    let mut candidates: Vec<ReviewCandidate> = groups
        .into_iter()
        .filter(|(_, group)| group.errors >= config.min_errors)
        .filter_map(|((area, topic), group)| {
            let total = attempts
                .get(&(area.clone(), topic.clone()))
                .copied()
                .unwrap_or(0)
                .max(1);
            let error_percentage = percentage(group.errors.into(), total.into());
            let days = days_between(group.last_failure, now);
            let should_review = days >= config.due_after_days;

            should_review.then(|| ReviewCandidate {
                area,
                topic,
                block: group.block,
                total_errors: group.errors,
                error_percentage,
                last_failure: group.last_failure,
                days_since_last_failure: days,
                should_review,
                urgency: ReviewUrgency::for_days(days),
            })
        })
        .collect();

    // Stable sort keeps the (area, topic) order among equal percentages.
    candidates.sort_by(|a, b| b.error_percentage.cmp(&a.error_percentage));
    candidates.truncate(config.max_candidates);
    candidates
}

pub fn score_exercises(exercises: &[GeneratedExercise], answers: &[Option<usize>]) -> ExerciseScore {
    let total = exercises.len() as u32;
    let correct = exercises
        .iter()
        .zip(answers.iter().chain(std::iter::repeat(&None)))
        .filter(|(exercise, answer)| **answer == Some(exercise.correct_index))
        .count() as u32;

    ExerciseScore {
        correct,
        total,
        passed: total > 0 && correct * 100 >= REVIEW_PASS_PERCENTAGE * total,
    }
}

fn exercises_from_body(body: &serde_json::Value, topic: &str) -> Vec<GeneratedExercise> {
    match body.get("exercises") {
        Some(list) => match serde_json::from_value::<Vec<GeneratedExercise>>(list.clone()) {
            Ok(exercises) => exercises,
            Err(err) => {
                tracing::warn!("Ignoring malformed exercise list for {}: {}", topic, err);
                vec![GeneratedExercise::placeholder(topic)]
            }
        },
        None => vec![GeneratedExercise::placeholder(topic)],
    }
}

/// Start of a trailing window of `days` days. Saturates at the earliest representable instant.
fn window_start(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    TimeDelta::try_days(days)
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

pub struct ReviewService {
    repository: Arc<dyn QuizRepository>,
    relay: RelayService,
    config: ReviewConfig,
}

impl ReviewService {
    pub fn new(repository: Arc<dyn QuizRepository>, relay: RelayService, config: ReviewConfig) -> Self {
        Self {
            repository,
            relay,
            config,
        }
    }

    pub async fn compute_candidates(
        &self,
        user_id: Option<&str>,
        window_days: Option<i64>,
    ) -> Result<Vec<ReviewCandidate>, StoreError> {
        self.compute_candidates_at(user_id, window_days, Utc::now())
            .await
    }

    pub async fn compute_candidates_at(
        &self,
        user_id: Option<&str>,
        window_days: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReviewCandidate>, StoreError> {
        let window = window_days
            .filter(|days| *days > 0)
            .unwrap_or(self.config.window_days)
            .min(MAX_REVIEW_WINDOW_DAYS);
        let since = window_start(now, window);

        let incorrect = self
            .repository
            .list_incorrect_answers_since(user_id, since)
            .await?;
        let attempts = self.repository.count_answers_by_area_topic(user_id).await?;

        let candidates = rank_candidates(&incorrect, &attempts, &self.config, now);
        tracing::debug!(
            "{} review candidates from {} recent errors (window={}d)",
            candidates.len(),
            incorrect.len(),
            window
        );
        Ok(candidates)
    }

    /// Asks the workflow for exercises. Any degraded relay outcome yields the placeholder.
    pub async fn generate_exercises(&self, req: &GenerateExercisesRequest) -> Vec<GeneratedExercise> {
        let request = RelayRequest::GenerateReviewExercises(ReviewExercisesRequest {
            session_id: req
                .session_id
                .clone()
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| Uuid::new_v4().simple().to_string()),
            area: req.area.clone(),
            topic: req.topic.clone(),
            total_errors: req.total_errors,
        });

        let outcome = self.relay.forward(&request).await;
        if !matches!(outcome, RelayOutcome::Forwarded(_)) {
            tracing::warn!(
                "Exercise generation for {} / {} degraded ({})",
                req.area,
                req.topic,
                outcome.label()
            );
        }
        exercises_from_body(&outcome.into_body(), &req.topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnswerOrigin;
    use chrono::Duration;

    fn event(area: &str, topic: &str, correct: bool, at: DateTime<Utc>) -> AnswerEvent {
        AnswerEvent {
            id: Uuid::new_v4().to_string(),
            user_id: None,
            question_id: "q".to_string(),
            area: area.to_string(),
            topic: topic.to_string(),
            sub_block: Some(format!("{} / bloque", topic)),
            correct,
            origin: AnswerOrigin::Test,
            answered_at: at,
        }
    }

    fn attempts(entries: &[(&str, &str, u32)]) -> HashMap<AreaTopic, u32> {
        entries
            .iter()
            .map(|(a, t, n)| ((a.to_string(), t.to_string()), *n))
            .collect()
    }

    #[test]
    fn groups_below_min_errors_are_dropped() {
        let now = Utc::now();
        let incorrect = vec![
            event("Derecho", "Penal", false, now),
            event("Derecho", "Penal", false, now),
            event("Derecho", "Civil", false, now),
        ];
        let candidates = rank_candidates(
            &incorrect,
            &attempts(&[("Derecho", "Penal", 4), ("Derecho", "Civil", 1)]),
            &ReviewConfig::default(),
            now,
        );
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].topic, "Penal");
        assert_eq!(candidates[0].error_percentage, 50);
    }

    #[test]
    fn sorted_by_error_rate_and_capped() {
        let now = Utc::now();
        let mut incorrect = Vec::new();
        let mut totals = Vec::new();
        for i in 0..15u32 {
            let topic = format!("T{:02}", i);
            incorrect.push(event("A", &topic, false, now));
            incorrect.push(event("A", &topic, false, now));
            totals.push(("A".to_string(), topic, 2 + i));
        }
        let totals: HashMap<AreaTopic, u32> =
            totals.into_iter().map(|(a, t, n)| ((a, t), n)).collect();

        let candidates = rank_candidates(&incorrect, &totals, &ReviewConfig::default(), now);
        assert_eq!(candidates.len(), 10);
        assert_eq!(candidates[0].error_percentage, 100);
        assert!(candidates
            .windows(2)
            .all(|w| w[0].error_percentage >= w[1].error_percentage));
        assert!(candidates.iter().all(|c| c.total_errors >= 2));
    }

    #[test]
    fn recency_and_urgency_follow_last_failure() {
        let now = Utc::now();
        let incorrect = vec![
            event("A", "T", false, now - Duration::days(20)),
            event("A", "T", false, now - Duration::days(8)),
        ];
        let candidates = rank_candidates(
            &incorrect,
            &attempts(&[("A", "T", 3)]),
            &ReviewConfig::default(),
            now,
        );
        assert_eq!(candidates[0].days_since_last_failure, 8);
        assert_eq!(candidates[0].urgency, ReviewUrgency::Medium);
        assert_eq!(candidates[0].error_percentage, 67);
        assert!(candidates[0].should_review);
    }

    #[test]
    fn due_after_days_holds_back_fresh_errors() {
        let now = Utc::now();
        let incorrect = vec![event("A", "T", false, now), event("A", "T", false, now)];
        let config = ReviewConfig {
            due_after_days: 1,
            ..ReviewConfig::default()
        };
        assert!(rank_candidates(&incorrect, &HashMap::new(), &config, now).is_empty());
    }

    #[test]
    fn error_percentage_is_clamped() {
        let now = Utc::now();
        let incorrect = vec![event("A", "T", false, now); 3];
        let candidates = rank_candidates(&incorrect, &HashMap::new(), &ReviewConfig::default(), now);
        assert_eq!(candidates[0].error_percentage, 100);
    }

    #[test]
    fn window_start_saturates_instead_of_overflowing() {
        let now = Utc::now();
        assert_eq!(window_start(now, 30), now - Duration::days(30));
        assert_eq!(window_start(now, i64::MAX), DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn review_round_needs_eighty_percent() {
        let exercises: Vec<_> = (0..5).map(|_| GeneratedExercise::placeholder("T")).collect();
        let four_right = [Some(0), Some(0), Some(0), Some(0), Some(2)];
        assert_eq!(
            score_exercises(&exercises, &four_right),
            ExerciseScore {
                correct: 4,
                total: 5,
                passed: true
            }
        );
        assert!(!score_exercises(&exercises, &[Some(0), Some(0), None]).passed);
        assert!(!score_exercises(&[], &[]).passed);
    }

    #[test]
    fn missing_exercise_list_falls_back_to_placeholder() {
        let body = serde_json::json!({ "output": "fallback", "status": "fallback" });
        let exercises = exercises_from_body(&body, "Derecho Penal");
        assert_eq!(exercises.len(), 1);
        assert_eq!(exercises[0].question, "Pregunta de repaso sobre Derecho Penal");
    }
}
