use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Derived from answer history on every read; never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewCandidate {
    pub area: String,
    pub topic: String,
    /// Sub-block of the most recent failure, if any.
    pub block: Option<String>,
    pub total_errors: u32,
    pub error_percentage: u32,
    pub last_failure: DateTime<Utc>,
    pub days_since_last_failure: i64,
    pub should_review: bool,
    pub urgency: ReviewUrgency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewUrgency {
    Low,
    Medium,
    High,
}

impl ReviewUrgency {
    pub fn for_days(days_since_last_failure: i64) -> Self {
        if days_since_last_failure >= 14 {
            ReviewUrgency::High
        } else if days_since_last_failure >= 7 {
            ReviewUrgency::Medium
        } else {
            ReviewUrgency::Low
        }
    }
}

/// Widest trailing window, in days, the review aggregation accepts.
pub const MAX_REVIEW_WINDOW_DAYS: i64 = 3650;

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewCandidatesQuery {
    pub user_id: Option<String>,
    #[validate(range(min = 1, max = 3650, message = "window_days must be between 1 and 3650"))]
    pub window_days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ReviewCandidatesResponse {
    pub candidates: Vec<ReviewCandidate>,
}

/// Review exercise as produced by the n8n workflow (Spanish wire keys).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedExercise {
    #[serde(rename = "pregunta")]
    pub question: String,
    #[serde(rename = "opciones")]
    pub options: Vec<String>,
    #[serde(rename = "respuestaCorrecta")]
    pub correct_index: usize,
    #[serde(rename = "explicacion", default)]
    pub explanation: String,
}

impl GeneratedExercise {
    /// Shown when the workflow does not return an exercise list.
    pub fn placeholder(topic: &str) -> Self {
        Self {
            question: format!("Pregunta de repaso sobre {}", topic),
            options: vec![
                "Opción A".to_string(),
                "Opción B".to_string(),
                "Opción C".to_string(),
                "Opción D".to_string(),
            ],
            correct_index: 0,
            explanation: "Explicación detallada del concepto.".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateExercisesRequest {
    #[validate(length(min = 1, message = "area is required"))]
    pub area: String,
    #[validate(length(min = 1, message = "topic is required"))]
    pub topic: String,
    #[validate(range(min = 1, message = "total_errors must be positive"))]
    pub total_errors: u32,
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateExercisesResponse {
    pub exercises: Vec<GeneratedExercise>,
}

#[derive(Debug, Deserialize)]
pub struct ScoreExercisesRequest {
    pub exercises: Vec<GeneratedExercise>,
    /// Chosen option index per exercise, in order. `None` = skipped.
    pub answers: Vec<Option<usize>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExerciseScore {
    pub correct: u32,
    pub total: u32,
    pub passed: bool,
}
