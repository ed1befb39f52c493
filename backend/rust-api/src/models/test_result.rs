use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum percentage for a test to count as passed.
pub const PASS_PERCENTAGE: u32 = 50;

/// Aggregate result of one submitted test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub id: String,
    pub user_id: Option<String>,
    pub area: String,
    pub topic: String,
    pub block: Option<String>,
    pub total_questions: u32,
    pub correct_count: u32,
    pub incorrect_count: u32,
    pub percentage: u32,
    pub passed: bool,
    pub taken_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub correct_count: u32,
    pub incorrect_count: u32,
    pub percentage: u32,
}

impl ScoreSummary {
    pub fn total(&self) -> u32 {
        self.correct_count + self.incorrect_count
    }

    pub fn passed(&self) -> bool {
        self.percentage >= PASS_PERCENTAGE
    }

    pub fn feedback(&self) -> ResultFeedback {
        ResultFeedback::for_percentage(self.percentage)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultFeedback {
    Excellent,
    Good,
    CanImprove,
    NeedsStudy,
}

impl ResultFeedback {
    pub fn for_percentage(percentage: u32) -> Self {
        match percentage {
            90.. => ResultFeedback::Excellent,
            70..=89 => ResultFeedback::Good,
            50..=69 => ResultFeedback::CanImprove,
            _ => ResultFeedback::NeedsStudy,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ResultFeedback::Excellent => "¡Excelente!",
            ResultFeedback::Good => "¡Bien!",
            ResultFeedback::CanImprove => "Puede mejorar",
            ResultFeedback::NeedsStudy => "Necesita más estudio",
        }
    }
}

/// Counts of independent write tasks issued after a test. Partial persistence is tolerated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PersistenceSummary {
    pub attempted: u32,
    pub succeeded: u32,
    pub failed: u32,
    pub streak_updates_failed: u32,
}

impl PersistenceSummary {
    pub fn record(&mut self, ok: bool) {
        self.attempted += 1;
        if ok {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionReview {
    pub question_id: String,
    pub area: String,
    pub topic: String,
    pub prompt: String,
    pub options: BTreeMap<String, String>,
    pub selected_option: Option<String>,
    pub correct_option: String,
    pub correct: bool,
    pub justification: String,
}

/// Everything the results screen needs after a test completes.
#[derive(Debug, Clone, Serialize)]
pub struct TestOutcome {
    pub result_id: String,
    pub score: ScoreSummary,
    pub total_questions: u32,
    pub passed: bool,
    pub feedback: ResultFeedback,
    pub feedback_label: String,
    pub elapsed_seconds: u64,
    pub questions: Vec<QuestionReview>,
    pub persistence: PersistenceSummary,
}
