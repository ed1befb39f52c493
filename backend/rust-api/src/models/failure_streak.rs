use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per (question, user) counter of wrong answers used to escalate to the mentor.
///
/// `notified` goes from false to true at most once and is never reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureStreak {
    pub id: String,
    pub question_id: String,
    pub question_text: String,
    pub justification: String,
    pub failures: u32,
    pub notified: bool,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FailureStreak {
    pub fn should_notify(&self, threshold: u32) -> bool {
        !self.notified && self.failures >= threshold
    }
}

/// Data needed to bump a streak; the question text is refreshed on every hit.
#[derive(Debug, Clone)]
pub struct StreakHit {
    pub question_id: String,
    pub question_text: String,
    pub justification: String,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakUpdate {
    Counted,
    Notified,
    NotificationFailed,
}
