use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::question::Question;

/// One recorded response to one question. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerEvent {
    pub id: String,
    pub user_id: Option<String>,
    pub question_id: String,
    pub area: String,
    pub topic: String,
    pub sub_block: Option<String>,
    pub correct: bool,
    pub origin: AnswerOrigin,
    pub answered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOrigin {
    Test,
    Review,
}

impl AnswerOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerOrigin::Test => "test",
            AnswerOrigin::Review => "review",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "review" | "repaso" => AnswerOrigin::Review,
            _ => AnswerOrigin::Test,
        }
    }
}

impl AnswerEvent {
    pub fn for_question(
        question: &Question,
        user_id: Option<&str>,
        correct: bool,
        answered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.map(str::to_string),
            question_id: question.id.clone(),
            area: question.area.clone(),
            topic: question.topic.clone(),
            sub_block: question.block.clone(),
            correct,
            origin: AnswerOrigin::Test,
            answered_at,
        }
    }
}
