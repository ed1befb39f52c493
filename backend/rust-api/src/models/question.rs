use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// A multiple-choice question as stored in the question bank. Read-only for this service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub area: String,
    pub topic: String,
    pub block: Option<String>,
    #[serde(default)]
    pub title: String,
    pub prompt: String,
    /// Option key (`a`..`d`) to option text.
    pub options: BTreeMap<String, String>,
    pub correct_option: String,
    pub justification: String,
}

impl Question {
    pub fn has_option(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    pub fn is_correct(&self, chosen: Option<&str>) -> bool {
        chosen == Some(self.correct_option.as_str())
    }
}

/// Equality filters applied conjunctively. Absent fields add no clause.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct QuestionFilters {
    pub area: Option<String>,
    pub topic: Option<String>,
    pub block: Option<String>,
    #[validate(range(min = 1, max = 200, message = "limit must be between 1 and 200"))]
    pub limit: Option<usize>,
}

impl QuestionFilters {
    /// Drops empty strings so `?area=` behaves like no filter.
    pub fn normalized(self) -> Self {
        let clean = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        Self {
            area: clean(self.area),
            topic: clean(self.topic),
            block: clean(self.block),
            limit: self.limit,
        }
    }

    pub fn matches(&self, question: &Question) -> bool {
        self.area
            .as_ref()
            .map_or(true, |area| &question.area == area)
            && self
                .topic
                .as_ref()
                .map_or(true, |topic| &question.topic == topic)
            && self
                .block
                .as_ref()
                .map_or(true, |block| question.block.as_ref() == Some(block))
    }
}

/// Question as shown while a test is running: no correct key, no justification.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub id: String,
    pub area: String,
    pub topic: String,
    pub block: Option<String>,
    pub title: String,
    pub prompt: String,
    pub options: BTreeMap<String, String>,
}

impl From<&Question> for QuestionView {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id.clone(),
            area: question.area.clone(),
            topic: question.topic.clone(),
            block: question.block.clone(),
            title: question.title.clone(),
            prompt: question.prompt.clone(),
            options: question.options.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QuestionsResponse {
    pub questions: Vec<Question>,
}

#[cfg(test)]
pub(crate) fn sample_question(id: &str, area: &str, topic: &str, correct: &str) -> Question {
    let options = ["a", "b", "c", "d"]
        .iter()
        .map(|key| (key.to_string(), format!("Opción {}", key.to_uppercase())))
        .collect();
    Question {
        id: id.to_string(),
        area: area.to_string(),
        topic: topic.to_string(),
        block: None,
        title: format!("Pregunta {}", id),
        prompt: format!("Enunciado de la pregunta {}", id),
        options,
        correct_option: correct.to_string(),
        justification: format!("Justificación de {}", id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_apply_only_present_clauses() {
        let mut question = sample_question("q1", "Derecho", "Constitución", "a");
        question.block = Some("Bloque 1".to_string());

        assert!(QuestionFilters::default().matches(&question));

        let by_area = QuestionFilters {
            area: Some("Derecho".to_string()),
            ..Default::default()
        };
        assert!(by_area.matches(&question));

        let wrong_block = QuestionFilters {
            area: Some("Derecho".to_string()),
            block: Some("Bloque 2".to_string()),
            ..Default::default()
        };
        assert!(!wrong_block.matches(&question));
    }

    #[test]
    fn normalized_drops_blank_filters() {
        let filters = QuestionFilters {
            area: Some("  ".to_string()),
            topic: Some("Penal".to_string()),
            block: Some(String::new()),
            limit: Some(5),
        }
        .normalized();

        assert_eq!(filters.area, None);
        assert_eq!(filters.topic.as_deref(), Some("Penal"));
        assert_eq!(filters.block, None);
        assert_eq!(filters.limit, Some(5));
    }

    #[test]
    fn missing_answer_is_never_correct() {
        let question = sample_question("q1", "A", "T", "b");
        assert!(question.is_correct(Some("b")));
        assert!(!question.is_correct(Some("a")));
        assert!(!question.is_correct(None));
    }
}
