use std::collections::BTreeMap;
use std::sync::Arc;

use super::repository::{QuizRepository, StoreError};
use super::scoring_service::percentage;
use crate::models::stats::{GroupStats, PerformanceStats, TopicStats};
use crate::models::TestResult;

#[derive(Default)]
struct Tally {
    tests: u64,
    questions: u64,
    correct: u64,
}

impl Tally {
    fn add(&mut self, result: &TestResult) {
        self.tests += 1;
        self.questions += u64::from(result.total_questions);
        self.correct += u64::from(result.correct_count);
    }
}

pub fn summarize(results: &[TestResult]) -> PerformanceStats {
    let mut overall = Tally::default();
    let mut groups: BTreeMap<String, (Tally, BTreeMap<String, Tally>)> = BTreeMap::new();

    for result in results {
        overall.add(result);
        let key = result.block.clone().unwrap_or_else(|| result.area.clone());
        let (group, topics) = groups.entry(key).or_default();
        group.add(result);
        topics.entry(result.topic.clone()).or_default().add(result);
    }

    PerformanceStats {
        tests_completed: overall.tests,
        total_questions: overall.questions,
        total_correct: overall.correct,
        overall_percentage: percentage(overall.correct, overall.questions),
        groups: groups
            .into_iter()
            .map(|(key, (group, topics))| GroupStats {
                key,
                tests: group.tests,
                questions: group.questions,
                correct: group.correct,
                percentage: percentage(group.correct, group.questions),
                topics: topics
                    .into_iter()
                    .map(|(topic, tally)| TopicStats {
                        topic,
                        tests: tally.tests,
                        questions: tally.questions,
                        correct: tally.correct,
                        percentage: percentage(tally.correct, tally.questions),
                    })
                    .collect(),
            })
            .collect(),
    }
}

pub struct StatsService {
    repository: Arc<dyn QuizRepository>,
}

impl StatsService {
    pub fn new(repository: Arc<dyn QuizRepository>) -> Self {
        Self { repository }
    }

    pub async fn performance(&self, user_id: Option<&str>) -> Result<PerformanceStats, StoreError> {
        let results = self.repository.list_test_results(user_id).await?;
        Ok(summarize(&results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn result(area: &str, topic: &str, block: Option<&str>, total: u32, correct: u32) -> TestResult {
        TestResult {
            id: format!("{}-{}", area, topic),
            user_id: None,
            area: area.to_string(),
            topic: topic.to_string(),
            block: block.map(str::to_string),
            total_questions: total,
            correct_count: correct,
            incorrect_count: total - correct,
            percentage: percentage(correct.into(), total.into()),
            passed: percentage(correct.into(), total.into()) >= 50,
            taken_at: Utc::now(),
        }
    }

    #[test]
    fn empty_history_reports_zeroes() {
        let stats = summarize(&[]);
        assert_eq!(stats, PerformanceStats::default());
    }

    #[test]
    fn groups_by_block_then_area() {
        let stats = summarize(&[
            result("Ciencias Jurídicas", "Derecho Penal", Some("1. Ciencias Jurídicas"), 10, 7),
            result("Ciencias Jurídicas", "Derecho Civil", Some("1. Ciencias Jurídicas"), 10, 4),
            result("Inglés", "Gramática", None, 3, 2),
        ]);

        assert_eq!(stats.tests_completed, 3);
        assert_eq!(stats.total_questions, 23);
        assert_eq!(stats.overall_percentage, 57);

        assert_eq!(stats.groups.len(), 2);
        assert_eq!(stats.groups[0].key, "1. Ciencias Jurídicas");
        assert_eq!(stats.groups[0].percentage, 55);
        assert_eq!(stats.groups[0].topics[0].topic, "Derecho Civil");
        assert_eq!(stats.groups[1].key, "Inglés");
        assert_eq!(stats.groups[1].topics[0].percentage, 67);
    }

    #[test]
    fn large_histories_do_not_overflow() {
        let big = result("Ciencias Jurídicas", "Derecho Penal", None, u32::MAX, u32::MAX / 2);
        let stats = summarize(&[big.clone(), big.clone(), big]);

        assert_eq!(stats.total_questions, 3 * u64::from(u32::MAX));
        assert_eq!(stats.total_correct, 3 * u64::from(u32::MAX / 2));
        assert_eq!(stats.overall_percentage, 50);
        assert_eq!(stats.groups[0].questions, 3 * u64::from(u32::MAX));
    }
}
