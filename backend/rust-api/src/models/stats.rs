use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceStats {
    pub tests_completed: u64,
    pub total_questions: u64,
    pub total_correct: u64,
    pub overall_percentage: u32,
    pub groups: Vec<GroupStats>,
}

/// Results grouped under a block label, or the area when the block is absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub key: String,
    pub tests: u64,
    pub questions: u64,
    pub correct: u64,
    pub percentage: u32,
    pub topics: Vec<TopicStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicStats {
    pub topic: String,
    pub tests: u64,
    pub questions: u64,
    pub correct: u64,
    pub percentage: u32,
}
