use std::collections::BTreeMap;
use std::sync::Arc;

use super::repository::{AreaTopic, QuizRepository, StoreError};
use crate::models::taxonomy::{AreasAndTopics, Block, BlockTopic, BlockTopicRow};

pub struct TaxonomyService {
    repository: Arc<dyn QuizRepository>,
}

impl TaxonomyService {
    pub fn new(repository: Arc<dyn QuizRepository>) -> Self {
        Self { repository }
    }

    pub async fn load_areas_and_topics(&self) -> Result<AreasAndTopics, StoreError> {
        let pairs = self.repository.fetch_area_topic_pairs().await?;
        Ok(group_areas(pairs))
    }

    pub async fn load_blocks(&self) -> Result<Vec<Block>, StoreError> {
        let rows = self.repository.fetch_block_rows().await?;
        Ok(group_blocks(rows))
    }
}

fn group_areas(pairs: Vec<AreaTopic>) -> AreasAndTopics {
    let mut grouped = AreasAndTopics::default();
    for (area, topic) in pairs {
        grouped.topics.entry(area).or_default().insert(topic);
    }
    grouped.areas = grouped.topics.keys().cloned().collect();
    grouped
}

fn group_blocks(mut rows: Vec<BlockTopicRow>) -> Vec<Block> {
    rows.sort_by_key(|row| (row.block_number, row.topic_number));

    let mut blocks: BTreeMap<u32, Block> = BTreeMap::new();
    for row in rows {
        blocks
            .entry(row.block_number)
            .or_insert_with(|| Block {
                block_number: row.block_number,
                block_name: row.block_name.clone(),
                topics: Vec::new(),
            })
            .topics
            .push(BlockTopic {
                topic_number: row.topic_number,
                topic_code: row.topic_code,
                topic_name: row.topic_name,
            });
    }
    blocks.into_values().collect()
}
