use anyhow::{Context, Result};

use super::repository::QuizRepository;
use crate::models::taxonomy::guardia_civil_reference;

/// Loads the Guardia Civil block table on first start. Existing rows are never touched.
pub async fn bootstrap(repository: &dyn QuizRepository) -> Result<()> {
    let rows = guardia_civil_reference();
    tracing::debug!("Checking block table ({} reference topics)", rows.len());

    let inserted = repository
        .seed_block_rows(&rows)
        .await
        .context("Failed to seed Guardia Civil blocks")?;

    if inserted {
        tracing::info!("Seeded {} Guardia Civil block topics", rows.len());
    } else {
        tracing::info!("Block table already populated, seed skipped");
    }

    Ok(())
}
