use axum::{extract::State, Json};
use std::sync::Arc;

use super::error::ApiError;
use crate::models::taxonomy::{AreasAndTopics, BlocksResponse};
use crate::services::AppState;

pub async fn list_areas(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AreasAndTopics>, ApiError> {
    let areas = state.taxonomy_service().load_areas_and_topics().await?;
    Ok(Json(areas))
}

pub async fn list_blocks(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BlocksResponse>, ApiError> {
    let blocks = state.taxonomy_service().load_blocks().await?;
    Ok(Json(BlocksResponse { blocks }))
}
