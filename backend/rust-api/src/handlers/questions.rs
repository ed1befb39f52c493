use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;
use validator::Validate;

use super::error::ApiError;
use crate::models::question::{QuestionFilters, QuestionsResponse};
use crate::services::AppState;

pub async fn list_questions(
    State(state): State<Arc<AppState>>,
    Query(filters): Query<QuestionFilters>,
) -> Result<Json<QuestionsResponse>, ApiError> {
    filters.validate()?;
    let questions = state
        .question_service()
        .fetch(&filters.normalized())
        .await?;
    Ok(Json(QuestionsResponse { questions }))
}
