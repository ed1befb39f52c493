use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;
use validator::Validate;

use super::error::ApiError;
use crate::extractors::AppJson;
use crate::models::review::{
    ExerciseScore, GenerateExercisesRequest, GenerateExercisesResponse, ReviewCandidatesQuery,
    ReviewCandidatesResponse, ScoreExercisesRequest,
};
use crate::services::review_service::score_exercises;
use crate::services::AppState;

pub async fn list_candidates(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReviewCandidatesQuery>,
) -> Result<Json<ReviewCandidatesResponse>, ApiError> {
    query.validate()?;
    let candidates = state
        .review_service()
        .compute_candidates(query.user_id.as_deref(), query.window_days)
        .await?;
    Ok(Json(ReviewCandidatesResponse { candidates }))
}

pub async fn generate_exercises(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<GenerateExercisesRequest>,
) -> Result<Json<GenerateExercisesResponse>, ApiError> {
    payload.validate()?;
    let exercises = state.review_service().generate_exercises(&payload).await;
    Ok(Json(GenerateExercisesResponse { exercises }))
}

pub async fn score_round(
    AppJson(payload): AppJson<ScoreExercisesRequest>,
) -> Json<ExerciseScore> {
    Json(score_exercises(&payload.exercises, &payload.answers))
}
