use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use validator::Validate;

use super::error::ApiError;
use crate::extractors::AppJson;
use crate::models::session::{CreateSessionRequest, SelectOptionRequest, SessionView};
use crate::services::session_service::NextResult;
use crate::services::AppState;

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionView>), ApiError> {
    payload.validate()?;
    let view = state.session_service().create_session(payload).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    let view = state.session_service().get_session(&session_id).await?;
    Ok(Json(view))
}

pub async fn select_option(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    AppJson(payload): AppJson<SelectOptionRequest>,
) -> Result<Json<SessionView>, ApiError> {
    payload.validate()?;
    let view = state
        .session_service()
        .select_option(&session_id, &payload.option)
        .await?;
    Ok(Json(view))
}

pub async fn next_question(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<NextResult>, ApiError> {
    let result = state.session_service().next(&session_id).await?;
    Ok(Json(result))
}

pub async fn previous_question(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    let view = state.session_service().previous(&session_id).await?;
    Ok(Json(view))
}

pub async fn discard_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.session_service().discard(&session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
