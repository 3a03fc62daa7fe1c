//! Feedback submissions and their three-state status workflow.

use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path, Query};
use crate::models::{
    CreateFeedbackBody, FeedbackRequest, FeedbackStats, FeedbackStatus, UpdateFeedbackStatusBody,
};

use super::licenses::SuccessResponse;

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or("").is_empty()
}

#[derive(Debug, Serialize)]
pub struct CreateFeedbackResponse {
    pub success: bool,
    pub feedback: FeedbackRequest,
}

pub async fn create_feedback(
    State(state): State<AppState>,
    Json(body): Json<CreateFeedbackBody>,
) -> Result<(StatusCode, Json<CreateFeedbackResponse>)> {
    if body.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name is required".into()));
    }
    if body.message.trim().is_empty() {
        return Err(AppError::BadRequest("Message is required".into()));
    }
    // At least one reachable contact channel; tel alone is not enough
    if is_blank(&body.email) && is_blank(&body.tg) {
        return Err(AppError::BadRequest(
            "Either email or Telegram contact is required".into(),
        ));
    }

    let conn = state.db.get()?;
    let feedback = queries::create_feedback(&conn, &body)?;

    tracing::info!(id = %feedback.id, "feedback received");

    Ok((
        StatusCode::CREATED,
        Json(CreateFeedbackResponse {
            success: true,
            feedback,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ListFeedbackQuery {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub status: Option<FeedbackStatus>,
}

pub async fn list_feedback(
    State(state): State<AppState>,
    Query(query): Query<ListFeedbackQuery>,
) -> Result<Json<Vec<FeedbackRequest>>> {
    let limit = query.limit.unwrap_or(100).clamp(1, 1000);
    let offset = query.offset.unwrap_or(0).max(0);

    let conn = state.db.get()?;
    Ok(Json(queries::list_feedback(
        &conn,
        limit,
        offset,
        query.status,
    )?))
}

pub async fn feedback_stats(State(state): State<AppState>) -> Result<Json<FeedbackStats>> {
    let conn = state.db.get()?;
    Ok(Json(queries::feedback_stats(&conn)?))
}

#[derive(Debug, Deserialize)]
pub struct IdPath {
    pub id: String,
}

pub async fn get_feedback(
    State(state): State<AppState>,
    Path(path): Path<IdPath>,
) -> Result<Json<FeedbackRequest>> {
    let conn = state.db.get()?;
    let feedback = queries::get_feedback_by_id(&conn, &path.id)?
        .ok_or_else(|| AppError::NotFound("Feedback request not found".into()))?;
    Ok(Json(feedback))
}

/// Any of the three statuses is reachable from any other.
pub async fn update_feedback_status(
    State(state): State<AppState>,
    Path(path): Path<IdPath>,
    Json(body): Json<UpdateFeedbackStatusBody>,
) -> Result<Json<SuccessResponse>> {
    let conn = state.db.get()?;

    let updated = queries::update_feedback_status(&conn, &path.id, body.status)?;
    if !updated {
        return Err(AppError::NotFound("Feedback request not found".into()));
    }

    Ok(SuccessResponse::ok())
}
