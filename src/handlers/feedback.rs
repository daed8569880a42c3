use axum::{extract::State, http::StatusCode};

use super::non_blank;
use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ApiResult, ErrorEnvelope},
    extract::ApiJson,
    models::{CreateFeedbackRequest, CreateTicketPreventionRequest, NewFeedback, NewTicketPrevention},
    response::ApiResponse,
};

/// submit_feedback
///
/// [Public Route] Records a helpful / not-helpful vote. A valid token attributes the vote
/// to its user; without one the vote is anonymous.
#[utoipa::path(
    post,
    path = "/api/feedback/helpful",
    request_body = CreateFeedbackRequest,
    responses(
        (status = 201, description = "Recorded"),
        (status = 400, description = "Missing fields", body = ErrorEnvelope),
        (status = 404, description = "Unknown article", body = ErrorEnvelope)
    ),
    tag = "feedback"
)]
pub async fn submit_feedback(
    user: Option<AuthUser>,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateFeedbackRequest>,
) -> ApiResult<()> {
    let (Some(article_id), Some(is_helpful)) = (payload.article_id, payload.is_helpful) else {
        return Err(ApiError::validation("article_id and is_helpful are required"));
    };

    state
        .repo
        .find_article(article_id)
        .await
        .map_err(ApiError::database("Failed to submit feedback"))?
        .ok_or_else(|| ApiError::not_found("Article not found"))?;

    state
        .repo
        .record_feedback(NewFeedback {
            article_id,
            user_id: user.map(|u| u.id),
            is_helpful,
            comment: non_blank(payload.comment),
        })
        .await
        .map_err(ApiError::database("Failed to submit feedback"))?;

    Ok(ApiResponse::message("Feedback submitted successfully").with_status(StatusCode::CREATED))
}

/// mark_ticket_prevented
///
/// [Public Route] The reader says the article saved them a support ticket.
#[utoipa::path(
    post,
    path = "/api/feedback/ticket-prevented",
    request_body = CreateTicketPreventionRequest,
    responses(
        (status = 201, description = "Recorded"),
        (status = 400, description = "Missing article_id", body = ErrorEnvelope),
        (status = 404, description = "Unknown article", body = ErrorEnvelope)
    ),
    tag = "feedback"
)]
pub async fn mark_ticket_prevented(
    user: Option<AuthUser>,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateTicketPreventionRequest>,
) -> ApiResult<()> {
    let Some(article_id) = payload.article_id else {
        return Err(ApiError::validation("article_id is required"));
    };

    state
        .repo
        .find_article(article_id)
        .await
        .map_err(ApiError::database("Failed to record ticket prevention"))?
        .ok_or_else(|| ApiError::not_found("Article not found"))?;

    state
        .repo
        .record_ticket_prevention(NewTicketPrevention {
            article_id,
            user_id: user.map(|u| u.id),
            issue_type: non_blank(payload.issue_type),
        })
        .await
        .map_err(ApiError::database("Failed to record ticket prevention"))?;

    Ok(ApiResponse::message("Marked as ticket prevention successfully")
        .with_status(StatusCode::CREATED))
}
