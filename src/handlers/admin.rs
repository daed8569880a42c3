use axum::extract::State;

use super::{ADMIN_ROLES, PERMISSION_DENIED};
use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ApiResult, ErrorEnvelope},
    models::AnalyticsSummary,
    response::ApiResponse,
};

const TOP_ARTICLES: i64 = 5;
const TOP_SEARCH_TERMS: i64 = 10;

/// get_analytics
///
/// [Admin Route] Dashboard counters: totals, the five most viewed published articles
/// with their helpful percentage, and the ten most frequent search terms.
///
/// *Authorization*: the auth layer guarantees a user; the admin check happens here.
#[utoipa::path(
    get,
    path = "/api/admin/analytics",
    responses(
        (status = 200, description = "Analytics", body = AnalyticsSummary),
        (status = 401, description = "Not authenticated", body = ErrorEnvelope),
        (status = 403, description = "Not an admin", body = ErrorEnvelope)
    ),
    tag = "admin"
)]
pub async fn get_analytics(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<AnalyticsSummary> {
    user.require_role(ADMIN_ROLES, PERMISSION_DENIED)?;

    let summary = state
        .repo
        .analytics_summary(TOP_ARTICLES, TOP_SEARCH_TERMS)
        .await
        .map_err(ApiError::database("Failed to fetch analytics"))?;

    Ok(ApiResponse::ok(summary))
}
