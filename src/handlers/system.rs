use axum::Json;
use chrono::Utc;

use crate::{
    error::ApiError,
    models::{ApiInfo, HealthStatus},
};

/// health
///
/// Liveness probe for load balancers. Touches nothing but the process.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthStatus)),
    tag = "system"
)]
pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        message: "ITKit Backend API is running".to_string(),
        timestamp: Utc::now(),
    })
}

#[utoipa::path(
    get,
    path = "/api",
    responses((status = 200, description = "API banner", body = ApiInfo)),
    tag = "system"
)]
pub async fn api_info() -> Json<ApiInfo> {
    Json(ApiInfo {
        message: "Welcome to ITKit API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Fallback for every unmatched path.
pub async fn route_not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
