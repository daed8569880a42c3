use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// ApiError
///
/// The error taxonomy of the HTTP surface. Every variant carries the human-readable
/// message that ends up in the `error` field of the failure envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Malformed or rejected input (400).
    #[error("{0}")]
    Validation(String),
    /// Missing, invalid or expired credentials (401).
    #[error("{0}")]
    Unauthorized(String),
    /// Authenticated, but the role does not allow the action (403).
    #[error("{0}")]
    Forbidden(String),
    /// The addressed resource does not exist (404).
    #[error("{0}")]
    NotFound(String),
    /// Downstream or unexpected failure (500). The message never contains internals.
    #[error("{0}")]
    Internal(String),
}

/// ErrorEnvelope
///
/// Wire shape of every failure: `{ "success": false, "error": "..." }`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: String,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// database
    ///
    /// Builds a `map_err` adapter for repository calls: logs the underlying `sqlx::Error`
    /// and hides it behind a generic 500 carrying `message`.
    ///
    /// ```ignore
    /// let categories = state.repo.list_categories().await
    ///     .map_err(ApiError::database("Failed to fetch categories"))?;
    /// ```
    pub fn database(message: &'static str) -> impl FnOnce(sqlx::Error) -> ApiError {
        move |err| {
            tracing::error!(error = ?err, "{}", message);
            ApiError::Internal(message.to_string())
        }
    }

    /// Like `database`, but a unique-constraint violation becomes a 400 carrying
    /// `conflict`. Covers the window between a duplicate pre-check and the insert.
    pub fn unique_or_database(
        conflict: &'static str,
        message: &'static str,
    ) -> impl FnOnce(sqlx::Error) -> ApiError {
        move |err| {
            if matches!(&err, sqlx::Error::Database(db) if db.is_unique_violation()) {
                tracing::debug!(error = ?err, "unique constraint rejected write");
                ApiError::validation(conflict)
            } else {
                ApiError::database(message)(err)
            }
        }
    }

    /// The HTTP status this error is sent with.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorEnvelope {
            success: false,
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("rejected JSON body: {}", rejection.body_text());
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        tracing::debug!("rejected query string: {}", rejection.body_text());
        ApiError::Validation(rejection.body_text())
    }
}

/// Result alias used by every handler.
pub type ApiResult<T> = Result<crate::response::ApiResponse<T>, ApiError>;
