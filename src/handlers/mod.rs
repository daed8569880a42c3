//! HTTP controllers, one module per resource.
//!
//! Every handler returns `ApiResult<T>`, so both outcomes render through the uniform
//! envelope. Role checks live inside the handlers; the routers only decide whether a
//! token is mandatory.

pub mod admin;
pub mod articles;
pub mod auth;
pub mod categories;
pub mod feedback;
pub mod search;
pub mod system;

use uuid::Uuid;

use crate::{auth::AuthUser, error::ApiError, models::Role};

/// Roles allowed to author articles and read unpublished ones.
pub const STAFF_ROLES: &[Role] = &[Role::ItStaff, Role::Admin];
pub const ADMIN_ROLES: &[Role] = &[Role::Admin];

pub const PERMISSION_DENIED: &str = "You do not have permission to access this resource";

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Clamps the `limit`/`offset` query pair into a window Postgres accepts.
pub fn page_window(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}

/// True when the optional caller is it_staff or admin.
pub fn is_staff(user: Option<&AuthUser>) -> bool {
    user.is_some_and(|u| u.role.is_staff())
}

/// A path segment that is not a UUID cannot name an article.
pub fn parse_article_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found("Article not found"))
}

/// Trims optional free text, treating blank input as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
