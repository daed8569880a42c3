use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Nested under `/api/admin` and wrapped in the same token layer as the authenticated
/// router. Each handler then requires `role = admin`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /api/admin/analytics
        // Totals, most viewed articles and most frequent search terms.
        .route("/analytics", get(handlers::admin::get_analytics))
}
