use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a token: discovery, reading, search and feedback.
///
/// Visibility rules:
/// Reads of unpublished articles are gated inside the handlers, which accept an
/// optional `AuthUser`. Anonymous callers only ever see `published` content.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for monitoring and load balancers.
        .route("/health", get(handlers::system::health))
        // GET /api
        // API banner with the running version.
        .route("/api", get(handlers::system::api_info))
        // --- Identity ---
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        // --- Articles ---
        // GET /api/articles?status=&category=&limit=&offset=
        // Non-published statuses require a staff token.
        .route("/api/articles", get(handlers::articles::list_articles))
        // GET /api/articles/{slug}
        // The segment is a slug here; it shares the `{id}` name with the staff routes
        // registered on the same path.
        .route("/api/articles/{id}", get(handlers::articles::get_article))
        .route("/api/articles/{id}/view", post(handlers::articles::record_view))
        // --- Categories ---
        .route("/api/categories", get(handlers::categories::list_categories))
        .route(
            "/api/categories/{slug}/articles",
            get(handlers::categories::category_articles),
        )
        // --- Search & Feedback ---
        // Anonymous use is allowed; a valid token attributes the record to its user.
        .route("/api/search", get(handlers::search::search_articles))
        .route("/api/feedback/helpful", post(handlers::feedback::submit_feedback))
        .route(
            "/api/feedback/ticket-prevented",
            post(handlers::feedback::mark_ticket_prevented),
        )
}
