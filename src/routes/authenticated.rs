use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Routes that need a verified user. The `auth_middleware` route layer applied in
/// `create_router` rejects requests without a valid token before any handler runs and
/// stores the resolved `AuthUser` in the request extensions.
///
/// Authoring routes additionally check the role inside the handler
/// (`it_staff`/`admin` to write, `admin` to delete).
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET/PUT /api/auth/profile
        .route(
            "/api/auth/profile",
            get(handlers::auth::get_profile).put(handlers::auth::update_profile),
        )
        // POST /api/articles
        // Staff authoring. Merged with the public GET on the same path.
        .route("/api/articles", post(handlers::articles::create_article))
        // PUT/DELETE /api/articles/{id}
        .route(
            "/api/articles/{id}",
            put(handlers::articles::update_article).delete(handlers::articles::delete_article),
        )
}
