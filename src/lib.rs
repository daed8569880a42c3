use axum::{
    Router,
    extract::FromRef,
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod response;

// Pure helpers with no I/O.
pub mod search;
pub mod text;
pub mod validation;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry point (main.rs).
pub use config::AppConfig;
pub use error::ApiError;
pub use repository::{PostgresRepository, Repository, RepositoryState};

/// ApiDoc
///
/// Auto-generated OpenAPI document, served at `/api-docs/openapi.json` with a Swagger UI
/// at `/swagger-ui`. Aggregates every `#[utoipa::path]` handler and `ToSchema` model.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::system::health, handlers::system::api_info,
        handlers::auth::register, handlers::auth::login,
        handlers::auth::get_profile, handlers::auth::update_profile,
        handlers::articles::list_articles, handlers::articles::get_article,
        handlers::articles::record_view, handlers::articles::create_article,
        handlers::articles::update_article, handlers::articles::delete_article,
        handlers::categories::list_categories, handlers::categories::category_articles,
        handlers::feedback::submit_feedback, handlers::feedback::mark_ticket_prevented,
        handlers::search::search_articles,
        handlers::admin::get_analytics,
    ),
    components(
        schemas(
            models::Role, models::ArticleStatus, models::UserPublic, models::Category,
            models::CategorySummary, models::AuthorSummary, models::Tag, models::Article,
            models::ArticleListItem, models::ArticleDetail, models::ArticleFeedback,
            models::TicketPrevention, models::RegisterRequest, models::LoginRequest,
            models::UpdateProfileRequest, models::CreateArticleRequest,
            models::UpdateArticleRequest, models::CreateFeedbackRequest,
            models::CreateTicketPreventionRequest, models::AuthResponse, models::Pagination,
            models::CategoryArticles, models::SourceArticle, models::SearchResponse,
            models::TopArticle, models::TopSearchTerm, models::AnalyticsSummary,
            models::HealthStatus, models::ApiInfo, error::ErrorEnvelope,
        )
    ),
    tags(
        (name = "itkit", description = "ITKit knowledge base API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single, immutable container shared by every request: the data-access handle and
/// the loaded configuration. Cloning is cheap (an `Arc` and a few strings).
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: Postgres in production, in-memory in tests.
    pub repo: RepositoryState,
    /// Configuration: The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Lets extractors such as `AuthUser` pull single components out of the shared state.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// cors_layer
///
/// Only the SPA origin from `FRONTEND_URL` is allowed, with credentials. An origin that is
/// not a valid header value leaves CORS closed rather than open.
pub fn cors_layer(config: &AppConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    match HeaderValue::from_str(&config.frontend_url) {
        Ok(origin) => base.allow_origin(origin).allow_credentials(true),
        Err(e) => {
            tracing::warn!(
                "FRONTEND_URL {:?} is not a valid origin, cross-origin requests disabled: {}",
                config.frontend_url,
                e
            );
            base
        }
    }
}

/// create_router
///
/// Assembles the application's entire routing structure, applies global and scoped middleware,
/// and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = cors_layer(&state.config);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: No middleware applied.
        .merge(public::public_routes())
        // Authenticated Routes: Protected by the `auth_middleware`.
        // Paths shared with the public router (e.g. /api/articles) merge per method, so only
        // the write methods carry the layer.
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::auth_middleware,
            )),
        )
        // Admin Routes: same authentication layer; the 'admin' role check is performed
        // inside the handlers.
        .nest(
            "/api/admin",
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::auth_middleware,
            )),
        )
        // Anything else: uniform 404 envelope.
        .fallback(handlers::system::route_not_found)
        // Apply the Unified State to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: one span per request, tagged with the request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: echo x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer (outermost, so preflights never reach the router)
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: method, URI and the `x-request-id` set by the layer
/// above, so every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
