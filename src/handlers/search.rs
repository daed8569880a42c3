use axum::extract::State;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ApiResult, ErrorEnvelope},
    extract::ApiQuery,
    models::{NewSearchLog, SearchResponse, SourceArticle},
    response::ApiResponse,
    search::{MAX_RESULTS, normalize_query, quick_answer_for},
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Free-text query, at least two characters after trimming.
    pub q: Option<String>,
}

/// search_articles
///
/// [Public Route] Substring search over published articles, most viewed first.
///
/// The top hit supplies the quick answer: its curated answer when it has one, otherwise
/// one extracted from its content. Each accepted query leaves a search log row; rejected
/// queries never reach the repository.
#[utoipa::path(
    get,
    path = "/api/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Search results", body = SearchResponse),
        (status = 400, description = "Missing or too short query", body = ErrorEnvelope),
        (status = 500, description = "Search failed", body = ErrorEnvelope)
    ),
    tag = "search"
)]
pub async fn search_articles(
    user: Option<AuthUser>,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> ApiResult<SearchResponse> {
    let term = normalize_query(query.q.as_deref())?;

    let articles = state
        .repo
        .search_articles(&term, MAX_RESULTS)
        .await
        .map_err(ApiError::database("Failed to search articles"))?;

    let top = articles.first();
    let quick_answer =
        top.and_then(|t| quick_answer_for(t.article.quick_answer.as_deref(), &t.article.content));
    let source_article = top.map(|t| SourceArticle {
        title: t.article.title.clone(),
        slug: t.article.slug.clone(),
    });

    let entry = NewSearchLog {
        search_term: term.clone(),
        results_count: articles.len() as i32,
        user_id: user.map(|u| u.id),
        top_result_id: top.map(|t| t.article.id),
    };
    if let Err(e) = state.repo.log_search(entry).await {
        tracing::warn!(error = ?e, term = %term, "failed to record search log");
    }

    tracing::debug!(term = %term, results = articles.len(), "search served");

    Ok(ApiResponse::ok(SearchResponse {
        quick_answer,
        source_article,
        total_results: articles.len(),
        articles,
        search_term: term,
    }))
}
