use axum::extract::{Path, State};
use serde::Deserialize;
use utoipa::IntoParams;

use super::page_window;
use crate::{
    AppState,
    error::{ApiError, ApiResult, ErrorEnvelope},
    extract::ApiQuery,
    models::{ArticleFilter, ArticleStatus, Category, CategoryArticles, Pagination},
    response::ApiResponse,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// list_categories
///
/// [Public Route] All categories, alphabetical.
#[utoipa::path(
    get,
    path = "/api/categories",
    responses((status = 200, description = "Categories", body = [Category])),
    tag = "categories"
)]
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    let categories = state
        .repo
        .list_categories()
        .await
        .map_err(ApiError::database("Failed to fetch categories"))?;

    Ok(ApiResponse::ok(categories))
}

/// category_articles
///
/// [Public Route] Published articles of one category. The pagination travels inside
/// `data` here, next to the category itself.
#[utoipa::path(
    get,
    path = "/api/categories/{slug}/articles",
    params(("slug" = String, Path, description = "Category slug"), PageQuery),
    responses(
        (status = 200, description = "Category with its articles", body = CategoryArticles),
        (status = 404, description = "Unknown category", body = ErrorEnvelope)
    ),
    tag = "categories"
)]
pub async fn category_articles(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<CategoryArticles> {
    let category = state
        .repo
        .find_category_by_slug(&slug)
        .await
        .map_err(ApiError::database("Failed to fetch category"))?
        .ok_or_else(|| ApiError::not_found("Category not found"))?;

    let (limit, offset) = page_window(page.limit, page.offset);
    let (articles, total) = state
        .repo
        .list_articles(ArticleFilter {
            status: Some(ArticleStatus::Published),
            category_id: Some(category.id),
            limit,
            offset,
        })
        .await
        .map_err(ApiError::database("Failed to fetch articles"))?;

    Ok(ApiResponse::ok(CategoryArticles {
        category,
        articles,
        pagination: Pagination::new(total, limit, offset),
    }))
}
