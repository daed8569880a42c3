use axum::extract::{Path, State};
use serde::Deserialize;
use utoipa::IntoParams;

use super::{
    ADMIN_ROLES, PERMISSION_DENIED, STAFF_ROLES, is_staff, non_blank, page_window,
    parse_article_id,
};
use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ApiResult, ErrorEnvelope},
    extract::{ApiJson, ApiQuery},
    models::{
        ArticleChanges, ArticleDetail, ArticleFilter, ArticleListItem, ArticleStatus,
        CreateArticleRequest, NewArticle, Pagination, UpdateArticleRequest,
    },
    response::ApiResponse,
    text::{estimated_read_time, slugify},
};

/// ArticleListQuery
///
/// Query parameters of `GET /api/articles`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ArticleListQuery {
    /// `draft`, `published` (default) or `archived`. Anything but `published` is staff only.
    pub status: Option<String>,
    /// Category slug. An unknown slug leaves the listing unfiltered.
    pub category: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn parse_status(raw: Option<&str>) -> Result<ArticleStatus, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(ArticleStatus::Published),
        Some(text) => text
            .parse()
            .map_err(|_| ApiError::validation("Invalid article status")),
    }
}

/// list_articles
///
/// [Public Route] Paginated listing, newest first.
///
/// Anonymous callers and plain users only ever see `published` articles; asking for
/// another status without a staff token is a 403.
#[utoipa::path(
    get,
    path = "/api/articles",
    params(ArticleListQuery),
    responses(
        (status = 200, description = "Articles with pagination", body = [ArticleListItem]),
        (status = 400, description = "Invalid status", body = ErrorEnvelope),
        (status = 403, description = "Unpublished listing requires staff", body = ErrorEnvelope)
    ),
    tag = "articles"
)]
pub async fn list_articles(
    user: Option<AuthUser>,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ArticleListQuery>,
) -> ApiResult<Vec<ArticleListItem>> {
    let status = parse_status(query.status.as_deref())?;
    if status != ArticleStatus::Published && !is_staff(user.as_ref()) {
        return Err(ApiError::forbidden(PERMISSION_DENIED));
    }

    let category_id = match query.category.as_deref().map(str::trim) {
        Some(slug) if !slug.is_empty() => state
            .repo
            .find_category_by_slug(slug)
            .await
            .map_err(ApiError::database("Failed to fetch articles"))?
            .map(|category| category.id),
        _ => None,
    };

    let (limit, offset) = page_window(query.limit, query.offset);
    let (articles, total) = state
        .repo
        .list_articles(ArticleFilter {
            status: Some(status),
            category_id,
            limit,
            offset,
        })
        .await
        .map_err(ApiError::database("Failed to fetch articles"))?;

    Ok(ApiResponse::ok(articles).with_pagination(Pagination::new(total, limit, offset)))
}

/// get_article
///
/// [Public Route] One article by slug, with tags. Every successful read counts as a view.
///
/// Unpublished articles answer 404 unless the caller is staff, so drafts do not leak
/// through guessed slugs.
#[utoipa::path(
    get,
    path = "/api/articles/{slug}",
    params(("slug" = String, Path, description = "Article slug")),
    responses(
        (status = 200, description = "Article", body = ArticleDetail),
        (status = 404, description = "Not found", body = ErrorEnvelope)
    ),
    tag = "articles"
)]
pub async fn get_article(
    user: Option<AuthUser>,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<ArticleDetail> {
    let mut detail = state
        .repo
        .find_article_by_slug(&slug)
        .await
        .map_err(ApiError::database("Failed to fetch article"))?
        .filter(|d| d.item.article.status == ArticleStatus::Published || is_staff(user.as_ref()))
        .ok_or_else(|| ApiError::not_found("Article not found"))?;

    match state.repo.increment_view_count(detail.item.article.id).await {
        Ok(Some(views)) => detail.item.article.view_count = views,
        Ok(None) => {}
        // View counting is best effort.
        Err(e) => tracing::warn!(error = ?e, slug = %slug, "failed to count article view"),
    }

    Ok(ApiResponse::ok(detail))
}

/// record_view
///
/// [Public Route] Explicit view ping used by the SPA.
#[utoipa::path(
    post,
    path = "/api/articles/{id}/view",
    params(("id" = String, Path, description = "Article ID (UUID)")),
    responses(
        (status = 200, description = "View counted"),
        (status = 404, description = "Not found", body = ErrorEnvelope)
    ),
    tag = "articles"
)]
pub async fn record_view(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_article_id(&id)?;

    state
        .repo
        .increment_view_count(id)
        .await
        .map_err(ApiError::database("Failed to update view count"))?
        .ok_or_else(|| ApiError::not_found("Article not found"))?;

    Ok(ApiResponse::message("View count updated"))
}

/// create_article
///
/// [Staff Route] Authors a new article. The slug comes from the title and must be unique;
/// the caller becomes the author.
#[utoipa::path(
    post,
    path = "/api/articles",
    request_body = CreateArticleRequest,
    responses(
        (status = 201, description = "Created", body = ArticleListItem),
        (status = 400, description = "Invalid input or duplicate title", body = ErrorEnvelope),
        (status = 403, description = "Not staff", body = ErrorEnvelope)
    ),
    tag = "articles"
)]
pub async fn create_article(
    user: AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateArticleRequest>,
) -> ApiResult<ArticleListItem> {
    user.require_role(STAFF_ROLES, PERMISSION_DENIED)?;

    let title = payload.title.trim();
    if title.is_empty() || payload.content.trim().is_empty() {
        return Err(ApiError::validation("Title and content are required"));
    }

    let slug = slugify(title);
    if slug.is_empty() {
        return Err(ApiError::validation(
            "Title must contain at least one letter or digit",
        ));
    }
    let taken = state
        .repo
        .slug_exists(&slug, None)
        .await
        .map_err(ApiError::database("Failed to create article"))?;
    if taken {
        return Err(ApiError::validation(
            "An article with this title already exists",
        ));
    }

    let article = state
        .repo
        .create_article(NewArticle {
            title: title.to_string(),
            slug,
            estimated_read_time: estimated_read_time(&payload.content),
            content: payload.content,
            quick_answer: non_blank(payload.quick_answer),
            category_id: payload.category_id,
            author_id: Some(user.id),
            status: payload.status.unwrap_or_default(),
            tag_ids: payload.tags,
        })
        .await
        .map_err(ApiError::unique_or_database(
            "An article with this title already exists",
            "Failed to create article",
        ))?;

    tracing::info!(article_id = %article.article.id, author_id = %user.id, "article created");
    Ok(ApiResponse::created(article).with_message("Article created successfully"))
}

/// update_article
///
/// [Staff Route] Partial update. Only fields present in the body change:
/// a new title regenerates the slug, new content recomputes the read time, an empty
/// `quick_answer` or a `null` `category_id` clears that column, and `tags` replaces the
/// whole tag set.
#[utoipa::path(
    put,
    path = "/api/articles/{id}",
    params(("id" = String, Path, description = "Article ID (UUID)")),
    request_body = UpdateArticleRequest,
    responses(
        (status = 200, description = "Updated", body = ArticleListItem),
        (status = 400, description = "Duplicate title", body = ErrorEnvelope),
        (status = 403, description = "Not staff", body = ErrorEnvelope),
        (status = 404, description = "Not found", body = ErrorEnvelope)
    ),
    tag = "articles"
)]
pub async fn update_article(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateArticleRequest>,
) -> ApiResult<ArticleListItem> {
    user.require_role(STAFF_ROLES, PERMISSION_DENIED)?;
    let id = parse_article_id(&id)?;

    state
        .repo
        .find_article(id)
        .await
        .map_err(ApiError::database("Failed to update article"))?
        .ok_or_else(|| ApiError::not_found("Article not found"))?;

    let mut changes = ArticleChanges::default();

    if let Some(title) = non_blank(payload.title) {
        let slug = slugify(&title);
        if slug.is_empty() {
            return Err(ApiError::validation(
                "Title must contain at least one letter or digit",
            ));
        }
        let taken = state
            .repo
            .slug_exists(&slug, Some(id))
            .await
            .map_err(ApiError::database("Failed to update article"))?;
        if taken {
            return Err(ApiError::validation(
                "An article with this title already exists",
            ));
        }
        changes.title = Some(title);
        changes.slug = Some(slug);
    }

    if let Some(content) = payload.content.filter(|c| !c.trim().is_empty()) {
        changes.estimated_read_time = Some(estimated_read_time(&content));
        changes.content = Some(content);
    }

    if let Some(quick_answer) = payload.quick_answer {
        changes.quick_answer = Some(non_blank(Some(quick_answer)));
    }
    changes.category_id = payload.category_id;
    changes.status = payload.status;
    changes.tag_ids = payload.tags;

    let updated = state
        .repo
        .update_article(id, changes)
        .await
        .map_err(ApiError::unique_or_database(
            "An article with this title already exists",
            "Failed to update article",
        ))?
        .ok_or_else(|| ApiError::not_found("Article not found"))?;

    tracing::info!(article_id = %id, editor_id = %user.id, "article updated");
    Ok(ApiResponse::ok(updated).with_message("Article updated successfully"))
}

/// delete_article
///
/// [Admin Route] Removes an article. Tags, feedback and ticket preventions cascade;
/// search logs keep their row with the top result cleared.
#[utoipa::path(
    delete,
    path = "/api/articles/{id}",
    params(("id" = String, Path, description = "Article ID (UUID)")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 403, description = "Not an admin", body = ErrorEnvelope),
        (status = 404, description = "Not found", body = ErrorEnvelope)
    ),
    tag = "articles"
)]
pub async fn delete_article(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    user.require_role(ADMIN_ROLES, PERMISSION_DENIED)?;
    let id = parse_article_id(&id)?;

    let deleted = state
        .repo
        .delete_article(id)
        .await
        .map_err(ApiError::database("Failed to delete article"))?;
    if !deleted {
        return Err(ApiError::not_found("Article not found"));
    }

    tracing::info!(article_id = %id, admin_id = %user.id, "article deleted");
    Ok(ApiResponse::message("Article deleted successfully"))
}
