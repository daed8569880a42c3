//! Data access layer. Queries are built at runtime (`query_as` and `QueryBuilder`) so the
//! crate compiles without a live database or committed `.sqlx` offline metadata.

use crate::models::{
    AnalyticsSummary, Article, ArticleChanges, ArticleDetail, ArticleFeedback, ArticleFilter,
    ArticleListItem, AuthorSummary, Category, CategorySummary, NewArticle, NewFeedback,
    NewSearchLog, NewTicketPrevention, NewUser, Tag, TicketPrevention, TopArticle, TopSearchTerm,
    User, UserPublic,
};
use crate::search::like_pattern;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Transaction, query_builder::QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

/// Every data-access call either succeeds or reports the driver error; handlers decide
/// what the caller sees.
pub type RepoResult<T> = Result<T, sqlx::Error>;

/// Repository Trait
///
/// The abstract contract for all persistence operations. Handlers talk to this trait only,
/// which lets tests swap Postgres for an in-memory implementation.
///
/// **Send + Sync + async_trait** make `Arc<dyn Repository>` shareable across Axum's tasks.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn find_user_by_id(&self, id: Uuid) -> RepoResult<Option<UserPublic>>;
    // Includes the password hash; `email` must already be lowercase.
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    async fn create_user(&self, user: NewUser) -> RepoResult<UserPublic>;
    async fn update_user_name(&self, id: Uuid, full_name: &str) -> RepoResult<Option<UserPublic>>;

    // --- Categories ---
    // Ordered by name.
    async fn list_categories(&self) -> RepoResult<Vec<Category>>;
    async fn find_category_by_slug(&self, slug: &str) -> RepoResult<Option<Category>>;

    // --- Articles ---
    // Newest first. Returns the requested page and the exact number of matching rows.
    async fn list_articles(&self, filter: ArticleFilter) -> RepoResult<(Vec<ArticleListItem>, i64)>;
    async fn find_article_by_slug(&self, slug: &str) -> RepoResult<Option<ArticleDetail>>;
    async fn find_article(&self, id: Uuid) -> RepoResult<Option<Article>>;
    // True if another article (other than `exclude`) already uses `slug`.
    async fn slug_exists(&self, slug: &str, exclude: Option<Uuid>) -> RepoResult<bool>;
    // Row and tags are written together or not at all.
    async fn create_article(&self, article: NewArticle) -> RepoResult<ArticleListItem>;
    // `None` when no article has this id. Row changes and tag replacement share a transaction.
    async fn update_article(&self, id: Uuid, changes: ArticleChanges) -> RepoResult<Option<ArticleListItem>>;
    // Returns false when nothing was deleted.
    async fn delete_article(&self, id: Uuid) -> RepoResult<bool>;
    // Atomic `+1`; returns the new count, or `None` when the article does not exist.
    async fn increment_view_count(&self, id: Uuid) -> RepoResult<Option<i32>>;

    // --- Feedback ---
    // Inserts the feedback row and bumps the matching helpful/not-helpful counter.
    async fn record_feedback(&self, feedback: NewFeedback) -> RepoResult<ArticleFeedback>;
    async fn record_ticket_prevention(&self, record: NewTicketPrevention) -> RepoResult<TicketPrevention>;

    // --- Search ---
    // Published articles whose title, content or quick answer contains `term`
    // (case-insensitive), most viewed first.
    async fn search_articles(&self, term: &str, limit: i64) -> RepoResult<Vec<ArticleListItem>>;
    async fn log_search(&self, entry: NewSearchLog) -> RepoResult<()>;

    // --- Analytics ---
    async fn analytics_summary(&self, top_articles: i64, top_terms: i64) -> RepoResult<AnalyticsSummary>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// Column list shared by every query that yields an `ArticleListItem`.
const ARTICLE_SELECT: &str = r#"
    SELECT
        a.id, a.title, a.slug, a.content, a.quick_answer, a.category_id, a.author_id,
        a.status, a.view_count, a.helpful_count, a.not_helpful_count,
        a.estimated_read_time, a.created_at, a.updated_at,
        c.name AS category_name, c.slug AS category_slug, c.icon AS category_icon,
        u.full_name AS author_name
    FROM articles a
    LEFT JOIN categories c ON c.id = a.category_id
    LEFT JOIN users u ON u.id = a.author_id
"#;

const USER_PUBLIC_COLUMNS: &str = "id, email, full_name, role, created_at";

const ARTICLE_COLUMNS: &str = "id, title, slug, content, quick_answer, category_id, author_id, \
     status, view_count, helpful_count, not_helpful_count, estimated_read_time, created_at, updated_at";

/// ArticleRow
///
/// Flat result of `ARTICLE_SELECT`; reshaped into the nested `ArticleListItem`.
#[derive(Debug, FromRow)]
struct ArticleRow {
    #[sqlx(flatten)]
    article: Article,
    category_name: Option<String>,
    category_slug: Option<String>,
    category_icon: Option<String>,
    author_name: Option<String>,
}

impl From<ArticleRow> for ArticleListItem {
    fn from(row: ArticleRow) -> Self {
        let category = match (
            row.article.category_id,
            row.category_name,
            row.category_slug,
            row.category_icon,
        ) {
            (Some(id), Some(name), Some(slug), Some(icon)) => {
                Some(CategorySummary { id, name, slug, icon })
            }
            _ => None,
        };
        let author = match (row.article.author_id, row.author_name) {
            (Some(id), Some(full_name)) => Some(AuthorSummary { id, full_name }),
            _ => None,
        };
        ArticleListItem {
            article: row.article,
            category,
            author,
        }
    }
}

/// Appends the listing filter to a query that already ends in a `WHERE` clause.
fn push_article_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &ArticleFilter) {
    if let Some(status) = filter.status {
        builder.push(" AND a.status = ");
        builder.push_bind(status);
    }
    if let Some(category_id) = filter.category_id {
        builder.push(" AND a.category_id = ");
        builder.push_bind(category_id);
    }
}

/// Replaces the tag set of `article_id` inside `tx`. Unknown tag ids are ignored.
async fn replace_tags(
    tx: &mut Transaction<'_, Postgres>,
    article_id: Uuid,
    tag_ids: &[Uuid],
) -> RepoResult<()> {
    sqlx::query("DELETE FROM article_tags WHERE article_id = $1")
        .bind(article_id)
        .execute(&mut **tx)
        .await?;

    if !tag_ids.is_empty() {
        sqlx::query(
            r#"
            INSERT INTO article_tags (article_id, tag_id)
            SELECT $1, t.id FROM tags t WHERE t.id = ANY($2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(article_id)
        .bind(tag_ids.to_vec())
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// PostgresRepository
///
/// The production implementation of `Repository`, backed by a sqlx connection pool.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_list_item(&self, id: Uuid) -> RepoResult<Option<ArticleListItem>> {
        let query = format!("{ARTICLE_SELECT} WHERE a.id = $1");
        let row = sqlx::query_as::<_, ArticleRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(ArticleListItem::from))
    }

    async fn fetch_tags(&self, article_id: Uuid) -> RepoResult<Vec<Tag>> {
        sqlx::query_as::<_, Tag>(
            r#"
            SELECT t.id, t.name, t.slug, t.created_at
            FROM tags t
            JOIN article_tags at ON at.tag_id = t.id
            WHERE at.article_id = $1
            ORDER BY t.name ASC
            "#,
        )
        .bind(article_id)
        .fetch_all(&self.pool)
        .await
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_user_by_id(&self, id: Uuid) -> RepoResult<Option<UserPublic>> {
        let query = format!("SELECT {USER_PUBLIC_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserPublic>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, full_name, role, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<UserPublic> {
        let query = format!(
            "INSERT INTO users (email, password_hash, full_name, role) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_PUBLIC_COLUMNS}"
        );
        sqlx::query_as::<_, UserPublic>(&query)
            .bind(user.email)
            .bind(user.password_hash)
            .bind(user.full_name)
            .bind(user.role)
            .fetch_one(&self.pool)
            .await
    }

    async fn update_user_name(&self, id: Uuid, full_name: &str) -> RepoResult<Option<UserPublic>> {
        let query = format!(
            "UPDATE users SET full_name = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING {USER_PUBLIC_COLUMNS}"
        );
        sqlx::query_as::<_, UserPublic>(&query)
            .bind(id)
            .bind(full_name)
            .fetch_optional(&self.pool)
            .await
    }

    async fn list_categories(&self) -> RepoResult<Vec<Category>> {
        sqlx::query_as::<_, Category>(
            "SELECT id, name, slug, icon, description, created_at FROM categories ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn find_category_by_slug(&self, slug: &str) -> RepoResult<Option<Category>> {
        sqlx::query_as::<_, Category>(
            "SELECT id, name, slug, icon, description, created_at FROM categories WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
    }

    /// list_articles
    ///
    /// Built with `QueryBuilder` so every filter value is a bound parameter. The count
    /// query applies the same filter without the page window.
    async fn list_articles(&self, filter: ArticleFilter) -> RepoResult<(Vec<ArticleListItem>, i64)> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(ARTICLE_SELECT);
        builder.push(" WHERE TRUE");
        push_article_filter(&mut builder, &filter);
        builder.push(" ORDER BY a.created_at DESC LIMIT ");
        builder.push_bind(filter.limit);
        builder.push(" OFFSET ");
        builder.push_bind(filter.offset);

        let rows = builder
            .build_query_as::<ArticleRow>()
            .fetch_all(&self.pool)
            .await?;

        let mut counter: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM articles a WHERE TRUE");
        push_article_filter(&mut counter, &filter);
        let total: i64 = counter
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        Ok((rows.into_iter().map(ArticleListItem::from).collect(), total))
    }

    async fn find_article_by_slug(&self, slug: &str) -> RepoResult<Option<ArticleDetail>> {
        let query = format!("{ARTICLE_SELECT} WHERE a.slug = $1");
        let Some(row) = sqlx::query_as::<_, ArticleRow>(&query)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let item = ArticleListItem::from(row);
        let tags = self.fetch_tags(item.article.id).await?;
        Ok(Some(ArticleDetail { item, tags }))
    }

    async fn find_article(&self, id: Uuid) -> RepoResult<Option<Article>> {
        let query = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1");
        sqlx::query_as::<_, Article>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn slug_exists(&self, slug: &str, exclude: Option<Uuid>) -> RepoResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM articles WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(slug)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await
    }

    async fn create_article(&self, article: NewArticle) -> RepoResult<ArticleListItem> {
        let mut tx = self.pool.begin().await?;

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO articles
                (title, slug, content, quick_answer, category_id, author_id, status, estimated_read_time)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(article.title)
        .bind(article.slug)
        .bind(article.content)
        .bind(article.quick_answer)
        .bind(article.category_id)
        .bind(article.author_id)
        .bind(article.status)
        .bind(article.estimated_read_time)
        .fetch_one(&mut *tx)
        .await?;

        if !article.tag_ids.is_empty() {
            replace_tags(&mut tx, id, &article.tag_ids).await?;
        }
        tx.commit().await?;

        self.fetch_list_item(id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// update_article
    ///
    /// Only the columns present in `changes` appear in the `SET` list; `updated_at`
    /// always moves. A tag replacement runs in the same transaction.
    async fn update_article(&self, id: Uuid, changes: ArticleChanges) -> RepoResult<Option<ArticleListItem>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE articles SET updated_at = NOW()");

        if let Some(title) = changes.title {
            builder.push(", title = ").push_bind(title);
        }
        if let Some(slug) = changes.slug {
            builder.push(", slug = ").push_bind(slug);
        }
        if let Some(content) = changes.content {
            builder.push(", content = ").push_bind(content);
        }
        if let Some(minutes) = changes.estimated_read_time {
            builder.push(", estimated_read_time = ").push_bind(minutes);
        }
        if let Some(quick_answer) = changes.quick_answer {
            builder.push(", quick_answer = ").push_bind(quick_answer);
        }
        if let Some(category_id) = changes.category_id {
            builder.push(", category_id = ").push_bind(category_id);
        }
        if let Some(status) = changes.status {
            builder.push(", status = ").push_bind(status);
        }
        builder.push(" WHERE id = ").push_bind(id);
        builder.push(" RETURNING id");

        let mut tx = self.pool.begin().await?;

        let updated: Option<Uuid> = builder
            .build_query_scalar()
            .fetch_optional(&mut *tx)
            .await?;
        let Some(id) = updated else {
            return Ok(None);
        };

        if let Some(tag_ids) = changes.tag_ids {
            replace_tags(&mut tx, id, &tag_ids).await?;
        }
        tx.commit().await?;

        self.fetch_list_item(id).await
    }

    async fn delete_article(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn increment_view_count(&self, id: Uuid) -> RepoResult<Option<i32>> {
        sqlx::query_scalar::<_, i32>(
            "UPDATE articles SET view_count = view_count + 1 WHERE id = $1 RETURNING view_count",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// record_feedback
    ///
    /// Insert and counter bump run in one transaction so the counters never drift from
    /// the feedback rows.
    async fn record_feedback(&self, feedback: NewFeedback) -> RepoResult<ArticleFeedback> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ArticleFeedback>(
            r#"
            INSERT INTO article_feedback (article_id, user_id, is_helpful, comment)
            VALUES ($1, $2, $3, $4)
            RETURNING id, article_id, user_id, is_helpful, comment, created_at
            "#,
        )
        .bind(feedback.article_id)
        .bind(feedback.user_id)
        .bind(feedback.is_helpful)
        .bind(feedback.comment)
        .fetch_one(&mut *tx)
        .await?;

        let bump = if feedback.is_helpful {
            "UPDATE articles SET helpful_count = helpful_count + 1 WHERE id = $1"
        } else {
            "UPDATE articles SET not_helpful_count = not_helpful_count + 1 WHERE id = $1"
        };
        sqlx::query(bump)
            .bind(feedback.article_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row)
    }

    async fn record_ticket_prevention(&self, record: NewTicketPrevention) -> RepoResult<TicketPrevention> {
        sqlx::query_as::<_, TicketPrevention>(
            r#"
            INSERT INTO ticket_preventions (article_id, user_id, issue_type)
            VALUES ($1, $2, $3)
            RETURNING id, article_id, user_id, issue_type, created_at
            "#,
        )
        .bind(record.article_id)
        .bind(record.user_id)
        .bind(record.issue_type)
        .fetch_one(&self.pool)
        .await
    }

    /// search_articles
    ///
    /// ILIKE over three columns with a single bound pattern. Wildcards typed by the user
    /// are escaped so the match stays a plain substring match.
    async fn search_articles(&self, term: &str, limit: i64) -> RepoResult<Vec<ArticleListItem>> {
        let query = format!(
            "{ARTICLE_SELECT} WHERE a.status = 'published' \
             AND (a.title ILIKE $1 OR a.content ILIKE $1 OR a.quick_answer ILIKE $1) \
             ORDER BY a.view_count DESC, a.created_at DESC LIMIT $2"
        );
        let rows = sqlx::query_as::<_, ArticleRow>(&query)
            .bind(like_pattern(term))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(ArticleListItem::from).collect())
    }

    async fn log_search(&self, entry: NewSearchLog) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO search_logs (search_term, results_count, user_id, top_result_id)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(entry.search_term)
        .bind(entry.results_count)
        .bind(entry.user_id)
        .bind(entry.top_result_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// analytics_summary
    ///
    /// Compiles the admin dashboard counters and leaderboards in one call.
    async fn analytics_summary(&self, top_articles: i64, top_terms: i64) -> RepoResult<AnalyticsSummary> {
        let total_articles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await?;
        let total_views: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(view_count), 0)::BIGINT FROM articles")
                .fetch_one(&self.pool)
                .await?;
        let total_searches: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM search_logs")
            .fetch_one(&self.pool)
            .await?;
        let total_tickets_prevented: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM ticket_preventions")
                .fetch_one(&self.pool)
                .await?;

        let top = sqlx::query_as::<_, TopArticle>(
            r#"
            SELECT id, title, slug, view_count, helpful_count, not_helpful_count
            FROM articles
            WHERE status = 'published'
            ORDER BY view_count DESC
            LIMIT $1
            "#,
        )
        .bind(top_articles)
        .fetch_all(&self.pool)
        .await?;

        let top_search_terms = sqlx::query_as::<_, TopSearchTerm>(
            r#"
            SELECT LOWER(search_term) AS search_term, COUNT(*) AS search_count
            FROM search_logs
            GROUP BY LOWER(search_term)
            ORDER BY search_count DESC, search_term ASC
            LIMIT $1
            "#,
        )
        .bind(top_terms)
        .fetch_all(&self.pool)
        .await?;

        Ok(AnalyticsSummary {
            total_articles,
            total_views,
            total_searches,
            total_tickets_prevented,
            top_articles: top.into_iter().map(TopArticle::with_helpful_percentage).collect(),
            top_search_terms,
        })
    }
}
