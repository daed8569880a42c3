#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use itkit::{
    AppState,
    auth::issue_token,
    config::AppConfig,
    models::{
        AnalyticsSummary, Article, ArticleChanges, ArticleDetail, ArticleFeedback,
        ArticleFilter, ArticleListItem, ArticleStatus, AuthorSummary, Category,
        CategorySummary, NewArticle, NewFeedback, NewSearchLog, NewTicketPrevention, NewUser,
        Role, SearchLog, Tag, TicketPrevention, TopArticle, TopSearchTerm, User, UserPublic,
    },
    repository::{RepoResult, Repository, RepositoryState},
    text::{estimated_read_time, slugify},
};
use sqlx::error::{DatabaseError, ErrorKind};
use std::{
    borrow::Cow,
    collections::HashMap,
    error::Error as StdError,
    fmt,
    sync::{Arc, Mutex},
};
use uuid::Uuid;

// --- DRIVER ERRORS ---

/// What Postgres reports when a UNIQUE constraint rejects a write.
#[derive(Debug)]
pub struct UniqueViolation(pub &'static str);

impl fmt::Display for UniqueViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "duplicate key value violates unique constraint \"{}\"", self.0)
    }
}

impl StdError for UniqueViolation {}

impl DatabaseError for UniqueViolation {
    fn message(&self) -> &str {
        "duplicate key value violates unique constraint"
    }

    fn code(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed("23505"))
    }

    fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
        self
    }

    fn constraint(&self) -> Option<&str> {
        Some(self.0)
    }

    fn kind(&self) -> ErrorKind {
        ErrorKind::UniqueViolation
    }
}

pub fn unique_violation(constraint: &'static str) -> sqlx::Error {
    sqlx::Error::Database(Box::new(UniqueViolation(constraint)))
}

// --- IN-MEMORY REPOSITORY ---

#[derive(Default)]
pub struct Tables {
    pub users: Vec<User>,
    pub categories: Vec<Category>,
    pub articles: Vec<Article>,
    pub tags: Vec<Tag>,
    pub article_tags: Vec<(Uuid, Uuid)>,
    pub feedback: Vec<ArticleFeedback>,
    pub search_logs: Vec<SearchLog>,
    pub ticket_preventions: Vec<TicketPrevention>,
}

/// A `Repository` over plain vectors, standing in for Postgres in handler and router tests.
/// Unique columns (user email, article slug) are enforced like the real constraints. The
/// failure switches make a single operation return a driver error.
#[derive(Default)]
pub struct InMemoryRepository {
    pub tables: Mutex<Tables>,
    pub fail_search: bool,
    pub fail_search_log: bool,
    // Any write that carries tag ids fails and leaves every table untouched.
    pub fail_tag_write: bool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn list_item(tables: &Tables, article: &Article) -> ArticleListItem {
        let category = article
            .category_id
            .and_then(|id| tables.categories.iter().find(|c| c.id == id))
            .map(|c| CategorySummary {
                id: c.id,
                name: c.name.clone(),
                slug: c.slug.clone(),
                icon: c.icon.clone(),
            });
        let author = article
            .author_id
            .and_then(|id| tables.users.iter().find(|u| u.id == id))
            .map(|u| AuthorSummary {
                id: u.id,
                full_name: u.full_name.clone(),
            });
        ArticleListItem {
            article: article.clone(),
            category,
            author,
        }
    }

    fn attach_tags(tables: &mut Tables, article_id: Uuid, tag_ids: &[Uuid]) {
        tables.article_tags.retain(|(a, _)| *a != article_id);
        let known: Vec<Uuid> = tag_ids
            .iter()
            .copied()
            .filter(|id| tables.tags.iter().any(|t| t.id == *id))
            .collect();
        for tag_id in known {
            if !tables.article_tags.contains(&(article_id, tag_id)) {
                tables.article_tags.push((article_id, tag_id));
            }
        }
    }

    pub fn article_count(&self) -> usize {
        self.tables.lock().unwrap().articles.len()
    }

    pub fn search_log_count(&self) -> usize {
        self.tables.lock().unwrap().search_logs.len()
    }

    pub fn user_count(&self) -> usize {
        self.tables.lock().unwrap().users.len()
    }

    pub fn article(&self, id: Uuid) -> Option<Article> {
        self.tables
            .lock()
            .unwrap()
            .articles
            .iter()
            .find(|a| a.id == id)
            .cloned()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn find_user_by_id(&self, id: Uuid) -> RepoResult<Option<UserPublic>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .map(UserPublic::from))
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<UserPublic> {
        let mut tables = self.tables.lock().unwrap();
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(unique_violation("users_email_key"));
        }
        let now = Utc::now();
        let row = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            full_name: user.full_name,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(row.clone());
        Ok(row.into())
    }

    async fn update_user_name(&self, id: Uuid, full_name: &str) -> RepoResult<Option<UserPublic>> {
        let mut tables = self.tables.lock().unwrap();
        Ok(tables.users.iter_mut().find(|u| u.id == id).map(|u| {
            u.full_name = full_name.to_string();
            u.updated_at = Utc::now();
            UserPublic::from(u.clone())
        }))
    }

    async fn list_categories(&self) -> RepoResult<Vec<Category>> {
        let tables = self.tables.lock().unwrap();
        let mut categories = tables.categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn find_category_by_slug(&self, slug: &str) -> RepoResult<Option<Category>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.categories.iter().find(|c| c.slug == slug).cloned())
    }

    async fn list_articles(&self, filter: ArticleFilter) -> RepoResult<(Vec<ArticleListItem>, i64)> {
        let tables = self.tables.lock().unwrap();
        let mut matching: Vec<&Article> = tables
            .articles
            .iter()
            .filter(|a| filter.status.is_none_or(|s| a.status == s))
            .filter(|a| filter.category_id.is_none_or(|c| a.category_id == Some(c)))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .map(|a| Self::list_item(&tables, a))
            .collect();
        Ok((page, total))
    }

    async fn find_article_by_slug(&self, slug: &str) -> RepoResult<Option<ArticleDetail>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.articles.iter().find(|a| a.slug == slug).map(|a| {
            let tags = tables
                .article_tags
                .iter()
                .filter(|(article_id, _)| *article_id == a.id)
                .filter_map(|(_, tag_id)| tables.tags.iter().find(|t| t.id == *tag_id))
                .cloned()
                .collect();
            ArticleDetail {
                item: Self::list_item(&tables, a),
                tags,
            }
        }))
    }

    async fn find_article(&self, id: Uuid) -> RepoResult<Option<Article>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.articles.iter().find(|a| a.id == id).cloned())
    }

    async fn slug_exists(&self, slug: &str, exclude: Option<Uuid>) -> RepoResult<bool> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .articles
            .iter()
            .any(|a| a.slug == slug && Some(a.id) != exclude))
    }

    async fn create_article(&self, article: NewArticle) -> RepoResult<ArticleListItem> {
        let mut tables = self.tables.lock().unwrap();
        if tables.articles.iter().any(|a| a.slug == article.slug) {
            return Err(unique_violation("articles_slug_key"));
        }
        if self.fail_tag_write && !article.tag_ids.is_empty() {
            return Err(sqlx::Error::PoolTimedOut);
        }
        let now = Utc::now();
        let row = Article {
            id: Uuid::new_v4(),
            title: article.title,
            slug: article.slug,
            content: article.content,
            quick_answer: article.quick_answer,
            category_id: article.category_id,
            author_id: article.author_id,
            status: article.status,
            view_count: 0,
            helpful_count: 0,
            not_helpful_count: 0,
            estimated_read_time: article.estimated_read_time,
            created_at: now,
            updated_at: now,
        };
        tables.articles.push(row.clone());
        Self::attach_tags(&mut tables, row.id, &article.tag_ids);
        Ok(Self::list_item(&tables, &row))
    }

    async fn update_article(&self, id: Uuid, changes: ArticleChanges) -> RepoResult<Option<ArticleListItem>> {
        let mut tables = self.tables.lock().unwrap();
        if !tables.articles.iter().any(|a| a.id == id) {
            return Ok(None);
        }
        if let Some(slug) = &changes.slug
            && tables.articles.iter().any(|a| &a.slug == slug && a.id != id)
        {
            return Err(unique_violation("articles_slug_key"));
        }
        if self.fail_tag_write && changes.tag_ids.is_some() {
            return Err(sqlx::Error::PoolTimedOut);
        }

        let Some(article) = tables.articles.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            article.title = title;
        }
        if let Some(slug) = changes.slug {
            article.slug = slug;
        }
        if let Some(content) = changes.content {
            article.content = content;
        }
        if let Some(minutes) = changes.estimated_read_time {
            article.estimated_read_time = minutes;
        }
        if let Some(quick_answer) = changes.quick_answer {
            article.quick_answer = quick_answer;
        }
        if let Some(category_id) = changes.category_id {
            article.category_id = category_id;
        }
        if let Some(status) = changes.status {
            article.status = status;
        }
        article.updated_at = Utc::now();
        let updated = article.clone();
        if let Some(tag_ids) = changes.tag_ids {
            Self::attach_tags(&mut tables, id, &tag_ids);
        }
        Ok(Some(Self::list_item(&tables, &updated)))
    }

    async fn delete_article(&self, id: Uuid) -> RepoResult<bool> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.articles.len();
        tables.articles.retain(|a| a.id != id);
        tables.article_tags.retain(|(article_id, _)| *article_id != id);
        tables.feedback.retain(|f| f.article_id != id);
        tables.ticket_preventions.retain(|t| t.article_id != id);
        for log in tables.search_logs.iter_mut() {
            if log.top_result_id == Some(id) {
                log.top_result_id = None;
            }
        }
        Ok(tables.articles.len() < before)
    }

    async fn increment_view_count(&self, id: Uuid) -> RepoResult<Option<i32>> {
        let mut tables = self.tables.lock().unwrap();
        Ok(tables.articles.iter_mut().find(|a| a.id == id).map(|a| {
            a.view_count += 1;
            a.view_count
        }))
    }

    async fn record_feedback(&self, feedback: NewFeedback) -> RepoResult<ArticleFeedback> {
        let mut tables = self.tables.lock().unwrap();
        let article = tables
            .articles
            .iter_mut()
            .find(|a| a.id == feedback.article_id)
            .ok_or(sqlx::Error::RowNotFound)?;
        if feedback.is_helpful {
            article.helpful_count += 1;
        } else {
            article.not_helpful_count += 1;
        }
        let row = ArticleFeedback {
            id: Uuid::new_v4(),
            article_id: feedback.article_id,
            user_id: feedback.user_id,
            is_helpful: feedback.is_helpful,
            comment: feedback.comment,
            created_at: Utc::now(),
        };
        tables.feedback.push(row.clone());
        Ok(row)
    }

    async fn record_ticket_prevention(&self, record: NewTicketPrevention) -> RepoResult<TicketPrevention> {
        let mut tables = self.tables.lock().unwrap();
        let row = TicketPrevention {
            id: Uuid::new_v4(),
            article_id: record.article_id,
            user_id: record.user_id,
            issue_type: record.issue_type,
            created_at: Utc::now(),
        };
        tables.ticket_preventions.push(row.clone());
        Ok(row)
    }

    async fn search_articles(&self, term: &str, limit: i64) -> RepoResult<Vec<ArticleListItem>> {
        if self.fail_search {
            return Err(sqlx::Error::PoolTimedOut);
        }
        let tables = self.tables.lock().unwrap();
        let needle = term.to_lowercase();
        let mut hits: Vec<&Article> = tables
            .articles
            .iter()
            .filter(|a| a.status == ArticleStatus::Published)
            .filter(|a| {
                a.title.to_lowercase().contains(&needle)
                    || a.content.to_lowercase().contains(&needle)
                    || a
                        .quick_answer
                        .as_deref()
                        .is_some_and(|q| q.to_lowercase().contains(&needle))
            })
            .collect();
        hits.sort_by(|a, b| b.view_count.cmp(&a.view_count));
        Ok(hits
            .into_iter()
            .take(limit as usize)
            .map(|a| Self::list_item(&tables, a))
            .collect())
    }

    async fn log_search(&self, entry: NewSearchLog) -> RepoResult<()> {
        if self.fail_search_log {
            return Err(sqlx::Error::PoolTimedOut);
        }
        let mut tables = self.tables.lock().unwrap();
        tables.search_logs.push(SearchLog {
            id: Uuid::new_v4(),
            search_term: entry.search_term,
            results_count: entry.results_count,
            user_id: entry.user_id,
            top_result_id: entry.top_result_id,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn analytics_summary(&self, top_articles: i64, top_terms: i64) -> RepoResult<AnalyticsSummary> {
        let tables = self.tables.lock().unwrap();

        let mut published: Vec<&Article> = tables
            .articles
            .iter()
            .filter(|a| a.status == ArticleStatus::Published)
            .collect();
        published.sort_by(|a, b| b.view_count.cmp(&a.view_count));

        let mut counts: HashMap<String, i64> = HashMap::new();
        for log in &tables.search_logs {
            *counts.entry(log.search_term.to_lowercase()).or_default() += 1;
        }
        let mut terms: Vec<TopSearchTerm> = counts
            .into_iter()
            .map(|(search_term, search_count)| TopSearchTerm {
                search_term,
                search_count,
            })
            .collect();
        terms.sort_by(|a, b| {
            b.search_count
                .cmp(&a.search_count)
                .then_with(|| a.search_term.cmp(&b.search_term))
        });
        terms.truncate(top_terms as usize);

        Ok(AnalyticsSummary {
            total_articles: tables.articles.len() as i64,
            total_views: tables.articles.iter().map(|a| a.view_count as i64).sum(),
            total_searches: tables.search_logs.len() as i64,
            total_tickets_prevented: tables.ticket_preventions.len() as i64,
            top_articles: published
                .into_iter()
                .take(top_articles as usize)
                .map(|a| {
                    TopArticle {
                        id: a.id,
                        title: a.title.clone(),
                        slug: a.slug.clone(),
                        view_count: a.view_count,
                        helpful_count: a.helpful_count,
                        not_helpful_count: a.not_helpful_count,
                        helpful_percentage: 0,
                    }
                    .with_helpful_percentage()
                })
                .collect(),
            top_search_terms: terms,
        })
    }
}

// --- FIXTURES ---

pub fn app_state(repo: Arc<InMemoryRepository>) -> AppState {
    AppState {
        repo: repo as RepositoryState,
        config: AppConfig::default(),
    }
}

/// Inserts a user directly (placeholder hash) and returns it with a valid token.
pub fn seed_user(repo: &InMemoryRepository, email: &str, role: Role) -> (UserPublic, String) {
    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        email: email.to_lowercase(),
        password_hash: "not-a-real-hash".to_string(),
        full_name: "Test User".to_string(),
        role,
        created_at: now,
        updated_at: now,
    };
    repo.tables.lock().unwrap().users.push(user.clone());

    let public = UserPublic::from(user);
    let token = issue_token(&public, &AppConfig::default()).expect("token");
    (public, token)
}

pub fn seed_category(repo: &InMemoryRepository, name: &str, slug: &str) -> Category {
    let category = Category {
        id: Uuid::new_v4(),
        name: name.to_string(),
        slug: slug.to_string(),
        icon: "📄".to_string(),
        description: None,
        created_at: Utc::now(),
    };
    repo.tables.lock().unwrap().categories.push(category.clone());
    category
}

pub fn seed_tag(repo: &InMemoryRepository, name: &str) -> Tag {
    let tag = Tag {
        id: Uuid::new_v4(),
        name: name.to_string(),
        slug: slugify(name),
        created_at: Utc::now(),
    };
    repo.tables.lock().unwrap().tags.push(tag.clone());
    tag
}

/// Inserts an article. Each call is one second newer than every earlier one, so listings
/// have a stable order.
pub fn seed_article(
    repo: &InMemoryRepository,
    title: &str,
    content: &str,
    status: ArticleStatus,
    views: i32,
) -> Article {
    let mut tables = repo.tables.lock().unwrap();
    let created_at = Utc::now() + Duration::seconds(tables.articles.len() as i64);
    let article = Article {
        id: Uuid::new_v4(),
        title: title.to_string(),
        slug: slugify(title),
        content: content.to_string(),
        quick_answer: None,
        category_id: None,
        author_id: None,
        status,
        view_count: views,
        helpful_count: 0,
        not_helpful_count: 0,
        estimated_read_time: estimated_read_time(content),
        created_at,
        updated_at: created_at,
    };
    tables.articles.push(article.clone());
    article
}

/// Runs `edit` against the stored row of `id`.
pub fn edit_article(repo: &InMemoryRepository, id: Uuid, edit: impl FnOnce(&mut Article)) {
    let mut tables = repo.tables.lock().unwrap();
    if let Some(article) = tables.articles.iter_mut().find(|a| a.id == id) {
        edit(article);
    }
}
