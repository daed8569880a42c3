use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{
    FromRow,
    encode::IsNull,
    error::BoxDynError,
    postgres::{PgTypeInfo, PgValueRef, Postgres},
};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

/// UnknownVariant
///
/// Raised when a text column (or query parameter) holds a value outside a closed enum.
/// Surfacing it as a decode error keeps invalid rows from leaking past the data-access boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Implements string conversions and sqlx text encoding for a closed enum.
macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($ty),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl sqlx::Type<Postgres> for $ty {
            fn type_info() -> PgTypeInfo {
                <&str as sqlx::Type<Postgres>>::type_info()
            }

            fn compatible(ty: &PgTypeInfo) -> bool {
                <&str as sqlx::Type<Postgres>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, Postgres> for $ty {
            fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
                let text = <&str as sqlx::Decode<Postgres>>::decode(value)?;
                Ok(text.parse()?)
            }
        }

        impl<'q> sqlx::Encode<'q, Postgres> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut <Postgres as sqlx::Database>::ArgumentBuffer<'q>,
            ) -> Result<IsNull, BoxDynError> {
                <&str as sqlx::Encode<'q, Postgres>>::encode_by_ref(&self.as_str(), buf)
            }
        }
    };
}

// --- Closed Enumerations ---

/// Role
///
/// The RBAC field of a user. New accounts always start as `user`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Role {
    #[default]
    User,
    ItStaff,
    Admin,
}

text_enum!(Role {
    User => "user",
    ItStaff => "it_staff",
    Admin => "admin",
});

impl Role {
    /// Staff may author articles and see unpublished ones.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::ItStaff | Role::Admin)
    }
}

/// ArticleStatus
///
/// Lifecycle of an article. Only `published` articles are visible to the public.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ArticleStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

text_enum!(ArticleStatus {
    Draft => "draft",
    Published => "published",
    Archived => "archived",
});

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// The full `users` row, including the bcrypt hash. Internal only: it is never
/// serialized, responses always go through `UserPublic`.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    // Always stored lowercase.
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// UserPublic
///
/// The user as the API exposes it: no credential material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct UserPublic {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserPublic {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// Category
///
/// A row from `categories`. Categories are seeded by migration; there is no authoring endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    // Emoji or icon name rendered by the SPA.
    pub icon: String,
    pub description: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// CategorySummary
///
/// The slice of a category embedded in article listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CategorySummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub icon: String,
}

/// AuthorSummary
///
/// The slice of a user embedded in article listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AuthorSummary {
    pub id: Uuid,
    pub full_name: String,
}

/// Tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Article
///
/// A row from `articles`. `content` is HTML authored by IT staff; the counters are
/// denormalized and only ever incremented in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    // Curated short answer. Takes precedence over the extracted one in search.
    pub quick_answer: Option<String>,
    pub category_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    pub status: ArticleStatus,
    pub view_count: i32,
    pub helpful_count: i32,
    pub not_helpful_count: i32,
    // Minutes, at 200 words per minute.
    pub estimated_read_time: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// ArticleListItem
///
/// An article joined with its category and author summaries, as returned by
/// listings and search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ArticleListItem {
    #[serde(flatten)]
    pub article: Article,
    pub category: Option<CategorySummary>,
    pub author: Option<AuthorSummary>,
}

/// ArticleDetail
///
/// The single-article view: the list item plus its tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ArticleDetail {
    #[serde(flatten)]
    pub item: ArticleListItem,
    pub tags: Vec<Tag>,
}

/// ArticleFeedback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct ArticleFeedback {
    pub id: Uuid,
    pub article_id: Uuid,
    pub user_id: Option<Uuid>,
    pub is_helpful: bool,
    pub comment: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// SearchLog
///
/// One analytics record per accepted search, anonymous searches included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, Default)]
pub struct SearchLog {
    pub id: Uuid,
    pub search_term: String,
    pub results_count: i32,
    pub user_id: Option<Uuid>,
    pub top_result_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// TicketPrevention
///
/// A user-asserted signal that an article resolved an issue without a support ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct TicketPrevention {
    pub id: Uuid,
    pub article_id: Uuid,
    pub user_id: Option<Uuid>,
    pub issue_type: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Missing fields deserialize as empty strings so the validator, not serde, reports them.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub full_name: String,
}

/// LoginRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// UpdateProfileRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub full_name: String,
}

/// CreateArticleRequest
///
/// The slug is derived from the title server-side; `tags` holds tag ids.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateArticleRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quick_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ArticleStatus>,
    #[serde(default)]
    pub tags: Vec<Uuid>,
}

/// UpdateArticleRequest
///
/// Partial update: only provided fields change. An empty `quick_answer` clears the curated answer.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateArticleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quick_answer: Option<String>,
    /// Absent leaves the category alone; `null` removes it.
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(type = "string | null")]
    #[schema(value_type = Option<Uuid>)]
    pub category_id: Option<Option<Uuid>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ArticleStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Uuid>>,
}

/// Maps a present field to `Some(value)`, JSON `null` included, so that together with
/// `#[serde(default)]` a missing field stays `None`.
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// CreateFeedbackRequest
///
/// Both required fields are optional at the serde level so that their absence becomes
/// a validation error with a readable message.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateFeedbackRequest {
    pub article_id: Option<Uuid>,
    pub is_helpful: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// CreateTicketPreventionRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateTicketPreventionRequest {
    pub article_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<String>,
}

// --- Response Schemas (Output) ---

/// AuthResponse
///
/// Returned by register and login: the public user and a freshly signed token.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AuthResponse {
    pub user: UserPublic,
    pub token: String,
}

/// Pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Pagination {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
}

impl Pagination {
    pub fn new(total: i64, limit: i64, offset: i64) -> Self {
        Self {
            total,
            limit,
            offset,
            has_more: offset + limit < total,
        }
    }
}

/// CategoryArticles
///
/// Payload of `GET /api/categories/{slug}/articles`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CategoryArticles {
    pub category: Category,
    pub articles: Vec<ArticleListItem>,
    pub pagination: Pagination,
}

/// SourceArticle
///
/// Where the quick answer came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SourceArticle {
    pub title: String,
    pub slug: String,
}

/// SearchResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SearchResponse {
    pub quick_answer: Option<String>,
    pub source_article: Option<SourceArticle>,
    pub articles: Vec<ArticleListItem>,
    pub search_term: String,
    pub total_results: usize,
}

/// TopArticle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct TopArticle {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub view_count: i32,
    pub helpful_count: i32,
    pub not_helpful_count: i32,
    #[sqlx(default)]
    pub helpful_percentage: i32,
}

impl TopArticle {
    /// Share of helpful votes, rounded to a whole percent. Zero when nobody voted.
    pub fn with_helpful_percentage(mut self) -> Self {
        let votes = self.helpful_count + self.not_helpful_count;
        self.helpful_percentage = if votes > 0 {
            ((self.helpful_count as f64 * 100.0) / votes as f64).round() as i32
        } else {
            0
        };
        self
    }
}

/// TopSearchTerm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct TopSearchTerm {
    pub search_term: String,
    pub search_count: i64,
}

/// AnalyticsSummary
///
/// Output schema for the admin analytics dashboard (GET /api/admin/analytics).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AnalyticsSummary {
    pub total_articles: i64,
    pub total_views: i64,
    pub total_searches: i64,
    pub total_tickets_prevented: i64,
    pub top_articles: Vec<TopArticle>,
    pub top_search_terms: Vec<TopSearchTerm>,
}

/// HealthStatus
///
/// Liveness payload of `GET /health`, sent without the success envelope.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct HealthStatus {
    pub status: String,
    pub message: String,
    #[ts(type = "string")]
    pub timestamp: DateTime<Utc>,
}

/// ApiInfo
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ApiInfo {
    pub message: String,
    pub version: String,
}

// --- Repository Inputs ---

/// NewUser
///
/// Insert payload for `users`; the hash is computed by the caller.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
}

/// ArticleFilter
///
/// Listing filter. `None` fields do not constrain the query.
#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    pub status: Option<ArticleStatus>,
    pub category_id: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}

/// NewArticle
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub quick_answer: Option<String>,
    pub category_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    pub status: ArticleStatus,
    pub estimated_read_time: i32,
    // Attached in the same transaction as the insert. Unknown ids are ignored.
    pub tag_ids: Vec<Uuid>,
}

/// ArticleChanges
///
/// Column-level partial update. `Some(None)` clears a nullable column; `tag_ids`
/// replaces the whole tag set in the same transaction as the row update.
#[derive(Debug, Clone, Default)]
pub struct ArticleChanges {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub estimated_read_time: Option<i32>,
    pub quick_answer: Option<Option<String>>,
    pub category_id: Option<Option<Uuid>>,
    pub status: Option<ArticleStatus>,
    pub tag_ids: Option<Vec<Uuid>>,
}

/// NewFeedback
#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub article_id: Uuid,
    pub user_id: Option<Uuid>,
    pub is_helpful: bool,
    pub comment: Option<String>,
}

/// NewTicketPrevention
#[derive(Debug, Clone)]
pub struct NewTicketPrevention {
    pub article_id: Uuid,
    pub user_id: Option<Uuid>,
    pub issue_type: Option<String>,
}

/// NewSearchLog
#[derive(Debug, Clone)]
pub struct NewSearchLog {
    pub search_term: String,
    pub results_count: i32,
    pub user_id: Option<Uuid>,
    pub top_result_id: Option<Uuid>,
}
