use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::ApiError,
    models::{Role, UserPublic},
    repository::RepositoryState,
};

/// bcrypt work factor for stored passwords.
pub const BCRYPT_COST: u32 = 10;

/// Claims
///
/// Payload of an ITKit identity token. The role inside the token is informational:
/// every authenticated request reloads the user and trusts the database row instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// The user's primary key.
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    /// Issued At, seconds since the epoch.
    pub iat: usize,
    /// Expiration Time, seconds since the epoch. Always validated.
    pub exp: usize,
}

// --- Password Utilities ---

/// hash_password
///
/// bcrypt hash at `BCRYPT_COST`, computed on the blocking pool.
pub async fn hash_password(password: &str) -> Result<String, ApiError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .map_err(|e| {
            tracing::error!("password hashing task failed: {:?}", e);
            ApiError::internal("Failed to process password")
        })?
        .map_err(|e| {
            tracing::error!("password hashing failed: {:?}", e);
            ApiError::internal("Failed to process password")
        })
}

/// verify_password
///
/// Compares a candidate password with a stored bcrypt hash. A malformed hash counts as a mismatch.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    let verdict = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| {
            tracing::error!("password verification task failed: {:?}", e);
            ApiError::internal("Failed to process password")
        })?;

    Ok(verdict.unwrap_or_else(|e| {
        tracing::warn!("stored password hash could not be verified: {:?}", e);
        false
    }))
}

// --- Token Utilities ---

/// issue_token_at
///
/// Signs an HS256 token for `user` that expires `config.token_ttl_days` after `now`.
pub fn issue_token_at(
    user: &UserPublic,
    config: &AppConfig,
    now: DateTime<Utc>,
) -> Result<String, ApiError> {
    let exp = now + Duration::days(config.token_ttl_days);
    let claims = Claims {
        id: user.id,
        email: user.email.clone(),
        role: user.role,
        iat: now.timestamp() as usize,
        exp: exp.timestamp() as usize,
    };

    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    encode(&Header::default(), &claims, &key).map_err(|e| {
        tracing::error!("token signing failed: {:?}", e);
        ApiError::internal("Failed to issue token")
    })
}

/// Signs a token for `user` valid from now.
pub fn issue_token(user: &UserPublic, config: &AppConfig) -> Result<String, ApiError> {
    issue_token_at(user, config, Utc::now())
}

/// verify_token
///
/// Decodes and validates signature and expiry. Any failure maps to a 401.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.leeway = 0;

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("rejected expired token"),
                other => tracing::debug!("rejected token: {:?}", other),
            }
            ApiError::unauthorized("Invalid or expired token")
        })
}

// --- Request Identity ---

/// AuthUser
///
/// The resolved identity of an authenticated request, loaded fresh from the database so a
/// deleted user or a changed role takes effect immediately.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<UserPublic> for AuthUser {
    fn from(user: UserPublic) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

impl AuthUser {
    /// The public projection of the attached user.
    pub fn profile(&self) -> UserPublic {
        UserPublic {
            id: self.id,
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            role: self.role,
            created_at: self.created_at,
        }
    }

    /// require_role
    ///
    /// Authorization gate: 403 with `message` unless the user's role is in `allowed`.
    pub fn require_role(&self, allowed: &[Role], message: &str) -> Result<(), ApiError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            tracing::warn!(user_id = %self.id, role = %self.role, "role check failed");
            Err(ApiError::forbidden(message))
        }
    }
}

/// Pulls the token out of `Authorization: Bearer <token>`.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// resolve_user
///
/// Token verification followed by the user lookup. Shared by the mandatory and the
/// optional extractor.
async fn resolve_user(
    token: &str,
    repo: &RepositoryState,
    config: &AppConfig,
) -> Result<AuthUser, ApiError> {
    let claims = verify_token(token, &config.jwt_secret)?;

    let user = repo.find_user_by_id(claims.id).await.map_err(|e| {
        tracing::error!("user lookup during authentication failed: {:?}", e);
        ApiError::internal("Authentication failed")
    })?;

    user.map(AuthUser::from)
        .ok_or_else(|| ApiError::unauthorized("User not found"))
}

/// AuthUser Extractor Implementation
///
/// 1. Dependency resolution: repository and config from the application state.
/// 2. Bearer token extraction.
/// 3. Token validation (signature, expiry).
/// 4. Database lookup of the user named by the token.
///
/// Rejection: the uniform envelope with 401 (or 500 if the lookup itself fails).
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Already resolved by `auth_middleware` on this request.
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let token = bearer_token(parts).ok_or_else(|| ApiError::unauthorized("No token provided"))?;

        resolve_user(token, &repo, &config).await
    }
}

/// Optional identity for routes that also serve anonymous callers (search, feedback).
/// A missing or unusable token yields `None` instead of a rejection.
impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(None);
        };

        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        match resolve_user(token, &repo, &config).await {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                tracing::debug!("treating request as anonymous: {}", e);
                Ok(None)
            }
        }
    }
}

/// auth_middleware
///
/// Route layer for the authenticated and admin routers. Resolves `AuthUser`, rejecting the
/// request before it reaches a handler, and stores the identity in the request extensions.
pub async fn auth_middleware(
    State(state): State<crate::AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = request.into_parts();
    let user = <AuthUser as FromRequestParts<crate::AppState>>::from_request_parts(&mut parts, &state)
        .await?;
    parts.extensions.insert(user);
    Ok(next.run(Request::from_parts(parts, body)).await)
}
