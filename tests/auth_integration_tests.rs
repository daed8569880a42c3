mod common;

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{Request, StatusCode, header, request::Parts},
};
use chrono::{Duration, Utc};
use common::{InMemoryRepository, app_state, seed_user};
use itkit::{
    ApiError, AppState,
    auth::{AuthUser, Claims, hash_password, issue_token_at, verify_password, verify_token},
    config::AppConfig,
    models::{Role, UserPublic},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::sync::Arc;
use uuid::Uuid;

// --- Helpers ---

fn parts_with(authorization: Option<&str>) -> Parts {
    let mut builder = Request::builder().uri("/api/auth/profile");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(()).unwrap().into_parts().0
}

async fn extract(state: &AppState, authorization: Option<&str>) -> Result<AuthUser, ApiError> {
    let mut parts = parts_with(authorization);
    <AuthUser as FromRequestParts<AppState>>::from_request_parts(&mut parts, state).await
}

async fn extract_optional(state: &AppState, authorization: Option<&str>) -> Option<AuthUser> {
    let mut parts = parts_with(authorization);
    <AuthUser as OptionalFromRequestParts<AppState>>::from_request_parts(&mut parts, state)
        .await
        .unwrap()
}

fn sample_user(role: Role) -> UserPublic {
    UserPublic {
        id: Uuid::new_v4(),
        email: "jane@corp.example".to_string(),
        full_name: "Jane Doe".to_string(),
        role,
        created_at: Utc::now(),
    }
}

// --- Token Utilities ---

#[test]
fn test_token_round_trip_preserves_identity() {
    let config = AppConfig::default();
    let user = sample_user(Role::ItStaff);

    let token = issue_token_at(&user, &config, Utc::now()).unwrap();
    let claims = verify_token(&token, &config.jwt_secret).unwrap();

    assert_eq!(claims.id, user.id);
    assert_eq!(claims.email, user.email);
    assert_eq!(claims.role, Role::ItStaff);
    assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
}

#[test]
fn test_expired_token_is_rejected() {
    let config = AppConfig::default();
    let issued = Utc::now() - Duration::days(8);

    let token = issue_token_at(&sample_user(Role::User), &config, issued).unwrap();

    assert_eq!(
        verify_token(&token, &config.jwt_secret),
        Err(ApiError::unauthorized("Invalid or expired token"))
    );
}

#[test]
fn test_token_signed_with_another_secret_is_rejected() {
    let config = AppConfig::default();
    let token = issue_token_at(&sample_user(Role::Admin), &config, Utc::now()).unwrap();

    let err = verify_token(&token, "some-other-secret").unwrap_err();
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}

#[test]
fn test_tampered_token_is_rejected() {
    let config = AppConfig::default();
    let token = issue_token_at(&sample_user(Role::User), &config, Utc::now()).unwrap();

    // Forge a payload claiming admin, reuse the original signature.
    let forged_claims = Claims {
        role: Role::Admin,
        ..verify_token(&token, &config.jwt_secret).unwrap()
    };
    let forged = encode(
        &Header::default(),
        &forged_claims,
        &EncodingKey::from_secret(b"attacker"),
    )
    .unwrap();
    let signature = token.rsplit('.').next().unwrap();
    let mut pieces: Vec<&str> = forged.split('.').collect();
    pieces[2] = signature;
    let spliced = pieces.join(".");

    assert!(verify_token(&spliced, &config.jwt_secret).is_err());
}

// --- Password Utilities ---

#[tokio::test]
async fn test_password_hash_and_verify() {
    let hash = hash_password("hunter22").await.unwrap();

    assert_ne!(hash, "hunter22");
    assert!(verify_password("hunter22", &hash).await.unwrap());
    assert!(!verify_password("hunter23", &hash).await.unwrap());
    assert!(!verify_password("hunter22", "not-a-bcrypt-hash").await.unwrap());
}

// --- AuthUser Extractor ---

#[tokio::test]
async fn test_auth_success_with_valid_token() {
    let repo = Arc::new(InMemoryRepository::new());
    let (user, token) = seed_user(&repo, "staff@corp.example", Role::ItStaff);
    let state = app_state(repo);

    let auth = extract(&state, Some(&format!("Bearer {token}"))).await.unwrap();

    assert_eq!(auth.id, user.id);
    assert_eq!(auth.role, Role::ItStaff);
    assert_eq!(auth.profile(), user);
}

#[tokio::test]
async fn test_role_comes_from_the_database_not_the_token() {
    let repo = Arc::new(InMemoryRepository::new());
    let (user, token) = seed_user(&repo, "promoted@corp.example", Role::User);
    repo.tables
        .lock()
        .unwrap()
        .users
        .iter_mut()
        .find(|u| u.id == user.id)
        .unwrap()
        .role = Role::Admin;
    let state = app_state(repo);

    let auth = extract(&state, Some(&format!("Bearer {token}"))).await.unwrap();
    assert_eq!(auth.role, Role::Admin);
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let state = app_state(Arc::new(InMemoryRepository::new()));

    assert_eq!(
        extract(&state, None).await.unwrap_err(),
        ApiError::unauthorized("No token provided")
    );
    assert_eq!(
        extract(&state, Some("Token abc")).await.unwrap_err(),
        ApiError::unauthorized("No token provided")
    );
    assert_eq!(
        extract(&state, Some("Bearer ")).await.unwrap_err(),
        ApiError::unauthorized("No token provided")
    );
}

#[tokio::test]
async fn test_auth_failure_with_garbage_token() {
    let state = app_state(Arc::new(InMemoryRepository::new()));

    assert_eq!(
        extract(&state, Some("Bearer not.a.jwt")).await.unwrap_err(),
        ApiError::unauthorized("Invalid or expired token")
    );
}

#[tokio::test]
async fn test_auth_failure_for_deleted_user() {
    let repo = Arc::new(InMemoryRepository::new());
    let (_, token) = seed_user(&repo, "gone@corp.example", Role::User);
    repo.tables.lock().unwrap().users.clear();
    let state = app_state(repo);

    assert_eq!(
        extract(&state, Some(&format!("Bearer {token}"))).await.unwrap_err(),
        ApiError::unauthorized("User not found")
    );
}

#[tokio::test]
async fn test_optional_identity() {
    let repo = Arc::new(InMemoryRepository::new());
    let (user, token) = seed_user(&repo, "reader@corp.example", Role::User);
    let state = app_state(repo);

    assert!(extract_optional(&state, None).await.is_none());
    assert!(extract_optional(&state, Some("Bearer broken")).await.is_none());

    let resolved = extract_optional(&state, Some(&format!("Bearer {token}")))
        .await
        .unwrap();
    assert_eq!(resolved.id, user.id);
}

// --- Authorization ---

#[test]
fn test_require_role() {
    let staff = AuthUser::from(sample_user(Role::ItStaff));

    assert!(staff.require_role(&[Role::ItStaff, Role::Admin], "nope").is_ok());
    assert_eq!(
        staff.require_role(&[Role::Admin], "Admins only"),
        Err(ApiError::forbidden("Admins only"))
    );
}
