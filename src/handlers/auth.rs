use axum::extract::State;

use crate::{
    AppState,
    auth::{AuthUser, hash_password, issue_token, verify_password},
    error::{ApiError, ApiResult, ErrorEnvelope},
    extract::ApiJson,
    models::{
        AuthResponse, LoginRequest, NewUser, RegisterRequest, Role, UpdateProfileRequest,
        UserPublic,
    },
    response::ApiResponse,
    validation::{is_valid_email, is_valid_full_name, validate_registration},
};

/// register
///
/// [Public Route] Creates a `user` account and signs a token for it.
///
/// The email is compared and stored lowercase. A duplicate address is rejected before
/// the password is hashed, so nothing is written.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = AuthResponse),
        (status = 400, description = "Invalid input or duplicate email", body = ErrorEnvelope)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> ApiResult<AuthResponse> {
    validate_registration(&payload.email, &payload.password, &payload.full_name)?;

    let email = payload.email.to_lowercase();
    let existing = state
        .repo
        .find_user_by_email(&email)
        .await
        .map_err(ApiError::database("Failed to create user"))?;
    if existing.is_some() {
        return Err(ApiError::validation("User with this email already exists"));
    }

    let password_hash = hash_password(&payload.password).await?;
    let user = state
        .repo
        .create_user(NewUser {
            email,
            password_hash,
            full_name: payload.full_name.trim().to_string(),
            role: Role::User,
        })
        .await
        .map_err(ApiError::unique_or_database(
            "User with this email already exists",
            "Failed to create user",
        ))?;

    let token = issue_token(&user, &state.config)?;
    tracing::info!(user_id = %user.id, "user registered");

    Ok(ApiResponse::created(AuthResponse { user, token })
        .with_message("User registered successfully"))
}

/// login
///
/// [Public Route] Exchanges email and password for a token. Unknown email and wrong
/// password are indistinguishable to the caller.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 400, description = "Missing or malformed fields", body = ErrorEnvelope),
        (status = 401, description = "Bad credentials", body = ErrorEnvelope)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<AuthResponse> {
    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("Email and password are required"));
    }
    if !is_valid_email(&payload.email) {
        return Err(ApiError::validation("Invalid email format"));
    }

    let invalid = || ApiError::unauthorized("Invalid email or password");

    let user = state
        .repo
        .find_user_by_email(&payload.email.to_lowercase())
        .await
        .map_err(ApiError::database("Server error during login"))?
        .ok_or_else(invalid)?;

    if !verify_password(&payload.password, &user.password_hash).await? {
        tracing::debug!(user_id = %user.id, "password mismatch");
        return Err(invalid());
    }

    let user = UserPublic::from(user);
    let token = issue_token(&user, &state.config)?;

    Ok(ApiResponse::ok(AuthResponse { user, token }).with_message("Login successful"))
}

/// get_profile
///
/// [Authenticated Route] The user attached by the auth layer.
#[utoipa::path(
    get,
    path = "/api/auth/profile",
    responses(
        (status = 200, description = "Profile", body = UserPublic),
        (status = 401, description = "Not authenticated", body = ErrorEnvelope)
    ),
    tag = "auth"
)]
pub async fn get_profile(user: AuthUser) -> ApiResult<UserPublic> {
    Ok(ApiResponse::ok(user.profile()))
}

/// update_profile
///
/// [Authenticated Route] Renames the caller. The full name is the only mutable field.
#[utoipa::path(
    put,
    path = "/api/auth/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated", body = UserPublic),
        (status = 400, description = "Name too short", body = ErrorEnvelope)
    ),
    tag = "auth"
)]
pub async fn update_profile(
    user: AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<UpdateProfileRequest>,
) -> ApiResult<UserPublic> {
    if !is_valid_full_name(&payload.full_name) {
        return Err(ApiError::validation(
            "Full name must be at least 2 characters long",
        ));
    }

    let updated = state
        .repo
        .update_user_name(user.id, payload.full_name.trim())
        .await
        .map_err(ApiError::database("Failed to update profile"))?
        // The row vanished between authentication and the update.
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    Ok(ApiResponse::ok(updated).with_message("Profile updated successfully"))
}
