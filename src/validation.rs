use regex::Regex;
use std::sync::LazyLock;

use crate::error::ApiError;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_FULL_NAME_LEN: usize = 2;

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

pub fn is_valid_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
}

pub fn is_valid_full_name(name: &str) -> bool {
    name.trim().chars().count() >= MIN_FULL_NAME_LEN
}

/// validate_registration
///
/// Checks a registration payload; the first failing rule wins.
pub fn validate_registration(email: &str, password: &str, full_name: &str) -> Result<(), ApiError> {
    if !is_valid_email(email) {
        return Err(ApiError::validation("Invalid email format"));
    }
    if !is_valid_password(password) {
        return Err(ApiError::validation(
            "Password must be at least 6 characters long",
        ));
    }
    if !is_valid_full_name(full_name) {
        return Err(ApiError::validation(
            "Full name must be at least 2 characters long",
        ));
    }
    Ok(())
}
