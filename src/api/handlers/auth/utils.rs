//! Small helpers for auth input validation.

use super::error::ApiError;
use regex::Regex;

/// Normalize an email for lookup/uniqueness checks.
pub(super) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(super) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Reject the request if any field is blank.
pub(super) fn require_fields(fields: &[&str]) -> Result<(), ApiError> {
    if fields.iter().any(|field| field.trim().is_empty()) {
        return Err(ApiError::validation("All fields are required!"));
    }
    Ok(())
}

/// Normalize and format-check an email, failing with a validation error.
pub(super) fn checked_email(email: &str) -> Result<String, ApiError> {
    let email = normalize_email(email);
    if !valid_email(&email) {
        return Err(ApiError::validation("Invalid email format!"));
    }
    Ok(email)
}

/// Extract a bearer token from an `Authorization` header value.
pub(super) fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() { None } else { Some(token) }
}
