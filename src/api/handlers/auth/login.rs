//! Password login, access token refresh and the current-user lookup.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::error::{ApiError, ErrorResponse};
use super::state::AuthState;
use super::types::{
    LoggedInUserResponse, LoginRequest, LoginResponse, RefreshTokenRequest, RefreshTokenResponse,
};
use super::utils::{bearer_token, normalize_email, require_fields};
use crate::accounts::{AccountKind, AccountSummary, password::verify_password};

const INVALID_REFRESH_TOKEN: &str = "Forbidden!, invalid refresh token";

/// Check email and password, then hand out an access and a refresh token.
#[utoipa::path(
    post,
    path = "/api/login-user",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Missing fields", body = ErrorResponse),
        (status = 401, description = "Unknown user or wrong password", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login_user(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::validation("Missing payload"));
    };
    require_fields(&[&request.email, &request.password])?;
    let email = normalize_email(&request.email);

    let Some(user) = auth_state
        .accounts()
        .find_by_email(AccountKind::User, &email)
        .await?
    else {
        return Err(ApiError::unauthorized("User doesn't exist!"));
    };

    if !verify_password(&request.password, &user.password_hash).await? {
        return Err(ApiError::unauthorized("Wrong password or email!"));
    }

    let tokens = auth_state.tokens();
    let access_token = tokens.issue(user.id, AccountKind::User)?;
    let refresh_token = tokens.issue_refresh(user.id, AccountKind::User)?;
    info!(account_id = %user.id, "User logged in");

    Ok((
        StatusCode::OK,
        Json(LoginResponse {
            message: "Login Successful!".to_string(),
            user: AccountSummary::from(&user),
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: tokens.ttl_seconds(),
            refresh_token,
            refresh_expires_in: tokens.refresh_ttl_seconds(),
        }),
    ))
}

/// Trade a refresh token for a new access token.
#[utoipa::path(
    post,
    path = "/api/refresh-token-user",
    request_body = RefreshTokenRequest,
    responses(
        (status = 201, description = "New access token issued", body = RefreshTokenResponse),
        (status = 400, description = "Missing refresh token", body = ErrorResponse),
        (status = 401, description = "Invalid or expired refresh token, or unknown user", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn refresh_token_user(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RefreshTokenRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let refresh_token = payload
        .map(|Json(request)| request.refresh_token)
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| ApiError::validation("Unauthorized, no refresh token!"))?;

    let tokens = auth_state.tokens();
    let claims = tokens.validate_refresh(refresh_token.trim()).map_err(|err| {
        debug!("Rejected refresh token: {err:#}");
        ApiError::unauthorized(INVALID_REFRESH_TOKEN)
    })?;
    if claims.role != AccountKind::User.as_str() {
        return Err(ApiError::unauthorized(INVALID_REFRESH_TOKEN));
    }
    let account_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| ApiError::unauthorized(INVALID_REFRESH_TOKEN))?;

    let Some(user) = auth_state
        .accounts()
        .find_by_id(AccountKind::User, account_id)
        .await?
    else {
        return Err(ApiError::unauthorized("Account not found!"));
    };

    let access_token = tokens.issue(user.id, AccountKind::User)?;
    info!(account_id = %user.id, "Access token refreshed");

    Ok((
        StatusCode::CREATED,
        Json(RefreshTokenResponse {
            success: true,
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: tokens.ttl_seconds(),
        }),
    ))
}

/// Return the user behind a bearer access token.
#[utoipa::path(
    get,
    path = "/api/logged-in-user",
    params(
        ("Authorization" = String, Header, description = "Bearer access token")
    ),
    responses(
        (status = 200, description = "Current user", body = LoggedInUserResponse),
        (status = 401, description = "Missing, invalid or expired token", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn logged_in_user(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<impl IntoResponse, ApiError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| ApiError::unauthorized("Unauthorized! Token missing."))?;

    let claims = auth_state.tokens().validate(token).map_err(|err| {
        debug!("Rejected access token: {err:#}");
        ApiError::unauthorized("Unauthorized! Token expired or invalid.")
    })?;
    if claims.role != AccountKind::User.as_str() {
        return Err(ApiError::unauthorized("Access denied: User only"));
    }
    let account_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| ApiError::unauthorized("Unauthorized! Token expired or invalid."))?;

    let Some(user) = auth_state
        .accounts()
        .find_by_id(AccountKind::User, account_id)
        .await?
    else {
        return Err(ApiError::unauthorized("Account not found!"));
    };

    Ok(Json(LoggedInUserResponse {
        success: true,
        user: AccountSummary::from(&user),
    }))
}
