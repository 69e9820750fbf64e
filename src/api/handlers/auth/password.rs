//! Forgot-password flow: request an OTP, verify it, then set a new password.
//!
//! Verifying the OTP writes a short-lived reset grant. The reset endpoint only
//! accepts a new password while that grant is live and consumes it on success.

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::error::{ApiError, ErrorResponse};
use super::state::AuthState;
use super::types::{
    ForgotPasswordRequest, MessageResponse, OtpSentResponse, ResetPasswordRequest,
    VerifyForgotPasswordRequest,
};
use super::utils::{checked_email, normalize_email, require_fields};
use crate::accounts::{
    AccountKind,
    password::{hash_password, verify_password},
};
use crate::email::EmailTemplate;

const USER_NOT_FOUND: &str = "User not found!";
const NO_RESET_GRANT: &str = "Verify the OTP sent to your email before resetting the password!";

/// Send a password reset OTP to a registered user.
#[utoipa::path(
    post,
    path = "/api/forgot-password-user",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "OTP issued", body = OtpSentResponse),
        (status = 400, description = "Unknown user or OTP restriction", body = ErrorResponse),
        (status = 503, description = "OTP store unavailable", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn forgot_password_user(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ForgotPasswordRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::validation("Email is required!"));
    };
    if request.email.trim().is_empty() {
        return Err(ApiError::validation("Email is required!"));
    }
    let email = checked_email(&request.email)?;

    let Some(user) = auth_state
        .accounts()
        .find_by_email(AccountKind::User, &email)
        .await?
    else {
        return Err(ApiError::validation(USER_NOT_FOUND));
    };

    let receipt = auth_state
        .gatekeeper()
        .request_otp(&email, &user.name, EmailTemplate::ForgotPassword)
        .await?;

    let message = if receipt.delivered {
        "OTP sent to email. Please verify your account."
    } else {
        "OTP generated but the email could not be delivered, try again after the cooldown"
    };
    Ok((
        StatusCode::OK,
        Json(OtpSentResponse {
            message: message.to_string(),
            delivered: receipt.delivered,
        }),
    ))
}

/// Verify the password reset OTP and open the reset window.
#[utoipa::path(
    post,
    path = "/api/verify-forgot-password-user",
    request_body = VerifyForgotPasswordRequest,
    responses(
        (status = 200, description = "OTP verified, password may be reset", body = MessageResponse),
        (status = 400, description = "Missing fields or OTP rejection", body = ErrorResponse),
        (status = 503, description = "OTP store unavailable", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn verify_forgot_password_user(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyForgotPasswordRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::validation("Email and OTP are required!"));
    };
    if request.email.trim().is_empty() || request.otp.trim().is_empty() {
        return Err(ApiError::validation("Email and OTP are required!"));
    }
    let email = normalize_email(&request.email);

    let gatekeeper = auth_state.gatekeeper();
    gatekeeper.verify(&email, &request.otp).await?;
    gatekeeper.grant_reset(&email).await?;

    Ok((
        StatusCode::OK,
        Json(MessageResponse::ok(
            "OTP verified. You can now reset your password",
        )),
    ))
}

/// Set a new password after a verified forgot-password OTP.
#[utoipa::path(
    post,
    path = "/api/reset-password-user",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "No verified OTP, unknown user or unchanged password", body = ErrorResponse),
        (status = 503, description = "OTP store unavailable", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn reset_password_user(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::validation("All fields are required!"));
    };
    require_fields(&[&request.email, &request.new_password])?;
    let email = normalize_email(&request.email);
    let gatekeeper = auth_state.gatekeeper();

    // Peek first so a rejected password does not burn the grant.
    if !gatekeeper.reset_granted(&email).await? {
        return Err(ApiError::validation(NO_RESET_GRANT));
    }

    let Some(user) = auth_state
        .accounts()
        .find_by_email(AccountKind::User, &email)
        .await?
    else {
        return Err(ApiError::validation(USER_NOT_FOUND));
    };

    if verify_password(&request.new_password, &user.password_hash).await? {
        return Err(ApiError::validation(
            "Password can not same as previous one!",
        ));
    }

    if !gatekeeper.consume_reset_grant(&email).await? {
        return Err(ApiError::validation(NO_RESET_GRANT));
    }

    let password_hash = hash_password(&request.new_password).await?;
    if !auth_state
        .accounts()
        .update_password(AccountKind::User, &email, &password_hash)
        .await?
    {
        warn!(account_id = %user.id, "User vanished during password reset");
        return Err(ApiError::validation(USER_NOT_FOUND));
    }

    info!(account_id = %user.id, "Password reset");
    Ok((
        StatusCode::OK,
        Json(MessageResponse::ok("Password reset successfully!")),
    ))
}
