//! Registration endpoints for users and sellers.
//!
//! Registration issues an OTP to the email; the account is only created by the
//! matching verify endpoint once the code checks out.

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use std::sync::Arc;
use tracing::{info, instrument};

use super::error::{ApiError, ErrorResponse};
use super::state::AuthState;
use super::types::{
    MessageResponse, OtpSentResponse, SellerRegistrationRequest, UserRegistrationRequest,
    VerifySellerRequest, VerifyUserRequest,
};
use super::utils::{checked_email, require_fields};
use crate::accounts::{AccountKind, CreateOutcome, NewAccount, password::hash_password};
use crate::email::EmailTemplate;

const OTP_SENT: &str = "OTP send to email, please verify your account";
const OTP_NOT_DELIVERED: &str =
    "OTP generated but the email could not be delivered, try again after the cooldown";

fn already_exists(kind: AccountKind) -> ApiError {
    match kind {
        AccountKind::User => ApiError::validation("User already exist with this email!"),
        AccountKind::Seller => ApiError::validation("Seller already exist with this email!"),
    }
}

fn otp_sent(delivered: bool) -> OtpSentResponse {
    OtpSentResponse {
        message: if delivered { OTP_SENT } else { OTP_NOT_DELIVERED }.to_string(),
        delivered,
    }
}

/// Issue an activation OTP unless the email is already registered.
async fn start_registration(
    state: &AuthState,
    kind: AccountKind,
    name: &str,
    email: &str,
    template: EmailTemplate,
) -> Result<OtpSentResponse, ApiError> {
    if state.accounts().find_by_email(kind, email).await?.is_some() {
        return Err(already_exists(kind));
    }

    let receipt = state
        .gatekeeper()
        .request_otp(email, name.trim(), template)
        .await?;
    Ok(otp_sent(receipt.delivered))
}

/// Verify the activation OTP, then persist the account.
async fn finish_registration(
    state: &AuthState,
    kind: AccountKind,
    account: NewAccount,
    password: &str,
    otp: &str,
) -> Result<(), ApiError> {
    if state
        .accounts()
        .find_by_email(kind, &account.email)
        .await?
        .is_some()
    {
        return Err(already_exists(kind));
    }

    state.gatekeeper().verify(&account.email, otp).await?;

    let account = NewAccount {
        password_hash: hash_password(password).await?,
        ..account
    };
    match state.accounts().create(kind, account).await? {
        CreateOutcome::Created(created) => {
            info!(account_id = %created.id, kind = kind.as_str(), "Account created");
            Ok(())
        }
        CreateOutcome::Duplicate => Err(already_exists(kind)),
    }
}

/// Start user registration by sending an activation OTP.
#[utoipa::path(
    post,
    path = "/api/user-registration",
    request_body = UserRegistrationRequest,
    responses(
        (status = 200, description = "OTP issued", body = OtpSentResponse),
        (status = 400, description = "Invalid input, existing user or OTP restriction", body = ErrorResponse),
        (status = 503, description = "OTP store unavailable", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn user_registration(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<UserRegistrationRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::validation("Missing payload"));
    };
    require_fields(&[&request.name, &request.email, &request.password])?;
    let email = checked_email(&request.email)?;

    let response = start_registration(
        &auth_state,
        AccountKind::User,
        &request.name,
        &email,
        EmailTemplate::UserActivation,
    )
    .await?;
    Ok((StatusCode::OK, Json(response)))
}

/// Verify the activation OTP and create the user.
#[utoipa::path(
    post,
    path = "/api/verify-user",
    request_body = VerifyUserRequest,
    responses(
        (status = 201, description = "User created", body = MessageResponse),
        (status = 400, description = "Invalid input, existing user or OTP rejection", body = ErrorResponse),
        (status = 503, description = "OTP store unavailable", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn verify_user(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyUserRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::validation("Missing payload"));
    };
    require_fields(&[
        &request.name,
        &request.email,
        &request.password,
        &request.otp,
    ])?;
    let email = checked_email(&request.email)?;

    let account = NewAccount {
        name: request.name.trim().to_string(),
        email,
        password_hash: String::new(),
        phone_number: None,
        country: None,
    };
    finish_registration(
        &auth_state,
        AccountKind::User,
        account,
        &request.password,
        &request.otp,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::ok("user registered successfully!")),
    ))
}

/// Start seller registration by sending an activation OTP.
#[utoipa::path(
    post,
    path = "/api/seller-registration",
    request_body = SellerRegistrationRequest,
    responses(
        (status = 200, description = "OTP issued", body = OtpSentResponse),
        (status = 400, description = "Invalid input, existing seller or OTP restriction", body = ErrorResponse),
        (status = 503, description = "OTP store unavailable", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn seller_registration(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SellerRegistrationRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::validation("Missing payload"));
    };
    require_fields(&[
        &request.name,
        &request.email,
        &request.password,
        &request.phone_number,
        &request.country,
    ])?;
    let email = checked_email(&request.email)?;

    let response = start_registration(
        &auth_state,
        AccountKind::Seller,
        &request.name,
        &email,
        EmailTemplate::SellerActivation,
    )
    .await?;
    Ok((StatusCode::OK, Json(response)))
}

/// Verify the activation OTP and create the seller.
#[utoipa::path(
    post,
    path = "/api/verify-seller",
    request_body = VerifySellerRequest,
    responses(
        (status = 201, description = "Seller created", body = MessageResponse),
        (status = 400, description = "Invalid input, existing seller or OTP rejection", body = ErrorResponse),
        (status = 503, description = "OTP store unavailable", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn verify_seller(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifySellerRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::validation("Missing payload"));
    };
    require_fields(&[
        &request.name,
        &request.email,
        &request.password,
        &request.phone_number,
        &request.country,
        &request.otp,
    ])?;
    let email = checked_email(&request.email)?;

    let account = NewAccount {
        name: request.name.trim().to_string(),
        email,
        password_hash: String::new(),
        phone_number: Some(request.phone_number.trim().to_string()),
        country: Some(request.country.trim().to_string()),
    };
    finish_registration(
        &auth_state,
        AccountKind::Seller,
        account,
        &request.password,
        &request.otp,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::ok("seller registered successfully!")),
    ))
}
