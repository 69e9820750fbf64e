//! Request/response types for auth endpoints.
//!
//! Request fields default to empty so that missing fields reach the handler
//! and are reported with the same message as blank ones.

use crate::accounts::AccountSummary;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct UserRegistrationRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct VerifyUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub otp: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct SellerRegistrationRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone_number: String,
    pub country: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct VerifySellerRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone_number: String,
    pub country: String,
    pub otp: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct RefreshTokenRequest {
    #[serde(alias = "refreshToken")]
    pub refresh_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct VerifyForgotPasswordRequest {
    pub email: String,
    pub otp: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct ResetPasswordRequest {
    pub email: String,
    #[serde(alias = "newPassword")]
    pub new_password: String,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct OtpSentResponse {
    pub message: String,
    /// `false` when the mailer reported a failure; the code is stored either way.
    pub delivered: bool,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[derive(ToSchema, Serialize, Debug)]
pub struct LoginResponse {
    pub message: String,
    pub user: AccountSummary,
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub refresh_token: String,
    pub refresh_expires_in: u64,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct RefreshTokenResponse {
    pub success: bool,
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct LoggedInUserResponse {
    pub success: bool,
    pub user: AccountSummary,
}
