//! Mapping from handler failures to JSON error responses.
//!
//! Body shape: `{"status": "Error", "message": "...", "kind": "..."}`. Internal
//! details are logged and never returned.

use crate::otp::OtpError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

const INTERNAL_MESSAGE: &str = "Something went wrong, Try again!";
const UNAVAILABLE_MESSAGE: &str = "Service temporarily unavailable, Try again!";

#[derive(ToSchema, Serialize, Debug)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error(transparent)]
    Otp(#[from] OtpError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Otp(err) if err.is_dependency() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Otp(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, kind) = match &self {
            Self::Validation(message) => (message.clone(), Some("validation")),
            Self::Unauthorized(message) => (message.clone(), Some("authentication")),
            Self::Otp(err) if err.is_dependency() => {
                error!("OTP store unavailable: {err}");
                (UNAVAILABLE_MESSAGE.to_string(), Some(err.kind()))
            }
            Self::Otp(err) => (err.to_string(), Some(err.kind())),
            Self::Internal(err) => {
                error!("Unhandled error: {err:#}");
                (INTERNAL_MESSAGE.to_string(), None)
            }
        };

        let body = ErrorResponse {
            status: "Error".to_string(),
            message,
            kind: kind.map(str::to_string),
        };
        (status, Json(body)).into_response()
    }
}
