//! Auth handlers and supporting modules.
//!
//! Registration and password reset are both gated by an emailed OTP:
//!
//! - `user-registration` / `seller-registration` issue the code, and the
//!   matching `verify-*` endpoint checks it before the account is created.
//! - `forgot-password-user` issues the code, `verify-forgot-password-user`
//!   checks it and opens a short reset window, and `reset-password-user` only
//!   works inside that window.
//! - `login-user` returns an access and a refresh token, and
//!   `refresh-token-user` trades the refresh token for a new access token.
//!
//! Cooldown, spam lock and lockout are enforced by the gatekeeper; handlers
//! only validate input and map outcomes to responses.

mod error;
pub(crate) mod login;
pub(crate) mod password;
pub(crate) mod registration;
mod state;
pub(crate) mod token;
pub(crate) mod types;
mod utils;

pub use error::{ApiError, ErrorResponse};
pub use state::{AuthConfig, AuthState};
pub use token::{Claims, TokenIssuer};
