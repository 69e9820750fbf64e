//! # Authgate (OTP registration & password reset)
//!
//! `authgate` is the authentication service of the storefront and seller
//! dashboard. Accounts are confirmed by a 4-digit one-time passcode (OTP)
//! mailed to the address being registered; the same mechanism guards
//! password resets.
//!
//! ## OTP Gatekeeper
//!
//! All OTP state lives in a key-value cache with per-key expiry (Redis in
//! production). The [`otp::Gatekeeper`] owns the policy:
//!
//! - **Cooldown:** one OTP per identifier per minute.
//! - **Spam Lock:** the 3rd request inside an hour locks issuance for an hour.
//! - **Lockout:** the 3rd wrong code locks the identifier for 30 minutes and
//!   discards the pending OTP.
//!
//! Locks are never cleared by hand; they only expire.
//!
//! ## Collaborators
//!
//! The cache ([`store::OtpStore`]), the mailer ([`email::EmailSender`]) and the
//! account table ([`accounts::AccountRepository`]) are injected as trait
//! objects so every flow can run against in-memory doubles.

pub mod accounts;
pub mod api;
pub mod cli;
pub mod email;
pub mod otp;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
