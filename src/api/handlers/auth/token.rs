//! Signed tokens (HS256 JWT) handed out on login.
//!
//! Access and refresh tokens use separate secrets and carry a `typ` claim, so
//! one can never stand in for the other.

use crate::accounts::AccountKind;
use anyhow::{Context, Result, bail};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenUse {
    Access,
    Refresh,
}

impl TokenUse {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub typ: String,
    pub iat: u64,
    pub exp: u64,
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_seconds: u64,
}

impl SigningKeys {
    fn new(secret: &SecretString, ttl_seconds: u64) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            ttl_seconds,
        }
    }
}

pub struct TokenIssuer {
    access: SigningKeys,
    refresh: SigningKeys,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl_seconds", &self.access.ttl_seconds)
            .field("refresh_ttl_seconds", &self.refresh.ttl_seconds)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    #[must_use]
    pub fn new(
        access_secret: &SecretString,
        access_ttl_seconds: u64,
        refresh_secret: &SecretString,
        refresh_ttl_seconds: u64,
    ) -> Self {
        Self {
            access: SigningKeys::new(access_secret, access_ttl_seconds),
            refresh: SigningKeys::new(refresh_secret, refresh_ttl_seconds),
        }
    }

    #[must_use]
    pub fn ttl_seconds(&self) -> u64 {
        self.access.ttl_seconds
    }

    #[must_use]
    pub fn refresh_ttl_seconds(&self) -> u64 {
        self.refresh.ttl_seconds
    }

    /// Sign an access token for the account.
    ///
    /// # Errors
    /// Returns an error if the system clock is before the epoch or signing fails.
    pub fn issue(&self, account_id: Uuid, kind: AccountKind) -> Result<String> {
        self.sign(TokenUse::Access, account_id, kind)
    }

    /// Sign a refresh token for the account.
    ///
    /// # Errors
    /// Returns an error if the system clock is before the epoch or signing fails.
    pub fn issue_refresh(&self, account_id: Uuid, kind: AccountKind) -> Result<String> {
        self.sign(TokenUse::Refresh, account_id, kind)
    }

    /// Check an access token's signature, expiry and `typ`.
    ///
    /// # Errors
    /// Returns an error for malformed, forged, expired or refresh tokens.
    pub fn validate(&self, token: &str) -> Result<Claims> {
        self.check(TokenUse::Access, token)
    }

    /// Check a refresh token's signature, expiry and `typ`.
    ///
    /// # Errors
    /// Returns an error for malformed, forged, expired or access tokens.
    pub fn validate_refresh(&self, token: &str) -> Result<Claims> {
        self.check(TokenUse::Refresh, token)
    }

    fn keys(&self, token_use: TokenUse) -> &SigningKeys {
        match token_use {
            TokenUse::Access => &self.access,
            TokenUse::Refresh => &self.refresh,
        }
    }

    fn sign(&self, token_use: TokenUse, account_id: Uuid, kind: AccountKind) -> Result<String> {
        let keys = self.keys(token_use);
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("System clock is before the Unix epoch")?
            .as_secs();
        let claims = Claims {
            sub: account_id.to_string(),
            role: kind.as_str().to_string(),
            typ: token_use.as_str().to_string(),
            iat: now,
            exp: now + keys.ttl_seconds,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .with_context(|| format!("Failed to sign {} token", token_use.as_str()))
    }

    fn check(&self, token_use: TokenUse, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.keys(token_use).decoding, &validation)
            .with_context(|| format!("Invalid {} token", token_use.as_str()))?;
        if data.claims.typ != token_use.as_str() {
            bail!("Expected {} token, got {}", token_use.as_str(), data.claims.typ);
        }
        Ok(data.claims)
    }
}
