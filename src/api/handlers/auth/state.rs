//! Auth state and configuration shared by the auth handlers.

use super::token::TokenIssuer;
use crate::accounts::AccountRepository;
use crate::otp::Gatekeeper;
use secrecy::SecretString;
use std::sync::Arc;

const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: u64 = 15 * 60;
const DEFAULT_REFRESH_TOKEN_TTL_SECONDS: u64 = 7 * 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    jwt_secret: SecretString,
    refresh_secret: SecretString,
    access_token_ttl_seconds: u64,
    refresh_token_ttl_seconds: u64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(
        frontend_base_url: String,
        jwt_secret: SecretString,
        refresh_secret: SecretString,
    ) -> Self {
        Self {
            frontend_base_url,
            jwt_secret,
            refresh_secret,
            access_token_ttl_seconds: DEFAULT_ACCESS_TOKEN_TTL_SECONDS,
            refresh_token_ttl_seconds: DEFAULT_REFRESH_TOKEN_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_access_token_ttl_seconds(mut self, seconds: u64) -> Self {
        self.access_token_ttl_seconds = seconds.max(1);
        self
    }

    #[must_use]
    pub fn with_refresh_token_ttl_seconds(mut self, seconds: u64) -> Self {
        self.refresh_token_ttl_seconds = seconds.max(1);
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn access_token_ttl_seconds(&self) -> u64 {
        self.access_token_ttl_seconds
    }

    #[must_use]
    pub fn refresh_token_ttl_seconds(&self) -> u64 {
        self.refresh_token_ttl_seconds
    }
}

pub struct AuthState {
    config: AuthConfig,
    gatekeeper: Arc<Gatekeeper>,
    accounts: Arc<dyn AccountRepository>,
    tokens: TokenIssuer,
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("config", &self.config)
            .field("gatekeeper", &self.gatekeeper)
            .finish_non_exhaustive()
    }
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        gatekeeper: Arc<Gatekeeper>,
        accounts: Arc<dyn AccountRepository>,
    ) -> Self {
        let tokens = TokenIssuer::new(
            &config.jwt_secret,
            config.access_token_ttl_seconds,
            &config.refresh_secret,
            config.refresh_token_ttl_seconds,
        );
        Self {
            config,
            gatekeeper,
            accounts,
            tokens,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn gatekeeper(&self) -> &Gatekeeper {
        &self.gatekeeper
    }

    #[must_use]
    pub fn accounts(&self) -> &dyn AccountRepository {
        self.accounts.as_ref()
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }
}
