//! OTP gatekeeper: issuance, verification and the rate limits around them.
//!
//! Flow Overview:
//! 1) `check_restrictions` refuses while a lockout, spam lock or cooldown is live
//!    (checked in that order, first hit wins, read-only).
//! 2) `track_request` counts issuances per hour; the request past the limit sets
//!    the spam lock instead of counting.
//! 3) `send_otp` mails a fresh 4-digit code, then stores it with the cooldown flag.
//! 4) `verify` consumes the code; wrong codes count toward a lockout that also
//!    discards the pending code.
//!
//! Per identifier: `NONE -> ISSUED -> {VERIFIED | ATTEMPT_1 -> ATTEMPT_2 -> LOCKED}`.
//! `LOCKED` only ends when the lock key expires.
//!
//! Counter updates go through `OtpStore::increment_below`, so the read and the
//! write are one atomic step even with several instances behind a balancer.

mod error;
mod keys;
mod policy;

pub use self::error::OtpError;
pub use self::keys::{OtpKeys, normalize_identifier};
pub use self::policy::OtpPolicy;

use crate::email::{EmailMessage, EmailSender, EmailTemplate};
use crate::store::{OtpStore, StoreError};
use rand::{Rng, rngs::OsRng};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, instrument, warn};

const CODE_RANGE: std::ops::Range<u32> = 1000..9999;
const FLAG: &str = "locked";

/// Outcome of a successful issuance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IssueReceipt {
    /// `false` when the mailer failed. The code and cooldown are stored anyway,
    /// so the caller cannot request another code until the cooldown passes.
    pub delivered: bool,
}

pub struct Gatekeeper {
    store: Arc<dyn OtpStore>,
    sender: Arc<dyn EmailSender>,
    policy: OtpPolicy,
    keys: OtpKeys,
}

impl std::fmt::Debug for Gatekeeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gatekeeper")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Gatekeeper {
    #[must_use]
    pub fn new(store: Arc<dyn OtpStore>, sender: Arc<dyn EmailSender>, policy: OtpPolicy) -> Self {
        let policy = policy.normalize();
        let keys = OtpKeys::new(policy.key_prefix());
        Self {
            store,
            sender,
            policy,
            keys,
        }
    }

    #[must_use]
    pub fn policy(&self) -> &OtpPolicy {
        &self.policy
    }

    /// Refuse issuance while a lockout, spam lock or cooldown is live.
    ///
    /// # Errors
    /// `Locked`, `Spam` or `Cooldown` for the first live flag, or a dependency error.
    #[instrument(skip(self))]
    pub async fn check_restrictions(&self, identifier: &str) -> Result<(), OtpError> {
        let id = normalize_identifier(identifier);

        if self.flag_set("check_lock", self.keys.lock(&id)).await? {
            return Err(OtpError::Locked {
                wait: self.policy.lock(),
            });
        }
        if self.flag_set("check_spam_lock", self.keys.spam_lock(&id)).await? {
            return Err(OtpError::Spam {
                wait: self.policy.spam_lock(),
            });
        }
        if self.flag_set("check_cooldown", self.keys.cooldown(&id)).await? {
            return Err(OtpError::Cooldown {
                wait: self.policy.cooldown(),
            });
        }

        Ok(())
    }

    /// Count an issuance request in the hourly window.
    ///
    /// # Errors
    /// `Spam` once the window already holds `request_limit` requests; the spam
    /// lock is set and the counter stays where it is.
    #[instrument(skip(self))]
    pub async fn track_request(&self, identifier: &str) -> Result<(), OtpError> {
        let id = normalize_identifier(identifier);
        let count_key = self.keys.request_count(&id);

        let counted = self
            .guard(
                "track_request",
                self.store.increment_below(
                    &count_key,
                    self.policy.request_limit(),
                    self.policy.request_window(),
                ),
            )
            .await?;

        if counted.is_none() {
            let lock_key = self.keys.spam_lock(&id);
            self.guard(
                "set_spam_lock",
                self.store.set(&lock_key, FLAG, self.policy.spam_lock()),
            )
            .await?;
            warn!(identifier = %id, "OTP spam lock set");
            return Err(OtpError::Spam {
                wait: self.policy.spam_lock(),
            });
        }

        Ok(())
    }

    /// Generate a code, mail it and store it together with the cooldown flag.
    ///
    /// Callers must run `check_restrictions` and `track_request` first;
    /// `request_otp` does all three.
    ///
    /// # Errors
    /// Only dependency errors; a failed delivery is reported in the receipt.
    #[instrument(skip(self, name))]
    pub async fn send_otp(
        &self,
        identifier: &str,
        name: &str,
        template: EmailTemplate,
    ) -> Result<IssueReceipt, OtpError> {
        let id = normalize_identifier(identifier);
        let code = generate_code();

        let message = EmailMessage {
            to_email: id.clone(),
            subject: template.subject().to_string(),
            template,
            data: json!({
                "name": name,
                "otp": code,
                "expires_minutes": self.policy.otp_ttl().as_secs().div_ceil(60),
            }),
        };
        let delivered = match self.sender.send(&message).await {
            Ok(()) => true,
            Err(err) => {
                warn!(identifier = %id, template = template.id(), "Failed to send OTP email: {err:#}");
                false
            }
        };

        let otp_key = self.keys.otp(&id);
        self.guard(
            "store_otp",
            self.store.set(&otp_key, &code, self.policy.otp_ttl()),
        )
        .await?;

        let cooldown_key = self.keys.cooldown(&id);
        self.guard(
            "set_cooldown",
            self.store.set(&cooldown_key, FLAG, self.policy.cooldown()),
        )
        .await?;

        info!(identifier = %id, template = template.id(), delivered, "OTP issued");
        Ok(IssueReceipt { delivered })
    }

    /// Full issuance: restrictions, request tracking, then `send_otp`.
    ///
    /// # Errors
    /// Any rejection from the restriction check or request tracking, or a
    /// dependency error.
    pub async fn request_otp(
        &self,
        identifier: &str,
        name: &str,
        template: EmailTemplate,
    ) -> Result<IssueReceipt, OtpError> {
        self.check_restrictions(identifier).await?;
        self.track_request(identifier).await?;
        self.send_otp(identifier, name, template).await
    }

    /// Check a candidate code against the stored one.
    ///
    /// On success the code and failed-attempt counter are deleted. On the
    /// failure past `attempt_limit` the identifier is locked and both keys are
    /// deleted.
    ///
    /// # Errors
    /// `NotFound`, `Mismatch { remaining }`, `ExhaustedLocked`, or a dependency error.
    #[instrument(skip(self, candidate))]
    pub async fn verify(&self, identifier: &str, candidate: &str) -> Result<(), OtpError> {
        let id = normalize_identifier(identifier);
        let otp_key = self.keys.otp(&id);
        let attempts_key = self.keys.attempts(&id);

        let Some(stored) = self.guard("load_otp", self.store.get(&otp_key)).await? else {
            return Err(OtpError::NotFound);
        };

        if stored == candidate.trim() {
            self.guard(
                "clear_otp",
                self.store.delete(&[otp_key, attempts_key]),
            )
            .await?;
            info!(identifier = %id, "OTP verified");
            return Ok(());
        }

        let limit = self.policy.attempt_limit();
        let counted = self
            .guard(
                "count_attempt",
                self.store
                    .increment_below(&attempts_key, limit, self.policy.attempt_window()),
            )
            .await?;

        match counted {
            Some(count) => {
                let remaining = limit.saturating_sub(count.saturating_sub(1));
                info!(identifier = %id, remaining, "OTP mismatch");
                Err(OtpError::Mismatch { remaining })
            }
            None => {
                let lock_key = self.keys.lock(&id);
                self.guard("set_lock", self.store.set(&lock_key, FLAG, self.policy.lock()))
                    .await?;
                self.guard(
                    "clear_otp",
                    self.store.delete(&[otp_key, attempts_key]),
                )
                .await?;
                warn!(identifier = %id, "OTP lockout set");
                Err(OtpError::ExhaustedLocked {
                    wait: self.policy.lock(),
                })
            }
        }
    }

    /// Record that a password-reset OTP was verified.
    ///
    /// # Errors
    /// Dependency errors only.
    #[instrument(skip(self))]
    pub async fn grant_reset(&self, identifier: &str) -> Result<(), OtpError> {
        let id = normalize_identifier(identifier);
        let key = self.keys.reset_grant(&id);
        self.guard(
            "grant_reset",
            self.store.set(&key, FLAG, self.policy.reset_grant_ttl()),
        )
        .await
    }

    /// Whether a password reset is currently allowed for the identifier.
    ///
    /// # Errors
    /// Dependency errors only.
    pub async fn reset_granted(&self, identifier: &str) -> Result<bool, OtpError> {
        let id = normalize_identifier(identifier);
        self.flag_set("check_reset_grant", self.keys.reset_grant(&id))
            .await
    }

    /// Use up a reset grant. Returns `false` if there was none.
    ///
    /// # Errors
    /// Dependency errors only.
    #[instrument(skip(self))]
    pub async fn consume_reset_grant(&self, identifier: &str) -> Result<bool, OtpError> {
        let id = normalize_identifier(identifier);
        let key = self.keys.reset_grant(&id);
        if !self.flag_set("check_reset_grant", key.clone()).await? {
            return Ok(false);
        }
        self.guard("consume_reset_grant", self.store.delete(&[key]))
            .await?;
        Ok(true)
    }

    /// Cache round trip for health checks.
    ///
    /// # Errors
    /// Dependency errors only.
    pub async fn ping(&self) -> Result<(), OtpError> {
        self.guard("ping", self.store.ping()).await
    }

    async fn flag_set(&self, operation: &'static str, key: String) -> Result<bool, OtpError> {
        let value = self.guard(operation, self.store.get(&key)).await?;
        Ok(value.is_some())
    }

    /// Run one cache call under the per-call deadline.
    async fn guard<T, F>(&self, operation: &'static str, call: F) -> Result<T, OtpError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let timeout = self.policy.store_timeout();
        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(OtpError::Store { operation, source }),
            Err(_) => Err(OtpError::Timeout { operation, timeout }),
        }
    }
}

/// Uniform 4-digit code in `[1000, 9999)`.
fn generate_code() -> String {
    OsRng.gen_range(CODE_RANGE).to_string()
}

#[cfg(test)]
mod tests;
