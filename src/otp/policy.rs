use std::time::Duration;

const DEFAULT_OTP_TTL_SECONDS: u64 = 5 * 60;
const DEFAULT_COOLDOWN_SECONDS: u64 = 60;
const DEFAULT_REQUEST_WINDOW_SECONDS: u64 = 60 * 60;
const DEFAULT_REQUEST_LIMIT: u64 = 2;
const DEFAULT_SPAM_LOCK_SECONDS: u64 = 60 * 60;
const DEFAULT_ATTEMPT_WINDOW_SECONDS: u64 = 5 * 60;
const DEFAULT_ATTEMPT_LIMIT: u64 = 2;
const DEFAULT_LOCK_SECONDS: u64 = 30 * 60;
const DEFAULT_RESET_GRANT_SECONDS: u64 = 5 * 60;
const DEFAULT_STORE_TIMEOUT_MILLIS: u64 = 2_000;

/// Windows and thresholds applied by the gatekeeper.
///
/// Limits count the requests/failures that are *allowed*: with the default
/// of 2, the third request trips the spam lock and the third wrong code trips
/// the lockout.
#[derive(Clone, Debug)]
pub struct OtpPolicy {
    otp_ttl: Duration,
    cooldown: Duration,
    request_window: Duration,
    request_limit: u64,
    spam_lock: Duration,
    attempt_window: Duration,
    attempt_limit: u64,
    lock: Duration,
    reset_grant_ttl: Duration,
    store_timeout: Duration,
    key_prefix: String,
}

impl OtpPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self {
            otp_ttl: Duration::from_secs(DEFAULT_OTP_TTL_SECONDS),
            cooldown: Duration::from_secs(DEFAULT_COOLDOWN_SECONDS),
            request_window: Duration::from_secs(DEFAULT_REQUEST_WINDOW_SECONDS),
            request_limit: DEFAULT_REQUEST_LIMIT,
            spam_lock: Duration::from_secs(DEFAULT_SPAM_LOCK_SECONDS),
            attempt_window: Duration::from_secs(DEFAULT_ATTEMPT_WINDOW_SECONDS),
            attempt_limit: DEFAULT_ATTEMPT_LIMIT,
            lock: Duration::from_secs(DEFAULT_LOCK_SECONDS),
            reset_grant_ttl: Duration::from_secs(DEFAULT_RESET_GRANT_SECONDS),
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MILLIS),
            key_prefix: String::new(),
        }
    }

    #[must_use]
    pub fn with_otp_ttl_seconds(mut self, seconds: u64) -> Self {
        self.otp_ttl = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_cooldown_seconds(mut self, seconds: u64) -> Self {
        self.cooldown = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_request_window_seconds(mut self, seconds: u64) -> Self {
        self.request_window = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_request_limit(mut self, limit: u64) -> Self {
        self.request_limit = limit;
        self
    }

    #[must_use]
    pub fn with_spam_lock_seconds(mut self, seconds: u64) -> Self {
        self.spam_lock = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_attempt_window_seconds(mut self, seconds: u64) -> Self {
        self.attempt_window = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_attempt_limit(mut self, limit: u64) -> Self {
        self.attempt_limit = limit;
        self
    }

    #[must_use]
    pub fn with_lock_seconds(mut self, seconds: u64) -> Self {
        self.lock = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_reset_grant_seconds(mut self, seconds: u64) -> Self {
        self.reset_grant_ttl = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_store_timeout_millis(mut self, millis: u64) -> Self {
        self.store_timeout = Duration::from_millis(millis);
        self
    }

    #[must_use]
    pub fn with_key_prefix(mut self, prefix: String) -> Self {
        self.key_prefix = prefix;
        self
    }

    /// Replace zero durations so no key is ever written without expiry and
    /// no cache call runs without a deadline.
    #[must_use]
    pub fn normalize(self) -> Self {
        let non_zero = |value: Duration| {
            if value.is_zero() {
                Duration::from_secs(1)
            } else {
                value
            }
        };
        Self {
            otp_ttl: non_zero(self.otp_ttl),
            cooldown: non_zero(self.cooldown),
            request_window: non_zero(self.request_window),
            spam_lock: non_zero(self.spam_lock),
            attempt_window: non_zero(self.attempt_window),
            lock: non_zero(self.lock),
            reset_grant_ttl: non_zero(self.reset_grant_ttl),
            store_timeout: non_zero(self.store_timeout),
            ..self
        }
    }

    #[must_use]
    pub fn otp_ttl(&self) -> Duration {
        self.otp_ttl
    }

    #[must_use]
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    #[must_use]
    pub fn request_window(&self) -> Duration {
        self.request_window
    }

    #[must_use]
    pub fn request_limit(&self) -> u64 {
        self.request_limit
    }

    #[must_use]
    pub fn spam_lock(&self) -> Duration {
        self.spam_lock
    }

    #[must_use]
    pub fn attempt_window(&self) -> Duration {
        self.attempt_window
    }

    #[must_use]
    pub fn attempt_limit(&self) -> u64 {
        self.attempt_limit
    }

    #[must_use]
    pub fn lock(&self) -> Duration {
        self.lock
    }

    #[must_use]
    pub fn reset_grant_ttl(&self) -> Duration {
        self.reset_grant_ttl
    }

    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    #[must_use]
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_windows() {
        let policy = OtpPolicy::new();
        assert_eq!(policy.otp_ttl(), Duration::from_secs(300));
        assert_eq!(policy.cooldown(), Duration::from_secs(60));
        assert_eq!(policy.request_window(), Duration::from_secs(3600));
        assert_eq!(policy.request_limit(), 2);
        assert_eq!(policy.spam_lock(), Duration::from_secs(3600));
        assert_eq!(policy.attempt_window(), Duration::from_secs(300));
        assert_eq!(policy.attempt_limit(), 2);
        assert_eq!(policy.lock(), Duration::from_secs(1800));
        assert_eq!(policy.key_prefix(), "");
    }

    #[test]
    fn normalize_replaces_zero_durations() {
        let policy = OtpPolicy::new()
            .with_cooldown_seconds(0)
            .with_store_timeout_millis(0)
            .with_request_limit(0)
            .normalize();
        assert_eq!(policy.cooldown(), Duration::from_secs(1));
        assert_eq!(policy.store_timeout(), Duration::from_secs(1));
        // A zero limit is a valid (locked down) configuration.
        assert_eq!(policy.request_limit(), 0);
    }

    #[test]
    fn builders_override_defaults() {
        let policy = OtpPolicy::new()
            .with_otp_ttl_seconds(120)
            .with_attempt_limit(4)
            .with_key_prefix("shop:".to_string());
        assert_eq!(policy.otp_ttl(), Duration::from_secs(120));
        assert_eq!(policy.attempt_limit(), 4);
        assert_eq!(policy.key_prefix(), "shop:");
    }
}
