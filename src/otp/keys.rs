//! Cache key layout, one family per identifier.

/// Trim and lowercase so every spelling of an address shares one set of keys.
#[must_use]
pub fn normalize_identifier(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

#[derive(Clone, Debug, Default)]
pub struct OtpKeys {
    prefix: String,
}

impl OtpKeys {
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }

    fn key(&self, family: &str, id: &str) -> String {
        format!("{}{family}:{id}", self.prefix)
    }

    #[must_use]
    pub fn otp(&self, id: &str) -> String {
        self.key("otp", id)
    }

    #[must_use]
    pub fn cooldown(&self, id: &str) -> String {
        self.key("otp_cooldown", id)
    }

    #[must_use]
    pub fn request_count(&self, id: &str) -> String {
        self.key("otp_request_count", id)
    }

    #[must_use]
    pub fn spam_lock(&self, id: &str) -> String {
        self.key("otp_spam_lock", id)
    }

    #[must_use]
    pub fn attempts(&self, id: &str) -> String {
        self.key("otp_attempts", id)
    }

    #[must_use]
    pub fn lock(&self, id: &str) -> String {
        self.key("otp_lock", id)
    }

    #[must_use]
    pub fn reset_grant(&self, id: &str) -> String {
        self.key("otp_reset_grant", id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_identifier("  A@X.com "), "a@x.com");
    }

    #[test]
    fn key_families() {
        let keys = OtpKeys::default();
        assert_eq!(keys.otp("a@x.com"), "otp:a@x.com");
        assert_eq!(keys.cooldown("a@x.com"), "otp_cooldown:a@x.com");
        assert_eq!(keys.request_count("a@x.com"), "otp_request_count:a@x.com");
        assert_eq!(keys.spam_lock("a@x.com"), "otp_spam_lock:a@x.com");
        assert_eq!(keys.attempts("a@x.com"), "otp_attempts:a@x.com");
        assert_eq!(keys.lock("a@x.com"), "otp_lock:a@x.com");
        assert_eq!(keys.reset_grant("a@x.com"), "otp_reset_grant:a@x.com");
    }

    #[test]
    fn prefix_is_prepended() {
        let keys = OtpKeys::new("shop:");
        assert_eq!(keys.lock("a@x.com"), "shop:otp_lock:a@x.com");
    }
}
