use crate::store::StoreError;
use std::time::Duration;

/// Every way an OTP request or verification can be turned down.
///
/// Rate-limit and OTP rejections are final for the request. Dependency
/// errors mean the cache could not answer; they are never retried here.
#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    #[error("Account locked due to multiple failed attempts! Try again after {}", human(.wait))]
    Locked { wait: Duration },
    #[error("Too many OTP requests! Please wait {} before requesting again", human(.wait))]
    Spam { wait: Duration },
    #[error("Please wait {} before requesting a new OTP!", human(.wait))]
    Cooldown { wait: Duration },
    #[error("OTP not found or expired! Please request a new one")]
    NotFound,
    #[error("Incorrect OTP. {remaining} {} left!", attempt_noun(.remaining))]
    Mismatch { remaining: u64 },
    #[error("Too many failed OTP attempts! Your account is locked for {}", human(.wait))]
    ExhaustedLocked { wait: Duration },
    #[error("cache did not answer within {timeout:?} ({operation})")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },
    #[error("cache error ({operation}): {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: StoreError,
    },
}

impl OtpError {
    /// The cache failed rather than the caller.
    #[must_use]
    pub fn is_dependency(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Store { .. })
    }

    /// Stable machine-readable kind for responses and logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Locked { .. } => "rate_limited.locked",
            Self::Spam { .. } => "rate_limited.spam",
            Self::Cooldown { .. } => "rate_limited.cooldown",
            Self::NotFound => "otp.not_found",
            Self::Mismatch { .. } => "otp.mismatch",
            Self::ExhaustedLocked { .. } => "otp.exhausted_locked",
            Self::Timeout { .. } => "dependency.timeout",
            Self::Store { .. } => "dependency.store",
        }
    }
}

/// Largest whole unit: `3600s` is "1 hour", `90s` is "90 seconds".
fn human(wait: &Duration) -> String {
    let secs = wait.as_secs();
    let (count, unit) = if secs >= 3600 && secs % 3600 == 0 {
        (secs / 3600, "hour")
    } else if secs >= 60 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };
    if count == 1 {
        format!("1 {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

fn attempt_noun(remaining: &u64) -> &'static str {
    if *remaining == 1 {
        "attempt"
    } else {
        "attempts"
    }
}
