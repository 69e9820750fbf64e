//! OTP policy arguments. Defaults match `OtpPolicy::default()`.

use crate::otp::OtpPolicy;
use clap::{Arg, ArgMatches, Command};

const U64_ARGS: [(&str, &str, &str, &str); 10] = [
    (
        "otp-ttl-seconds",
        "AUTHGATE_OTP_TTL_SECONDS",
        "300",
        "How long an issued OTP stays valid",
    ),
    (
        "otp-cooldown-seconds",
        "AUTHGATE_OTP_COOLDOWN_SECONDS",
        "60",
        "Minimum time between two OTPs for the same email",
    ),
    (
        "otp-request-window-seconds",
        "AUTHGATE_OTP_REQUEST_WINDOW_SECONDS",
        "3600",
        "Window in which OTP requests are counted",
    ),
    (
        "otp-request-limit",
        "AUTHGATE_OTP_REQUEST_LIMIT",
        "2",
        "Requests allowed per window; the next one sets the spam lock",
    ),
    (
        "otp-spam-lock-seconds",
        "AUTHGATE_OTP_SPAM_LOCK_SECONDS",
        "3600",
        "How long issuance stays blocked after a spam lock",
    ),
    (
        "otp-attempt-window-seconds",
        "AUTHGATE_OTP_ATTEMPT_WINDOW_SECONDS",
        "300",
        "Window in which wrong codes are counted",
    ),
    (
        "otp-attempt-limit",
        "AUTHGATE_OTP_ATTEMPT_LIMIT",
        "2",
        "Wrong codes tolerated; the next one locks the email",
    ),
    (
        "otp-lock-seconds",
        "AUTHGATE_OTP_LOCK_SECONDS",
        "1800",
        "Lockout duration after too many wrong codes",
    ),
    (
        "otp-reset-grant-seconds",
        "AUTHGATE_OTP_RESET_GRANT_SECONDS",
        "300",
        "How long a verified forgot-password OTP allows a reset",
    ),
    (
        "otp-store-timeout-ms",
        "AUTHGATE_OTP_STORE_TIMEOUT_MS",
        "2000",
        "Deadline for each cache call in milliseconds",
    ),
];

pub const ARG_OTP_KEY_PREFIX: &str = "otp-key-prefix";

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = U64_ARGS
        .iter()
        .fold(command, |command, (name, env, default, help)| {
            command.arg(
                Arg::new(*name)
                    .long(*name)
                    .help(*help)
                    .env(*env)
                    .default_value(*default)
                    .value_parser(clap::value_parser!(u64)),
            )
        });

    command.arg(
        Arg::new(ARG_OTP_KEY_PREFIX)
            .long(ARG_OTP_KEY_PREFIX)
            .help("Prefix for every OTP cache key, e.g. 'authgate:'")
            .env("AUTHGATE_OTP_KEY_PREFIX")
            .default_value(""),
    )
}

fn u64_arg(matches: &ArgMatches, name: &str, default: u64) -> u64 {
    matches.get_one::<u64>(name).copied().unwrap_or(default)
}

/// Build the OTP policy from parsed arguments.
#[must_use]
pub fn parse(matches: &ArgMatches) -> OtpPolicy {
    OtpPolicy::new()
        .with_otp_ttl_seconds(u64_arg(matches, "otp-ttl-seconds", 300))
        .with_cooldown_seconds(u64_arg(matches, "otp-cooldown-seconds", 60))
        .with_request_window_seconds(u64_arg(matches, "otp-request-window-seconds", 3600))
        .with_request_limit(u64_arg(matches, "otp-request-limit", 2))
        .with_spam_lock_seconds(u64_arg(matches, "otp-spam-lock-seconds", 3600))
        .with_attempt_window_seconds(u64_arg(matches, "otp-attempt-window-seconds", 300))
        .with_attempt_limit(u64_arg(matches, "otp-attempt-limit", 2))
        .with_lock_seconds(u64_arg(matches, "otp-lock-seconds", 1800))
        .with_reset_grant_seconds(u64_arg(matches, "otp-reset-grant-seconds", 300))
        .with_store_timeout_millis(u64_arg(matches, "otp-store-timeout-ms", 2000))
        .with_key_prefix(
            matches
                .get_one::<String>(ARG_OTP_KEY_PREFIX)
                .cloned()
                .unwrap_or_default(),
        )
}
