//! Outbound mail arguments. Without `--smtp-host` OTP mail is only logged.

use crate::email::SmtpConfig;
use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_SMTP_HOST: &str = "smtp-host";
pub const ARG_SMTP_PORT: &str = "smtp-port";
pub const ARG_SMTP_USERNAME: &str = "smtp-username";
pub const ARG_SMTP_PASSWORD: &str = "smtp-password";
pub const ARG_SMTP_FROM: &str = "smtp-from";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SMTP_HOST)
                .long(ARG_SMTP_HOST)
                .help("SMTP relay host; OTP emails are only logged when unset")
                .env("AUTHGATE_SMTP_HOST"),
        )
        .arg(
            Arg::new(ARG_SMTP_PORT)
                .long(ARG_SMTP_PORT)
                .help("SMTP relay port (STARTTLS)")
                .env("AUTHGATE_SMTP_PORT")
                .default_value("587")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_SMTP_USERNAME)
                .long(ARG_SMTP_USERNAME)
                .help("SMTP username")
                .env("AUTHGATE_SMTP_USERNAME"),
        )
        .arg(
            Arg::new(ARG_SMTP_PASSWORD)
                .long(ARG_SMTP_PASSWORD)
                .help("SMTP password")
                .env("AUTHGATE_SMTP_PASSWORD")
                .hide_env_values(true)
                .requires(ARG_SMTP_USERNAME),
        )
        .arg(
            Arg::new(ARG_SMTP_FROM)
                .long(ARG_SMTP_FROM)
                .help("Sender address for OTP emails")
                .env("AUTHGATE_SMTP_FROM")
                .default_value("Authgate <no-reply@authgate.dev>"),
        )
}

/// SMTP settings, or `None` when no relay host is configured.
///
/// # Errors
/// Returns an error if a relay host is set without a port.
pub fn parse(matches: &ArgMatches) -> Result<Option<SmtpConfig>> {
    let Some(host) = matches.get_one::<String>(ARG_SMTP_HOST).cloned() else {
        return Ok(None);
    };
    let port = matches
        .get_one::<u16>(ARG_SMTP_PORT)
        .copied()
        .context("missing required argument: --smtp-port")?;

    Ok(Some(SmtpConfig {
        host,
        port,
        username: matches.get_one::<String>(ARG_SMTP_USERNAME).cloned(),
        password: SecretString::from(
            matches
                .get_one::<String>(ARG_SMTP_PASSWORD)
                .cloned()
                .unwrap_or_default(),
        ),
        from: matches
            .get_one::<String>(ARG_SMTP_FROM)
            .cloned()
            .unwrap_or_default(),
    }))
}
