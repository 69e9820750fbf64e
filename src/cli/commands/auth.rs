use crate::api::AuthConfig;
use anyhow::{Context, Result, bail};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_REFRESH_TOKEN_SECRET: &str = "refresh-token-secret";
pub const ARG_ACCESS_TOKEN_TTL_SECONDS: &str = "access-token-ttl-seconds";
pub const ARG_REFRESH_TOKEN_TTL_SECONDS: &str = "refresh-token-ttl-seconds";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend base URL allowed by CORS")
                .env("AUTHGATE_FRONTEND_BASE_URL")
                .default_value("http://localhost:3000"),
        )
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("Secret used to sign access tokens")
                .env("AUTHGATE_JWT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_REFRESH_TOKEN_SECRET)
                .long(ARG_REFRESH_TOKEN_SECRET)
                .help("Secret used to sign refresh tokens, distinct from --jwt-secret")
                .env("AUTHGATE_REFRESH_TOKEN_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_TTL_SECONDS)
                .long(ARG_ACCESS_TOKEN_TTL_SECONDS)
                .help("Access token lifetime in seconds")
                .env("AUTHGATE_ACCESS_TOKEN_TTL_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_REFRESH_TOKEN_TTL_SECONDS)
                .long(ARG_REFRESH_TOKEN_TTL_SECONDS)
                .help("Refresh token lifetime in seconds")
                .env("AUTHGATE_REFRESH_TOKEN_TTL_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(u64)),
        )
}

/// Build the auth configuration from parsed arguments.
///
/// # Errors
/// Returns an error if a signing secret is missing or empty, or if both
/// secrets are the same.
pub fn parse(matches: &ArgMatches) -> Result<AuthConfig> {
    let secret = matches
        .get_one::<String>(ARG_JWT_SECRET)
        .filter(|secret| !secret.trim().is_empty())
        .cloned()
        .context("missing required argument: --jwt-secret")?;
    let refresh_secret = matches
        .get_one::<String>(ARG_REFRESH_TOKEN_SECRET)
        .filter(|secret| !secret.trim().is_empty())
        .cloned()
        .context("missing required argument: --refresh-token-secret")?;
    if refresh_secret == secret {
        bail!("--refresh-token-secret must differ from --jwt-secret");
    }
    let frontend_base_url = matches
        .get_one::<String>(ARG_FRONTEND_BASE_URL)
        .cloned()
        .unwrap_or_else(|| "http://localhost:3000".to_string());
    let ttl = matches
        .get_one::<u64>(ARG_ACCESS_TOKEN_TTL_SECONDS)
        .copied()
        .unwrap_or(900);
    let refresh_ttl = matches
        .get_one::<u64>(ARG_REFRESH_TOKEN_TTL_SECONDS)
        .copied()
        .unwrap_or(604_800);

    Ok(AuthConfig::new(
        frontend_base_url,
        SecretString::from(secret),
        SecretString::from(refresh_secret),
    )
    .with_access_token_ttl_seconds(ttl)
    .with_refresh_token_ttl_seconds(refresh_ttl))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults() -> Result<()> {
        temp_env::with_vars(
            [
                ("AUTHGATE_JWT_SECRET", Some("s3cret")),
                ("AUTHGATE_REFRESH_TOKEN_SECRET", Some("r3fresh")),
                ("AUTHGATE_FRONTEND_BASE_URL", None),
                ("AUTHGATE_ACCESS_TOKEN_TTL_SECONDS", None),
                ("AUTHGATE_REFRESH_TOKEN_TTL_SECONDS", None),
            ],
            || {
                let matches = with_args(Command::new("authgate")).get_matches_from(["authgate"]);
                let config = parse(&matches)?;
                assert_eq!(config.frontend_base_url(), "http://localhost:3000");
                assert_eq!(config.access_token_ttl_seconds(), 900);
                assert_eq!(config.refresh_token_ttl_seconds(), 604_800);
                Ok(())
            },
        )
    }

    #[test]
    fn blank_secret_is_rejected() {
        temp_env::with_vars(
            [
                ("AUTHGATE_JWT_SECRET", Some("  ")),
                ("AUTHGATE_REFRESH_TOKEN_SECRET", Some("r3fresh")),
            ],
            || {
                let matches =
                    with_args(Command::new("authgate")).get_matches_from(["authgate"]);
                let result = parse(&matches);
                assert!(result.is_err());
                if let Err(err) = result {
                    assert!(err.to_string().contains("--jwt-secret"));
                }
            },
        );
    }

    #[test]
    fn refresh_secret_must_differ() {
        temp_env::with_vars(
            [
                ("AUTHGATE_JWT_SECRET", Some("same")),
                ("AUTHGATE_REFRESH_TOKEN_SECRET", Some("same")),
            ],
            || {
                let matches =
                    with_args(Command::new("authgate")).get_matches_from(["authgate"]);
                let result = parse(&matches);
                assert!(result.is_err());
                if let Err(err) = result {
                    assert!(err.to_string().contains("--refresh-token-secret"));
                }
            },
        );
    }
}
