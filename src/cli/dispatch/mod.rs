//! Command-line argument dispatch.
//!
//! Maps validated CLI arguments to an action, such as starting the API server
//! with its full configuration.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{ARG_DSN, ARG_PORT, ARG_REDIS_URL, auth, email, otp};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;
    let redis_url = matches
        .get_one::<String>(ARG_REDIS_URL)
        .cloned()
        .context("missing required argument: --redis-url")?;

    Ok(Action::Server(Args {
        port,
        dsn,
        redis_url,
        policy: otp::parse(matches),
        smtp: email::parse(matches)?,
        auth: auth::parse(matches)?,
    }))
}
