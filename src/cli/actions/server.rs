use crate::{
    accounts::PgAccounts,
    api::{self, AuthConfig, AuthState},
    email::{EmailSender, LogEmailSender, SmtpConfig, SmtpEmailSender},
    otp::{Gatekeeper, OtpPolicy},
    store::RedisStore,
};
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub redis_url: String,
    pub policy: OtpPolicy,
    pub smtp: Option<SmtpConfig>,
    pub auth: AuthConfig,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database or cache cannot be reached, the mailer
/// cannot be built, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&args.dsn)
        .await
        .context("Failed to connect to database")?;

    let store = RedisStore::connect(&args.redis_url).await?;

    let sender: Arc<dyn EmailSender> = match &args.smtp {
        Some(config) => Arc::new(SmtpEmailSender::new(config)?),
        None => {
            warn!("No SMTP relay configured, OTP emails are only logged");
            Arc::new(LogEmailSender)
        }
    };

    let gatekeeper = Arc::new(Gatekeeper::new(Arc::new(store), sender, args.policy));
    let auth_state = Arc::new(AuthState::new(
        args.auth,
        gatekeeper,
        Arc::new(PgAccounts::new(pool)),
    ));

    api::new(args.port, auth_state).await
}

fn log_startup_args(args: &Args) {
    info!(
        port = args.port,
        dsn = %redact_url(&args.dsn),
        redis_url = %redact_url(&args.redis_url),
        smtp_host = args.smtp.as_ref().map_or("none", |smtp| smtp.host.as_str()),
        frontend_base_url = args.auth.frontend_base_url(),
        "Starting authgate"
    );
}

/// Drop credentials from a connection URL before logging it.
fn redact_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("***"));
            }
            url.to_string()
        }
        Err(_) => "<unparseable>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_url_hides_password() {
        assert_eq!(
            redact_url("postgres://app:hunter2@db:5432/authgate"),
            "postgres://app:***@db:5432/authgate"
        );
        assert_eq!(redact_url("redis://cache:6379"), "redis://cache:6379");
        assert_eq!(redact_url("not a url"), "<unparseable>");
    }
}
