//! Outbound email abstractions.
//!
//! OTP issuance hands an `EmailMessage` to an `EmailSender`. The sender decides
//! how to deliver (SMTP in production, a log line in local dev) and returns
//! `Ok`/`Err`; the gatekeeper treats an `Err` as a soft failure.
//!
//! The default sender for local dev is `LogEmailSender`, which logs and returns `Ok(())`.

mod smtp;
mod templates;

pub use self::smtp::{SmtpConfig, SmtpEmailSender};
pub use self::templates::EmailTemplate;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

#[derive(Clone, Debug)]
pub struct EmailMessage {
    pub to_email: String,
    pub subject: String,
    pub template: EmailTemplate,
    pub data: serde_json::Value,
}

/// Email delivery abstraction used by OTP issuance.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Deliver a message or return an error describing why it was not sent.
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Local dev sender that logs the payload instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to_email = %message.to_email,
            template = message.template.id(),
            payload = %message.data,
            "email send stub"
        );
        Ok(())
    }
}
