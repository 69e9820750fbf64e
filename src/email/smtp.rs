use super::{EmailMessage, EmailSender};
use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::{Instrument, debug, info_span};

#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: SecretString,
    pub from: String,
}

/// Delivers OTP mail through an SMTP relay using STARTTLS.
pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailSender {
    /// Build the relay transport.
    ///
    /// # Errors
    /// Returns an error if the relay host or sender address is invalid.
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .with_context(|| format!("Invalid SMTP relay host: {}", config.host))?
            .port(config.port);

        if let Some(username) = &config.username {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                config.password.expose_secret().to_string(),
            ));
        }

        let from = config
            .from
            .parse::<Mailbox>()
            .with_context(|| format!("Invalid sender address: {}", config.from))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let to = message
            .to_email
            .parse::<Mailbox>()
            .context("Invalid recipient address")?;

        let body = message
            .template
            .render(&message.data)
            .context("Failed to render email template")?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(body)
            .context("Failed to build email")?;

        let span = info_span!("smtp.send", template = message.template.id());
        self.transport
            .send(email)
            .instrument(span)
            .await
            .context("SMTP relay rejected the message")?;

        debug!(to_email = %message.to_email, "email delivered");
        Ok(())
    }
}
