//! Outbound mail relay: SMTP via lettre.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::{ExposeSecret, SecretString};

use crate::error::MailError;

/// Delivers a single HTML message.
#[async_trait]
pub trait MailRelay: Send + Sync {
    async fn send_html(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError>;
}

/// SMTP relay configuration.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_address: String,
}

/// SMTP relay backed by a lettre transport (STARTTLS/TLS per `SmtpTransport::relay`).
pub struct SmtpRelay {
    from: Mailbox,
    transport: SmtpTransport,
}

impl SmtpRelay {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let from = parse_mailbox("from", &config.from_address)?;

        let creds = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );
        let transport = SmtpTransport::relay(&config.smtp_host)
            .map_err(|e| MailError::Relay(format!("{}: {e}", config.smtp_host)))?
            .port(config.smtp_port)
            .credentials(creds)
            .build();

        Ok(Self { from, transport })
    }

    pub fn from_mailbox(&self) -> &Mailbox {
        &self.from
    }
}

#[async_trait]
impl MailRelay for SmtpRelay {
    async fn send_html(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError> {
        let to = parse_mailbox("to", to)?;
        let message = build_message(self.from.clone(), to.clone(), subject, html)?;

        // lettre's SmtpTransport is blocking.
        let transport = self.transport.clone();
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| MailError::Relay(format!("send task failed: {e}")))?
            .map_err(|e| MailError::Relay(e.to_string()))?;

        tracing::info!(to = %to, "Email sent");
        Ok(())
    }
}

/// Parse a recipient or sender address.
pub fn parse_mailbox(field: &'static str, address: &str) -> Result<Mailbox, MailError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|e| MailError::InvalidAddress {
            field,
            reason: e.to_string(),
        })
}

/// Build an HTML message.
pub fn build_message(
    from: Mailbox,
    to: Mailbox,
    subject: &str,
    html: &str,
) -> Result<Message, MailError> {
    Message::builder()
        .from(from)
        .to(to)
        .subject(subject)
        .header(ContentType::TEXT_HTML)
        .body(html.to_string())
        .map_err(|e| MailError::Build(e.to_string()))
}
