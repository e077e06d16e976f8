//! SMTP delivery of rendered notification emails via `lettre`.
//!
//! One transport is built at startup and shared across the services. When no
//! relay is configured the log-only mailer stands in, so development setups
//! never need a mail server.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use crate::domain::notifications::EmailMessage;
use crate::domain::ports::{Mailer, MailerError};

/// Connection settings for the SMTP relay.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// Relay host name.
    pub host: String,
    /// Relay port.
    pub port: u16,
    /// Credentials, absent for unauthenticated relays.
    pub credentials: Option<(String, String)>,
    /// Whether to negotiate STARTTLS. Plaintext is for local relays only.
    pub starttls: bool,
    /// Sender address for every outbound message.
    pub from: String,
}

fn transport_error(message: impl std::fmt::Display) -> MailerError {
    MailerError::transport(message.to_string())
}

/// Mailer delivering over an async SMTP transport.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl std::fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("from", &self.from)
            .finish_non_exhaustive()
    }
}

impl SmtpMailer {
    /// Build a transport from the given relay settings.
    pub fn new(config: &SmtpConfig) -> Result<Self, MailerError> {
        let from = config.from.parse::<Mailbox>().map_err(transport_error)?;

        let mut builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(transport_error)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };
        builder = builder.port(config.port);
        if let Some((username, password)) = &config.credentials {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailerError> {
        let to = message.to.as_ref().parse::<Mailbox>().map_err(transport_error)?;
        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&message.subject)
            .header(ContentType::TEXT_HTML)
            .body(message.html.clone())
            .map_err(transport_error)?;

        self.transport.send(email).await.map_err(transport_error)?;
        Ok(())
    }
}

/// Mailer that records deliveries in the log instead of sending them.
///
/// Stands in when no SMTP relay is configured; the emailed secrets stay out
/// of the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOnlyMailer;

#[async_trait]
impl Mailer for LogOnlyMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailerError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            "email delivery skipped: no SMTP relay configured"
        );
        Ok(())
    }
}
