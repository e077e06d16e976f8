//! Port for outbound email delivery.
//!
//! Delivery is best-effort everywhere it is used: services log a failed send
//! and carry on, so a flaky relay never fails a workflow operation.

use async_trait::async_trait;

use crate::domain::notifications::EmailMessage;

use super::define_port_error;

define_port_error! {
    /// Errors raised by mailer adapters.
    pub enum MailerError {
        /// The transport rejected or failed to deliver the message.
        Transport { message: String } =>
            "mail transport failed: {message}",
    }
}

/// Port for sending rendered emails.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver a rendered message.
    async fn send(&self, message: &EmailMessage) -> Result<(), MailerError>;
}

/// Fixture implementation that records nothing and always succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureMailer;

#[async_trait]
impl Mailer for FixtureMailer {
    async fn send(&self, _message: &EmailMessage) -> Result<(), MailerError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use super::*;
    use crate::domain::user::Email;

    #[tokio::test]
    async fn fixture_send_succeeds() {
        let mailer = FixtureMailer;
        let message = EmailMessage {
            to: Email::new("someone@example.com").expect("valid email"),
            subject: "hello".to_owned(),
            html: "<p>hi</p>".to_owned(),
        };
        mailer.send(&message).await.expect("fixture send succeeds");
    }

    #[test]
    fn transport_error_formats_message() {
        let err = MailerError::transport("connection reset");
        assert!(err.to_string().contains("connection reset"));
    }
}
