//! Outgoing mail over SMTP, or to the log when no SMTP host is configured

use std::sync::Arc;

use async_trait::async_trait;
use dreamx_common::MailConfig;
use dreamx_core::{IntegrationError, IntegrationResult, Mailer, OutgoingEmail};
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig, host: &str) -> IntegrationResult<Self> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| IntegrationError::Decode(format!("MAIL_FROM: {e}")))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| IntegrationError::Http(e.to_string()))?
            .port(config.port);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, email: &OutgoingEmail) -> IntegrationResult<Message> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| IntegrationError::Decode(format!("recipient: {e}")))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .map_err(|e| IntegrationError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    #[tracing::instrument(skip(self, email), fields(to = %email.to))]
    async fn send(&self, email: &OutgoingEmail) -> IntegrationResult<()> {
        let message = self.build_message(email)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| IntegrationError::Http(e.to_string()))?;

        tracing::info!(subject = %email.subject, "Email sent");
        Ok(())
    }
}

/// Writes mail to the log instead of sending it (development)
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> IntegrationResult<()> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            body = %email.body,
            "Email (not sent, SMTP_HOST unset)"
        );
        Ok(())
    }
}

/// SMTP when `SMTP_HOST` is set, otherwise the log mailer
pub fn create_mailer(config: &MailConfig) -> IntegrationResult<Arc<dyn Mailer>> {
    match &config.host {
        Some(host) => {
            tracing::info!(host = %host, port = config.port, "SMTP mailer configured");
            Ok(Arc::new(SmtpMailer::new(config, host)?))
        }
        None => {
            tracing::warn!("SMTP_HOST not set, emails will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(from: &str) -> MailConfig {
        MailConfig {
            host: Some("smtp.example.com".into()),
            port: 587,
            username: Some("user".into()),
            password: Some("pass".into()),
            from: from.into(),
        }
    }

    fn email(to: &str) -> OutgoingEmail {
        OutgoingEmail {
            to: to.into(),
            subject: "Verify your email".into(),
            body: "Your code is 1234".into(),
        }
    }

    #[tokio::test]
    async fn test_log_mailer_accepts_everything() {
        assert!(LogMailer.send(&email("a@example.com")).await.is_ok());
    }

    #[tokio::test]
    async fn test_build_message() {
        let mailer = SmtpMailer::new(&config("Dream X <no-reply@example.com>"), "smtp.example.com").unwrap();
        let message = mailer.build_message(&email("bob@example.com")).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("To: bob@example.com"));
        assert!(raw.contains("Subject: Verify your email"));

        assert!(matches!(
            mailer.build_message(&email("not an address")),
            Err(IntegrationError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_from_rejected() {
        assert!(SmtpMailer::new(&config("nope"), "smtp.example.com").is_err());
    }

    #[tokio::test]
    async fn test_create_mailer_without_host_logs() {
        let mut cfg = config("no-reply@example.com");
        cfg.host = None;
        let mailer = create_mailer(&cfg).unwrap();
        assert!(mailer.send(&email("a@example.com")).await.is_ok());
    }
}
