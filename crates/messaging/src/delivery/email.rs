//! Email delivery via SMTP.
//!
//! [`EmailSender`] wraps the `lettre` async SMTP transport. Configuration
//! is loaded from environment variables; if `SMTP_HOST` is not set,
//! [`EmailConfig::from_env`] returns `None` and the sender runs in test
//! mode, logging messages instead of sending them.

use async_trait::async_trait;
use ebic_core::channels::Channel;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use uuid::Uuid;

use super::{BodyFormat, ChannelError, ChannelSender, OutboundMessage, SendReceipt};

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `EMAIL_FROM` is not set.
pub const DEFAULT_FROM_ADDRESS: &str = "noreply@ebic.local";

/// Provider assumed when `EMAIL_PROVIDER` is not set.
pub const DEFAULT_PROVIDER: &str = "gmail";

/// Configuration for the SMTP transport.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set.
    ///
    /// | Variable        | Required | Default |
    /// |-----------------|----------|---------|
    /// | `SMTP_HOST`     | yes      | -       |
    /// | `SMTP_PORT`     | no       | `587`   |
    /// | `SMTP_USER`     | no       | -       |
    /// | `SMTP_PASSWORD` | no       | -       |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok().filter(|h| !h.is_empty())?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// EmailSender
// ---------------------------------------------------------------------------

pub struct EmailSender {
    mailer: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from_address: String,
    provider: String,
}

impl EmailSender {
    /// Build a sender. `None` config yields a test-mode sender.
    pub fn new(
        config: Option<EmailConfig>,
        from_address: impl Into<String>,
        provider: impl Into<String>,
    ) -> Result<Self, ChannelError> {
        let mailer = match config {
            Some(config) => {
                let mut builder =
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
                        .port(config.smtp_port);
                if let (Some(user), Some(pass)) = (config.smtp_user, config.smtp_password) {
                    builder = builder.credentials(Credentials::new(user, pass));
                }
                Some(builder.build())
            }
            None => None,
        };
        Ok(Self {
            mailer,
            from_address: from_address.into(),
            provider: provider.into(),
        })
    }

    /// Build from `SMTP_*`, `EMAIL_FROM` and `EMAIL_PROVIDER`.
    pub fn from_env() -> Result<Self, ChannelError> {
        let from = std::env::var("EMAIL_FROM").unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.into());
        let provider =
            std::env::var("EMAIL_PROVIDER").unwrap_or_else(|_| DEFAULT_PROVIDER.into());
        Self::new(EmailConfig::from_env(), from, provider)
    }

    pub fn is_configured(&self) -> bool {
        self.mailer.is_some()
    }

    fn build_message(&self, message: &OutboundMessage, message_id: &str) -> Result<Message, ChannelError> {
        let content_type = match message.format {
            BodyFormat::Html => ContentType::TEXT_HTML,
            BodyFormat::Text => ContentType::TEXT_PLAIN,
        };
        Message::builder()
            .from(self.from_address.parse()?)
            .to(message.to.parse()?)
            .subject(message.subject.clone().unwrap_or_default())
            .message_id(Some(message_id.to_string()))
            .header(content_type)
            .body(message.body.clone())
            .map_err(|e| ChannelError::Build(e.to_string()))
    }

    fn message_id(&self) -> String {
        let domain = self
            .from_address
            .rsplit_once('@')
            .map_or("localhost", |(_, domain)| domain);
        format!("<{}@{domain}>", Uuid::new_v4())
    }
}

#[async_trait]
impl ChannelSender for EmailSender {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    fn provider(&self) -> &str {
        &self.provider
    }

    fn from_address(&self) -> &str {
        &self.from_address
    }

    async fn send(&self, message: &OutboundMessage) -> Result<SendReceipt, ChannelError> {
        let message_id = self.message_id();
        let email = self.build_message(message, &message_id)?;

        let Some(mailer) = &self.mailer else {
            tracing::info!(to = %message.to, subject = ?message.subject, "SMTP not configured, email logged only");
            return Ok(SendReceipt {
                external_id: Some(message_id),
            });
        };

        mailer.send(email).await?;
        tracing::debug!(to = %message.to, message_id = %message_id, "Email sent");
        Ok(SendReceipt {
            external_id: Some(message_id),
        })
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        match &self.mailer {
            Some(mailer) => {
                if mailer.test_connection().await? {
                    Ok(())
                } else {
                    Err(ChannelError::Unreachable(self.provider.clone()))
                }
            }
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn test_mode() -> EmailSender {
        EmailSender::new(None, "noreply@ebic.local", "gmail").unwrap()
    }

    #[tokio::test]
    async fn test_mode_accepts_and_returns_message_id() {
        let sender = test_mode();
        assert!(!sender.is_configured());
        let receipt = sender
            .send(&OutboundMessage::text("a@x.com", Some("Hi".into()), "body"))
            .await
            .unwrap();
        let id = receipt.external_id.unwrap();
        assert!(id.starts_with('<') && id.ends_with("@ebic.local>"));
    }

    #[tokio::test]
    async fn bad_recipient_is_an_address_error() {
        let result = test_mode()
            .send(&OutboundMessage::text("not-an-email", None, "body"))
            .await;
        assert_matches!(result, Err(ChannelError::Address(_)));
    }

    #[tokio::test]
    async fn test_mode_is_healthy() {
        assert!(test_mode().health_check().await.is_ok());
    }
}
