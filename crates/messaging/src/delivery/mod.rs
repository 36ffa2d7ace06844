//! Channel senders: one per delivery medium, each its own failure domain.

pub mod email;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod whatsapp;

use async_trait::async_trait;
use ebic_core::channels::Channel;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for a single channel send.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),

    /// The HTTP request to the provider failed (network, DNS, timeout).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-2xx status.
    #[error("Provider returned HTTP {status}")]
    Rejected { status: u16 },

    /// The provider accepted the request but reported an error.
    #[error("Provider error: {0}")]
    Provider(String),

    /// The address failed validation before any transport was contacted.
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Channel not configured: {0}")]
    NotConfigured(&'static str),

    /// A connection test reached the server but it did not accept us.
    #[error("Provider unreachable: {0}")]
    Unreachable(String),
}

// ---------------------------------------------------------------------------
// Sender contract
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BodyFormat {
    #[default]
    Text,
    Html,
}

/// One message ready for a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub to: String,
    /// Ignored by channels without a subject line.
    pub subject: Option<String>,
    pub body: String,
    pub format: BodyFormat,
}

impl OutboundMessage {
    pub fn text(to: impl Into<String>, subject: Option<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject,
            body: body.into(),
            format: BodyFormat::Text,
        }
    }

    pub fn html(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: Some(subject.into()),
            body: body.into(),
            format: BodyFormat::Html,
        }
    }
}

/// What the transport told us about an accepted message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendReceipt {
    pub external_id: Option<String>,
}

#[async_trait]
pub trait ChannelSender: Send + Sync {
    fn channel(&self) -> Channel;

    /// Provider name used for limits and logging.
    fn provider(&self) -> &str;

    /// Address recorded as the sender on audit rows.
    fn from_address(&self) -> &str;

    async fn send(&self, message: &OutboundMessage) -> Result<SendReceipt, ChannelError>;

    /// Lightweight connectivity probe; must not send anything.
    async fn health_check(&self) -> Result<(), ChannelError>;
}
