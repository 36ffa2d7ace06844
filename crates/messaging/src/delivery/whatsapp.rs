//! WhatsApp delivery through an UltraMsg-compatible HTTP gateway.
//!
//! When `ULTRAMSG_API_URL` / `ULTRAMSG_TOKEN` are not both set the sender
//! runs in mock mode: numbers are still validated, the message is logged
//! and a synthetic external id is returned.

use std::time::Duration;

use async_trait::async_trait;
use ebic_core::channels::Channel;
use uuid::Uuid;

use super::{ChannelError, ChannelSender, OutboundMessage, SendReceipt};

/// HTTP request timeout for a single send.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

const MIN_PHONE_DIGITS: usize = 9;
const MAX_PHONE_DIGITS: usize = 15;

/// Sender address recorded on audit rows.
const SYSTEM_SENDER: &str = "system";

#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    /// Instance base URL, e.g. `https://api.ultramsg.com/instance123`.
    pub api_url: String,
    pub token: String,
}

impl WhatsAppConfig {
    /// | Variable           | Required |
    /// |--------------------|----------|
    /// | `ULTRAMSG_API_URL` | yes      |
    /// | `ULTRAMSG_TOKEN`   | yes      |
    pub fn from_env() -> Option<Self> {
        let api_url = std::env::var("ULTRAMSG_API_URL").ok().filter(|v| !v.is_empty())?;
        let token = std::env::var("ULTRAMSG_TOKEN").ok().filter(|v| !v.is_empty())?;
        Some(Self { api_url, token })
    }
}

// ---------------------------------------------------------------------------
// Phone numbers
// ---------------------------------------------------------------------------

/// Strip formatting characters and turn a `00` international prefix into `+`.
pub fn normalize_phone(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();
    match cleaned.strip_prefix("00") {
        Some(rest) => format!("+{rest}"),
        None => cleaned,
    }
}

/// A normalized number is an optional `+` followed by 9 to 15 digits.
pub fn is_valid_phone(normalized: &str) -> bool {
    let digits = normalized.strip_prefix('+').unwrap_or(normalized);
    (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits.len())
        && digits.chars().all(|c| c.is_ascii_digit())
}

// ---------------------------------------------------------------------------
// WhatsAppSender
// ---------------------------------------------------------------------------

pub struct WhatsAppSender {
    client: reqwest::Client,
    config: Option<WhatsAppConfig>,
}

impl WhatsAppSender {
    pub fn new(config: Option<WhatsAppConfig>) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self, ChannelError> {
        Self::new(WhatsAppConfig::from_env())
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    fn endpoint(config: &WhatsAppConfig, path: &str) -> String {
        format!("{}/{path}", config.api_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChannelSender for WhatsAppSender {
    fn channel(&self) -> Channel {
        Channel::Whatsapp
    }

    fn provider(&self) -> &str {
        "ultramsg"
    }

    fn from_address(&self) -> &str {
        SYSTEM_SENDER
    }

    async fn send(&self, message: &OutboundMessage) -> Result<SendReceipt, ChannelError> {
        let to = normalize_phone(&message.to);
        if !is_valid_phone(&to) {
            return Err(ChannelError::InvalidRecipient(message.to.clone()));
        }

        let Some(config) = &self.config else {
            tracing::info!(to = %to, "WhatsApp gateway not configured, message logged only");
            return Ok(SendReceipt {
                external_id: Some(format!("mock-{}", Uuid::new_v4())),
            });
        };

        let response = self
            .client
            .post(Self::endpoint(config, "messages/chat"))
            .form(&[
                ("token", config.token.as_str()),
                ("to", to.as_str()),
                ("body", message.body.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ChannelError::Rejected {
                status: response.status().as_u16(),
            });
        }

        let payload: serde_json::Value = response.json().await?;
        if let Some(error) = payload.get("error") {
            return Err(ChannelError::Provider(error.to_string()));
        }

        let external_id = payload.get("id").map(|id| match id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        });
        tracing::debug!(to = %to, external_id = ?external_id, "WhatsApp message sent");
        Ok(SendReceipt { external_id })
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let Some(config) = &self.config else {
            return Ok(());
        };
        let response = self
            .client
            .get(Self::endpoint(config, "instance/status"))
            .query(&[("token", config.token.as_str())])
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::Rejected {
                status: response.status().as_u16(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
