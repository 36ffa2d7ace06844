//! In-process channel senders for tests and local runs.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use ebic_core::channels::Channel;

use super::{ChannelError, ChannelSender, OutboundMessage, SendReceipt};

/// Records every message and fails for configured addresses.
pub struct RecordingSender {
    channel: Channel,
    from_address: String,
    sent: Mutex<Vec<OutboundMessage>>,
    failing: Mutex<HashSet<String>>,
    healthy: bool,
}

impl RecordingSender {
    pub fn new(channel: Channel) -> Self {
        let from_address = match channel {
            Channel::Email => "noreply@ebic.local",
            Channel::Whatsapp => "system",
        };
        Self {
            channel,
            from_address: from_address.to_string(),
            sent: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            healthy: true,
        }
    }

    pub fn email() -> Self {
        Self::new(Channel::Email)
    }

    pub fn whatsapp() -> Self {
        Self::new(Channel::Whatsapp)
    }

    /// A sender whose connectivity probe always fails.
    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    /// Make every send to `address` fail.
    pub fn fail_for(&self, address: impl Into<String>) {
        self.failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(address.into());
    }

    /// Messages accepted so far, in send order.
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl ChannelSender for RecordingSender {
    fn channel(&self) -> Channel {
        self.channel
    }

    fn provider(&self) -> &str {
        "recording"
    }

    fn from_address(&self) -> &str {
        &self.from_address
    }

    async fn send(&self, message: &OutboundMessage) -> Result<SendReceipt, ChannelError> {
        let failing = self
            .failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&message.to);
        if failing {
            return Err(ChannelError::Provider(format!("rejected {}", message.to)));
        }
        let mut sent = self.sent.lock().unwrap_or_else(|e| e.into_inner());
        sent.push(message.clone());
        Ok(SendReceipt {
            external_id: Some(format!("rec-{}", sent.len())),
        })
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        if self.healthy {
            Ok(())
        } else {
            Err(ChannelError::Unreachable("recording".into()))
        }
    }
}
