//! Multi-channel template dispatcher.
//!
//! One call resolves an active template by slug, picks every channel the
//! template allows and the recipient has an address for, and sends on each
//! channel independently. Every attempt writes exactly one `messages` audit
//! row; all rows from one call share a fresh `thread_id`.

use std::sync::Arc;

use ebic_core::channels::{Channel, Locale};
use ebic_core::error::CoreError;
use ebic_core::template::{LocalizedContent, Variables};
use ebic_core::types::DbId;
use ebic_db::models::email::CreateEmailLog;
use ebic_db::models::message::CreateMessage;
use ebic_db::models::status::{EmailStatus, MessageDirection, MessageStatus};
use ebic_db::models::template::MessageTemplate;
use futures::future::join_all;
use serde::Serialize;
use uuid::Uuid;

use crate::delivery::{ChannelSender, OutboundMessage};
use crate::error::MessagingError;
use crate::store::{EmailLogStore, MessageAuditStore, TemplateStore};

// ---------------------------------------------------------------------------
// Request / result
// ---------------------------------------------------------------------------

/// Contact methods of one recipient. Blank addresses count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recipient {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub name: Option<String>,
}

impl Recipient {
    fn address(&self, channel: Channel) -> Option<&str> {
        let raw = match channel {
            Channel::Email => self.email.as_deref(),
            Channel::Whatsapp => self.phone.as_deref(),
        };
        raw.map(str::trim).filter(|a| !a.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub slug: String,
    pub recipient: Recipient,
    pub variables: Variables,
    pub locale: Locale,
    pub sender_id: Option<DbId>,
}

/// Outcome of one channel attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelResult {
    pub channel: Channel,
    pub success: bool,
    pub message_id: Option<DbId>,
    pub external_id: Option<String>,
    pub error: Option<String>,
    /// `false` when the send happened but its audit row could not be written.
    pub audit_recorded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    /// No attempted channel failed. Vacuously true with zero attempts.
    pub success: bool,
    pub thread_id: Uuid,
    pub results: Vec<ChannelResult>,
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct TemplateDispatcher {
    templates: Arc<dyn TemplateStore>,
    audit: Arc<dyn MessageAuditStore>,
    email_logs: Arc<dyn EmailLogStore>,
    senders: Vec<Arc<dyn ChannelSender>>,
}

impl TemplateDispatcher {
    pub fn new(
        templates: Arc<dyn TemplateStore>,
        audit: Arc<dyn MessageAuditStore>,
        email_logs: Arc<dyn EmailLogStore>,
        senders: Vec<Arc<dyn ChannelSender>>,
    ) -> Self {
        Self {
            templates,
            audit,
            email_logs,
            senders,
        }
    }

    /// Send a templated message over every applicable channel.
    ///
    /// Fails as a whole only when the template is missing or inactive, or
    /// the template lookup itself fails.
    pub async fn send_templated(
        &self,
        request: &DispatchRequest,
    ) -> Result<DispatchResult, MessagingError> {
        let template = self
            .templates
            .find_by_slug(&request.slug)
            .await?
            .ok_or_else(|| CoreError::TemplateNotFound(request.slug.clone()))?;
        if !template.is_active {
            return Err(CoreError::TemplateInactive(request.slug.clone()).into());
        }
        let affinity = template.channel()?;

        let thread_id = Uuid::new_v4();
        let content = template.content(request.locale).render(&request.variables);

        let attempts = self.senders.iter().filter_map(|sender| {
            let channel = sender.channel();
            if !affinity.includes(channel) {
                return None;
            }
            match request.recipient.address(channel) {
                Some(address) => Some(self.attempt(
                    sender.as_ref(),
                    &template,
                    &content,
                    address,
                    thread_id,
                    request,
                )),
                None => {
                    tracing::debug!(slug = %request.slug, channel = %channel, "No address for channel, skipping");
                    None
                }
            }
        });
        let results = join_all(attempts).await;

        let success = results.iter().all(|r| r.success);
        tracing::info!(
            slug = %request.slug,
            thread_id = %thread_id,
            attempts = results.len(),
            success,
            "Templated dispatch finished"
        );
        Ok(DispatchResult {
            success,
            thread_id,
            results,
        })
    }

    async fn attempt(
        &self,
        sender: &dyn ChannelSender,
        template: &MessageTemplate,
        content: &LocalizedContent,
        address: &str,
        thread_id: Uuid,
        request: &DispatchRequest,
    ) -> ChannelResult {
        let channel = sender.channel();
        let subject = match channel {
            Channel::Email => content.subject.clone(),
            Channel::Whatsapp => None,
        };
        let outbound = OutboundMessage::text(address, subject.clone(), content.body.clone());
        let sent = sender.send(&outbound).await;

        if let Err(e) = &sent {
            tracing::warn!(slug = %template.slug, channel = %channel, thread_id = %thread_id, error = %e, "Channel send failed");
        }

        let (status, external_id, error) = match &sent {
            Ok(receipt) => (MessageStatus::Sent, receipt.external_id.clone(), None),
            Err(e) => (MessageStatus::Failed, None, Some(e.to_string())),
        };

        if channel == Channel::Email {
            self.log_email(template, address, subject.as_deref(), &content.body, &sent)
                .await;
        }

        let audit = CreateMessage {
            thread_id,
            channel: channel.as_str().to_string(),
            direction: MessageDirection::Outbound.as_str().to_string(),
            from_address: sender.from_address().to_string(),
            to_address: address.to_string(),
            subject,
            body: content.body.clone(),
            status: status.as_str().to_string(),
            template_id: Some(template.id),
            sent_by: request.sender_id,
            external_id: external_id.clone(),
            error_message: error.clone(),
        };
        let (message_id, audit_recorded) = match self.audit.record(audit).await {
            Ok(row) => (Some(row.id), true),
            Err(e) => {
                tracing::error!(
                    slug = %template.slug,
                    channel = %channel,
                    thread_id = %thread_id,
                    status = %status,
                    error = %e,
                    "Failed to write message audit row"
                );
                (None, false)
            }
        };

        ChannelResult {
            channel,
            success: sent.is_ok(),
            message_id,
            external_id,
            error,
            audit_recorded,
        }
    }

    async fn log_email(
        &self,
        template: &MessageTemplate,
        to: &str,
        subject: Option<&str>,
        body: &str,
        sent: &Result<crate::delivery::SendReceipt, crate::delivery::ChannelError>,
    ) {
        let log = CreateEmailLog {
            to_address: to.to_string(),
            subject: subject.unwrap_or_default().to_string(),
            template: template.slug.clone(),
            status: match sent {
                Ok(_) => EmailStatus::Sent.as_str().to_string(),
                Err(_) => EmailStatus::Failed.as_str().to_string(),
            },
            error_message: sent.as_ref().err().map(|e| e.to_string()),
            message_id: sent.as_ref().ok().and_then(|r| r.external_id.clone()),
            metadata: serde_json::json!({
                "to": to,
                "subject": subject,
                "text": body,
                "templateId": template.id,
            }),
        };
        if let Err(e) = self.email_logs.record(log).await {
            tracing::error!(slug = %template.slug, error = %e, "Failed to write email log");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::testing::RecordingSender;
    use crate::memory::MemoryStore;
    use assert_matches::assert_matches;
    use ebic_core::channels::TemplateChannel;
    use ebic_core::review::{status_update_variables, ReviewDecision, SubmissionKind};
    use ebic_core::template::TemplateDraft;

    struct Harness {
        store: Arc<MemoryStore>,
        email: Arc<RecordingSender>,
        whatsapp: Arc<RecordingSender>,
        dispatcher: TemplateDispatcher,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        store.seed_status_templates();
        let email = Arc::new(RecordingSender::email());
        let whatsapp = Arc::new(RecordingSender::whatsapp());
        let dispatcher = TemplateDispatcher::new(
            store.clone(),
            store.clone(),
            store.clone(),
            vec![email.clone(), whatsapp.clone()],
        );
        Harness {
            store,
            email,
            whatsapp,
            dispatcher,
        }
    }

    fn approved_request(recipient: Recipient) -> DispatchRequest {
        DispatchRequest {
            slug: "status_update_approved".into(),
            recipient,
            variables: status_update_variables(
                SubmissionKind::Collaborator,
                ReviewDecision::Approved,
                "Acme",
                None,
            ),
            locale: Locale::Ar,
            sender_id: Some(1),
        }
    }

    fn both() -> Recipient {
        Recipient {
            email: Some("a@x.com".into()),
            phone: Some("+218911234567".into()),
            name: Some("Acme".into()),
        }
    }

    #[tokio::test]
    async fn both_channels_share_one_thread() {
        let h = harness();
        let result = h.dispatcher.send_templated(&approved_request(both())).await.unwrap();

        assert!(result.success);
        let rows = h.store.messages();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|m| m.thread_id == result.thread_id));
        let mut channels: Vec<_> = rows.iter().map(|m| m.channel.as_str()).collect();
        channels.sort();
        assert_eq!(channels, vec!["EMAIL", "WHATSAPP"]);
    }

    #[tokio::test]
    async fn arabic_body_is_interpolated() {
        let h = harness();
        h.dispatcher.send_templated(&approved_request(both())).await.unwrap();

        for row in h.store.messages() {
            assert!(row.body.contains("مرحباً Acme،"));
            assert!(row.body.contains("الخطوات القادمة:"));
            assert!(row.body.contains("- Your submission is now visible on our platform"));
            assert!(!row.body.contains("{{"));
            assert_eq!(row.status, "SENT");
        }
        let email = h.store.messages().into_iter().find(|m| m.channel == "EMAIL").unwrap();
        assert_eq!(email.from_address, "noreply@ebic.local");
        assert!(email.subject.unwrap().contains("تهانينا"));
        let whatsapp = h.store.messages().into_iter().find(|m| m.channel == "WHATSAPP").unwrap();
        assert_eq!(whatsapp.from_address, "system");
        assert!(whatsapp.subject.is_none());
    }

    #[tokio::test]
    async fn missing_phone_skips_whatsapp() {
        let h = harness();
        let recipient = Recipient {
            phone: Some("   ".into()),
            ..both()
        };
        let result = h.dispatcher.send_templated(&approved_request(recipient)).await.unwrap();

        assert!(result.success);
        assert_eq!(result.results.len(), 1);
        assert_eq!(result.results[0].channel, Channel::Email);
        assert!(h.whatsapp.sent().is_empty());
        assert_eq!(h.store.messages().len(), 1);
    }

    #[tokio::test]
    async fn no_address_at_all_is_success_with_zero_attempts() {
        let h = harness();
        let result = h
            .dispatcher
            .send_templated(&approved_request(Recipient::default()))
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.results.is_empty());
    }

    #[tokio::test]
    async fn one_channel_failing_keeps_the_other() {
        let h = harness();
        h.email.fail_for("a@x.com");
        let result = h.dispatcher.send_templated(&approved_request(both())).await.unwrap();

        assert!(!result.success);
        let rows = h.store.messages();
        assert_eq!(rows.len(), 2);
        let failed = rows.iter().find(|m| m.channel == "EMAIL").unwrap();
        assert_eq!(failed.status, "FAILED");
        assert!(failed.error_message.is_some());
        assert_eq!(h.whatsapp.sent().len(), 1);

        let logs = h.store.email_logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, "FAILED");
    }

    #[tokio::test]
    async fn audit_failure_is_reported_not_hidden() {
        let h = harness();
        h.store.fail_audit_writes(true);
        let result = h.dispatcher.send_templated(&approved_request(both())).await.unwrap();
        assert!(result.success);
        assert!(result.results.iter().all(|r| !r.audit_recorded));
        assert_eq!(h.email.sent().len(), 1);
    }

    #[tokio::test]
    async fn missing_template_is_a_typed_failure() {
        let h = harness();
        let mut request = approved_request(both());
        request.slug = "nope".into();
        let err = h.dispatcher.send_templated(&request).await.unwrap_err();
        assert_matches!(err, MessagingError::Core(CoreError::TemplateNotFound(slug)) if slug == "nope");
        assert!(h.store.messages().is_empty());
    }

    #[tokio::test]
    async fn inactive_template_is_refused() {
        let h = harness();
        h.store.seed_template(
            &TemplateDraft {
                slug: "paused".into(),
                channel: TemplateChannel::Whatsapp,
                name_ar: "موقوف".into(),
                name_en: "Paused".into(),
                subject_ar: None,
                subject_en: None,
                body_ar: "نص".into(),
                body_en: "text".into(),
                variables: vec![],
            },
            false,
            false,
        );
        let mut request = approved_request(both());
        request.slug = "paused".into();
        assert_matches!(
            h.dispatcher.send_templated(&request).await,
            Err(MessagingError::Core(CoreError::TemplateInactive(_)))
        );
    }
}
