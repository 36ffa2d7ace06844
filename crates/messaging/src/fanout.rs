//! Notification fan-out: one admin event to every eligible, opted-in admin.
//!
//! Each recipient is an independent unit of work. A recipient whose
//! notification insert or email send fails is counted as `failed`; the
//! remaining recipients are unaffected.

use std::sync::Arc;

use ebic_core::notification::{NotificationPreferences, NotificationRequest};
use ebic_db::models::email::CreateEmailLog;
use ebic_db::models::notification::CreateNotification;
use ebic_db::models::status::EmailStatus;
use ebic_db::models::user::UserContact;
use futures::stream::{self, StreamExt};
use handlebars::{Handlebars, RenderError};
use serde::Serialize;

use crate::audience::AudienceResolver;
use crate::delivery::{ChannelSender, OutboundMessage};
use crate::error::MessagingError;
use crate::store::{EmailLogStore, NotificationStore};

/// Template name recorded on email logs written by the fan-out.
pub const ADMIN_NOTIFICATION_TEMPLATE: &str = "admin_notification";

const DEFAULT_SUBJECT_PREFIX: &str = "[EBIC Admin]";
const DEFAULT_APP_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_CONCURRENCY: usize = 8;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FanoutConfig {
    pub subject_prefix: String,
    /// Prepended to relative action URLs in emails.
    pub app_base_url: String,
    /// Recipients processed concurrently.
    pub concurrency: usize,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            subject_prefix: DEFAULT_SUBJECT_PREFIX.to_string(),
            app_base_url: DEFAULT_APP_BASE_URL.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl FanoutConfig {
    /// | Variable               | Default                 |
    /// |------------------------|-------------------------|
    /// | `ADMIN_SUBJECT_PREFIX` | `[EBIC Admin]`          |
    /// | `APP_BASE_URL`         | `http://localhost:3000` |
    /// | `FANOUT_CONCURRENCY`   | `8`                     |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            subject_prefix: std::env::var("ADMIN_SUBJECT_PREFIX")
                .unwrap_or(defaults.subject_prefix),
            app_base_url: std::env::var("APP_BASE_URL").unwrap_or(defaults.app_base_url),
            concurrency: std::env::var("FANOUT_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.concurrency),
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Counts for one fan-out call.
///
/// `sent + failed` equals the number of eligible, opted-in recipients plus
/// the users whose permission lookup failed; opted-out recipients are only
/// counted in `skipped`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FanoutOutcome {
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecipientOutcome {
    Sent,
    Failed,
    Skipped,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct FanoutEngine {
    audience: AudienceResolver,
    notifications: Arc<dyn NotificationStore>,
    email_logs: Arc<dyn EmailLogStore>,
    email: Arc<dyn ChannelSender>,
    handlebars: Handlebars<'static>,
    config: FanoutConfig,
}

impl FanoutEngine {
    pub fn new(
        audience: AudienceResolver,
        notifications: Arc<dyn NotificationStore>,
        email_logs: Arc<dyn EmailLogStore>,
        email: Arc<dyn ChannelSender>,
        config: FanoutConfig,
    ) -> Self {
        Self {
            audience,
            notifications,
            email_logs,
            email,
            handlebars: Handlebars::new(),
            config,
        }
    }

    /// Deliver `request` to its audience.
    ///
    /// Only a failure to resolve the audience is returned as an error.
    pub async fn notify(
        &self,
        request: &NotificationRequest,
    ) -> Result<FanoutOutcome, MessagingError> {
        let audience = self
            .audience
            .resolve(request.required_permission.as_ref())
            .await?;

        let mut outcome = FanoutOutcome {
            failed: audience.lookup_failures,
            ..FanoutOutcome::default()
        };
        if audience.recipients.is_empty() {
            tracing::warn!(
                category = %request.category,
                lookup_failures = audience.lookup_failures,
                "No eligible recipients for notification"
            );
            return Ok(outcome);
        }

        let outcomes: Vec<RecipientOutcome> = stream::iter(audience.recipients)
            .map(|contact| self.deliver(request, contact))
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        for result in outcomes {
            match result {
                RecipientOutcome::Sent => outcome.sent += 1,
                RecipientOutcome::Failed => outcome.failed += 1,
                RecipientOutcome::Skipped => outcome.skipped += 1,
            }
        }

        tracing::info!(
            category = %request.category,
            sent = outcome.sent,
            failed = outcome.failed,
            skipped = outcome.skipped,
            "Notification fan-out finished"
        );
        Ok(outcome)
    }

    async fn deliver(&self, request: &NotificationRequest, contact: UserContact) -> RecipientOutcome {
        let preferences = NotificationPreferences::from_value(contact.notification_preferences);
        if !preferences.allows(request.category) {
            tracing::debug!(user_id = contact.id, category = %request.category, "Recipient opted out");
            return RecipientOutcome::Skipped;
        }
        if preferences.digest_mode().is_batched() {
            tracing::debug!(
                user_id = contact.id,
                digest_mode = ?preferences.digest_mode(),
                "Digest batching is not supported, delivering immediately"
            );
        }

        let input = CreateNotification {
            user_id: contact.id,
            category: request.category.as_str().to_string(),
            title: request.title.clone(),
            message: request.message.clone(),
            data: request.payload.clone(),
            action_url: request.action_url.clone(),
            priority: request.priority.as_str().to_string(),
        };
        let link = self.action_link(request);
        let body = match render_email(&self.handlebars, request, link.as_deref()) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(
                    user_id = contact.id,
                    category = %request.category,
                    error = %e,
                    "Failed to render admin notification email"
                );
                return RecipientOutcome::Failed;
            }
        };
        let notification = match self.notifications.create(input).await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(user_id = contact.id, category = %request.category, error = %e, "Failed to store notification");
                return RecipientOutcome::Failed;
            }
        };

        let subject = format!("{} {}", self.config.subject_prefix, request.title);
        let message = OutboundMessage::html(contact.email.clone(), subject.clone(), body.clone());
        let result = self.email.send(&message).await;

        let log = CreateEmailLog {
            to_address: contact.email.clone(),
            subject: subject.clone(),
            template: ADMIN_NOTIFICATION_TEMPLATE.to_string(),
            status: match &result {
                Ok(_) => EmailStatus::Sent.as_str().to_string(),
                Err(_) => EmailStatus::Failed.as_str().to_string(),
            },
            error_message: result.as_ref().err().map(|e| e.to_string()),
            message_id: result.as_ref().ok().and_then(|r| r.external_id.clone()),
            metadata: serde_json::json!({
                "to": contact.email,
                "subject": subject,
                "html": body,
                "notificationId": notification.id,
                "category": request.category,
            }),
        };
        if let Err(e) = self.email_logs.record(log).await {
            tracing::error!(user_id = contact.id, error = %e, "Failed to write email log for admin notification");
        }

        match result {
            Ok(_) => RecipientOutcome::Sent,
            Err(e) => {
                tracing::warn!(user_id = contact.id, category = %request.category, error = %e, "Admin notification email failed");
                RecipientOutcome::Failed
            }
        }
    }

    fn action_link(&self, request: &NotificationRequest) -> Option<String> {
        let url = request.action_url.as_deref()?;
        if url.starts_with('/') {
            Some(format!("{}{url}", self.config.app_base_url.trim_end_matches('/')))
        } else {
            Some(url.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Email body
// ---------------------------------------------------------------------------

/// Body of the admin notification email. Values are HTML-escaped on render.
const ADMIN_EMAIL_TEMPLATE: &str = r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;"><h2>{{title}}</h2><p>{{message}}</p>{{#if action_link}}<p><a href="{{action_link}}" style="background: #1a5f7a; color: #fff; padding: 10px 20px; text-decoration: none; border-radius: 4px;">Take Action</a></p>{{/if}}<p style="color: #888; font-size: 12px;">Priority: {{priority}}</p></div>"#;

fn render_email(
    handlebars: &Handlebars<'static>,
    request: &NotificationRequest,
    action_link: Option<&str>,
) -> Result<String, RenderError> {
    handlebars.render_template(
        ADMIN_EMAIL_TEMPLATE,
        &serde_json::json!({
            "title": request.title,
            "message": request.message,
            "action_link": action_link,
            "priority": request.priority.as_str(),
        }),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
