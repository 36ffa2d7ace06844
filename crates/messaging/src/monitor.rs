//! Email queue and health monitor.
//!
//! Aggregates the `email_logs` and `email_queue` tables into the operator
//! dashboard payload and carries out the operator actions on the queue.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use ebic_core::monitor::{
    bucket_hourly, clamp_window_days, format_success_rate,
    truncate_error, ActionResult, HealthChecks, HourlyBucket, MonitorAction, Outcome,
    ProviderUsage, SystemHealth, CLEAR_ERRORS_AFTER_DAYS, RECENT_ERRORS_LIMIT,
    RETRY_BATCH_LIMIT, RETRY_MAX_ATTEMPTS, RETRY_PRIORITY, RETRY_WINDOW_HOURS,
};
use ebic_core::types::{DbId, Timestamp};
use ebic_db::models::email::{CreateEmailLog, EmailLog, EnqueueEmail, QueueCounts, TemplateCount};
use ebic_db::models::status::EmailStatus;
use serde::Serialize;
use serde_json::{json, Value};

use crate::delivery::{ChannelSender, OutboundMessage};
use crate::error::MessagingError;
use crate::store::{EmailLogStore, EmailQueue, StoreHealth};

const DEFAULT_PROVIDER: &str = "gmail";

/// Template name recorded for diagnostic sends.
pub const TEST_EMAIL_TEMPLATE: &str = "test";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Key into the provider limit table.
    pub provider: String,
    /// Side-channel broker; health only checks that one is configured.
    pub redis_url: Option<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            redis_url: None,
        }
    }
}

impl MonitorConfig {
    /// | Variable         | Default |
    /// |------------------|---------|
    /// | `EMAIL_PROVIDER` | `gmail` |
    /// | `REDIS_URL`      | unset   |
    pub fn from_env() -> Self {
        Self {
            provider: std::env::var("EMAIL_PROVIDER")
                .unwrap_or_else(|_| DEFAULT_PROVIDER.to_string()),
            redis_url: std::env::var("REDIS_URL").ok().filter(|v| !v.is_empty()),
        }
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_emails: i64,
    pub sent_emails: i64,
    pub failed_emails: i64,
    pub pending_emails: i64,
    pub success_rate: String,
    pub avg_processing_time: String,
    pub period: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub waiting: i64,
    pub active: i64,
    pub completed: i64,
    pub failed: i64,
    pub is_paused: bool,
}

impl QueueStats {
    fn new(counts: QueueCounts, is_paused: bool) -> Self {
        Self {
            waiting: counts.waiting,
            active: counts.active,
            completed: counts.completed,
            failed: counts.failed,
            is_paused,
        }
    }
}

/// A failed send as shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentError {
    pub id: DbId,
    pub to: String,
    pub subject: String,
    pub template: String,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
}

impl From<EmailLog> for RecentError {
    fn from(log: EmailLog) -> Self {
        Self {
            id: log.id,
            to: log.to_address,
            subject: log.subject,
            template: log.template,
            error_message: log.error_message.as_deref().map(truncate_error),
            created_at: log.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorOverview {
    pub overview: Overview,
    pub emails_by_template: Vec<TemplateCount>,
    pub queue_stats: QueueStats,
    pub recent_errors: Vec<RecentError>,
    pub hourly_stats: Vec<HourlyBucket>,
    pub provider_info: ProviderUsage,
    pub system_health: SystemHealth,
    pub timestamp: Timestamp,
}

/// Response of a diagnostic send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestEmailResult {
    pub success: bool,
    pub provider: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

pub struct QueueMonitor {
    email_logs: Arc<dyn EmailLogStore>,
    queue: Arc<dyn EmailQueue>,
    store: Arc<dyn StoreHealth>,
    email: Arc<dyn ChannelSender>,
    config: MonitorConfig,
}

impl QueueMonitor {
    pub fn new(
        email_logs: Arc<dyn EmailLogStore>,
        queue: Arc<dyn EmailQueue>,
        store: Arc<dyn StoreHealth>,
        email: Arc<dyn ChannelSender>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            email_logs,
            queue,
            store,
            email,
            config,
        }
    }

    pub fn provider(&self) -> &str {
        &self.config.provider
    }

    /// Dashboard payload for the last `days` days (clamped to 1..=90).
    pub async fn get_stats(&self, days: Option<i64>) -> Result<MonitorOverview, MessagingError> {
        self.stats_at(days, Utc::now()).await
    }

    async fn stats_at(
        &self,
        days: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<MonitorOverview, MessagingError> {
        let days = clamp_window_days(days);
        let since = now - TimeDelta::days(days);
        let last_day = now - TimeDelta::hours(24);
        let last_hour = now - TimeDelta::hours(1);
        let midnight = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map_or(last_day, |t| t.and_utc());

        let logs = &self.email_logs;
        let (total, sent, failed, pending) = tokio::try_join!(
            logs.count_since(since, None),
            logs.count_since(since, Some(EmailStatus::Sent)),
            logs.count_since(since, Some(EmailStatus::Failed)),
            logs.count_since(since, Some(EmailStatus::Pending)),
        )?;
        let (by_template, recent_errors, outcomes, sent_today, sent_last_hour) = tokio::try_join!(
            logs.count_by_template_since(since),
            logs.failed_since(since, RECENT_ERRORS_LIMIT),
            logs.outcomes_since(last_day),
            logs.count_since(midnight, Some(EmailStatus::Sent)),
            logs.count_since(last_hour, Some(EmailStatus::Sent)),
        )?;
        let (counts, is_paused, avg_ms) = tokio::try_join!(
            self.queue.counts(),
            self.queue.is_paused(),
            self.queue.avg_processing_ms_since(since),
        )?;
        let system_health = self.system_health().await;

        let hourly_stats = bucket_hourly(outcomes.into_iter().map(|(at, status)| {
            let outcome = match EmailStatus::parse(&status) {
                Some(EmailStatus::Sent) => Outcome::Sent,
                Some(EmailStatus::Failed) => Outcome::Failed,
                _ => Outcome::Pending,
            };
            (at, outcome)
        }));

        Ok(MonitorOverview {
            overview: Overview {
                total_emails: total,
                sent_emails: sent,
                failed_emails: failed,
                pending_emails: pending,
                success_rate: format_success_rate(sent, total),
                avg_processing_time: format!("{avg_ms}ms"),
                period: format!("Last {days} days"),
            },
            emails_by_template: by_template,
            queue_stats: QueueStats::new(counts, is_paused),
            recent_errors: recent_errors.into_iter().map(RecentError::from).collect(),
            hourly_stats,
            provider_info: ProviderUsage::compute(&self.config.provider, sent_today, sent_last_hour),
            system_health,
            timestamp: now,
        })
    }

    /// Run all four probes; none of them short-circuits another.
    pub async fn system_health(&self) -> SystemHealth {
        let (database, email_provider, paused) = tokio::join!(
            self.store.ping(),
            self.email.health_check(),
            self.queue.is_paused(),
        );
        if let Err(e) = &database {
            tracing::warn!(error = %e, "Database health check failed");
        }
        if let Err(e) = &email_provider {
            tracing::warn!(provider = %self.email.provider(), error = %e, "Email provider health check failed");
        }
        let queue = match paused {
            Ok(paused) => !paused,
            Err(e) => {
                tracing::warn!(error = %e, "Queue state check failed");
                false
            }
        };
        let checks = HealthChecks {
            database: database.is_ok(),
            email_provider: email_provider.is_ok(),
            queue,
            redis: self.config.redis_url.is_some(),
        };
        SystemHealth::from_checks(checks, Utc::now())
    }

    pub async fn perform_action(
        &self,
        action: MonitorAction,
        email_id: Option<DbId>,
    ) -> Result<ActionResult, MessagingError> {
        self.perform_action_at(action, email_id, Utc::now()).await
    }

    async fn perform_action_at(
        &self,
        action: MonitorAction,
        email_id: Option<DbId>,
        now: DateTime<Utc>,
    ) -> Result<ActionResult, MessagingError> {
        let result = match action {
            MonitorAction::RetryFailed => ActionResult::retried(self.retry_failed(email_id, now).await?),
            MonitorAction::ClearErrors => {
                let cutoff = now - TimeDelta::days(CLEAR_ERRORS_AFTER_DAYS);
                let deleted = self.email_logs.delete_failed_before(cutoff).await?;
                ActionResult::cleared(i64::try_from(deleted).unwrap_or(i64::MAX))
            }
            MonitorAction::PauseQueue => ActionResult::paused(self.queue.set_paused(true).await?),
            MonitorAction::ResumeQueue => ActionResult::resumed(self.queue.set_paused(false).await?),
        };
        tracing::info!(action = %action, affected = result.affected, "Monitor action performed");
        Ok(result)
    }

    /// Re-enqueue recent failures. Each enqueue is independent; the count is
    /// of successful enqueues only.
    async fn retry_failed(
        &self,
        email_id: Option<DbId>,
        now: DateTime<Utc>,
    ) -> Result<i64, MessagingError> {
        let since = now - TimeDelta::hours(RETRY_WINDOW_HOURS);
        let candidates: Vec<EmailLog> = match email_id {
            Some(id) => self
                .email_logs
                .find(id)
                .await?
                .into_iter()
                .filter(|log| {
                    log.status == EmailStatus::Failed.as_str() && log.created_at >= since
                })
                .collect(),
            None => self.email_logs.failed_since(since, RETRY_BATCH_LIMIT).await?,
        };

        let mut retried = 0;
        for log in candidates {
            let input = EnqueueEmail {
                template: log.template.clone(),
                payload: retry_payload(&log),
                priority: RETRY_PRIORITY,
                max_attempts: RETRY_MAX_ATTEMPTS,
            };
            match self.queue.enqueue(input).await {
                Ok(_) => retried += 1,
                Err(e) => {
                    tracing::warn!(email_id = log.id, error = %e, "Failed to re-enqueue email");
                }
            }
        }
        Ok(retried)
    }

    /// Probe the provider, send one diagnostic message and log it.
    pub async fn send_test_email(&self, to: &str) -> TestEmailResult {
        let provider = self.email.provider().to_string();
        if let Err(e) = self.email.health_check().await {
            tracing::warn!(provider = %provider, error = %e, "Test email aborted: provider unreachable");
            return TestEmailResult {
                success: false,
                provider,
                message: format!("Connection test failed: {e}"),
            };
        }

        let subject = "EBIC email test".to_string();
        let body = format!(
            "This is a test message from the EBIC platform.\n\nProvider: {provider}\nSent at: {}",
            Utc::now().to_rfc3339()
        );
        let sent = self
            .email
            .send(&OutboundMessage::text(to, Some(subject.clone()), body))
            .await;

        let log = CreateEmailLog {
            to_address: to.to_string(),
            subject,
            template: TEST_EMAIL_TEMPLATE.to_string(),
            status: if sent.is_ok() {
                EmailStatus::Sent.as_str().to_string()
            } else {
                EmailStatus::Failed.as_str().to_string()
            },
            error_message: sent.as_ref().err().map(|e| e.to_string()),
            message_id: sent.as_ref().ok().and_then(|r| r.external_id.clone()),
            metadata: json!({ "to": to, "provider": provider }),
        };
        if let Err(e) = self.email_logs.record(log).await {
            tracing::error!(error = %e, "Failed to write test email log");
        }

        match sent {
            Ok(_) => TestEmailResult {
                success: true,
                provider,
                message: format!("Test email sent to {to}"),
            },
            Err(e) => TestEmailResult {
                success: false,
                provider,
                message: format!("Failed to send test email: {e}"),
            },
        }
    }
}

/// Queue payload rebuilt from the logged metadata.
fn retry_payload(log: &EmailLog) -> Value {
    let mut payload = match &log.metadata {
        Value::Object(map) => map.clone(),
        _ => serde_json::Map::new(),
    };
    payload
        .entry("to")
        .or_insert_with(|| Value::String(log.to_address.clone()));
    payload
        .entry("subject")
        .or_insert_with(|| Value::String(log.subject.clone()));
    payload.insert("retryOf".to_string(), json!(log.id));
    Value::Object(payload)
}
