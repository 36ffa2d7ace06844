//! Persistence ports used by the messaging core.
//!
//! Every component depends on the narrowest trait it needs. [`PgStore`]
//! implements all of them over PostgreSQL; `MemoryStore` (feature `testing`)
//! implements them in process.
//!
//! [`PgStore`]: crate::postgres::PgStore

use async_trait::async_trait;
use ebic_core::notification::{NotificationPreferences, PreferencesPatch};
use ebic_core::permissions::Permission;
use ebic_core::review::{ReviewDecision, SubmissionKind};
use ebic_core::template::TemplateDraft;
use ebic_core::types::{DbId, Timestamp};
use ebic_db::models::email::{
    CreateEmailLog, EmailLog, EmailQueueItem, EnqueueEmail, QueueCounts, TemplateCount,
};
use ebic_db::models::message::{CreateMessage, Message};
use ebic_db::models::notification::{CreateNotification, Notification, NotificationFilter};
use ebic_db::models::report::{CreateReport, Report};
use ebic_db::models::status::EmailStatus;
use ebic_db::models::submission::SubmissionContact;
use ebic_db::models::template::MessageTemplate;
use ebic_db::models::user::UserContact;
use uuid::Uuid;

use crate::error::StoreError;

pub type StoreResult<T> = Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Users and permissions
// ---------------------------------------------------------------------------

/// Source of candidate recipients.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Active users with a deliverable email address, with their
    /// notification preferences.
    async fn active_contacts(&self) -> StoreResult<Vec<UserContact>>;
}

/// The external role/permission engine.
#[async_trait]
pub trait PermissionEngine: Send + Sync {
    /// Whether `user_id` holds `resource:action` (a `manage` grant counts).
    async fn has_permission(&self, user_id: DbId, resource: &str, action: &str)
        -> StoreResult<bool>;

    /// Every grant the user holds.
    async fn user_permissions(&self, user_id: DbId) -> StoreResult<Vec<Permission>>;
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create(&self, input: CreateNotification) -> StoreResult<Notification>;

    async fn list(
        &self,
        user_id: DbId,
        filter: &NotificationFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Notification>>;

    async fn count(&self, user_id: DbId, filter: &NotificationFilter) -> StoreResult<i64>;

    async fn unread_count(&self, user_id: DbId) -> StoreResult<i64>;

    /// `false` when the notification does not exist or is not owned by
    /// `user_id`.
    async fn mark_read(&self, id: DbId, user_id: DbId) -> StoreResult<bool>;

    async fn mark_all_read(&self, user_id: DbId) -> StoreResult<u64>;

    async fn delete(&self, id: DbId, user_id: DbId) -> StoreResult<bool>;
}

/// Per-user opt-out switches. `None` means the user does not exist.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get(&self, user_id: DbId) -> StoreResult<Option<NotificationPreferences>>;

    /// Shallow-merge `patch` into the stored preferences.
    async fn merge(
        &self,
        user_id: DbId,
        patch: &PreferencesPatch,
    ) -> StoreResult<Option<NotificationPreferences>>;
}

// ---------------------------------------------------------------------------
// Templates and audit
// ---------------------------------------------------------------------------

#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn list(&self) -> StoreResult<Vec<MessageTemplate>>;

    async fn find_by_id(&self, id: DbId) -> StoreResult<Option<MessageTemplate>>;

    async fn find_by_slug(&self, slug: &str) -> StoreResult<Option<MessageTemplate>>;

    async fn create(&self, draft: &TemplateDraft, is_active: bool)
        -> StoreResult<MessageTemplate>;

    async fn update(
        &self,
        id: DbId,
        draft: &TemplateDraft,
        is_active: bool,
    ) -> StoreResult<Option<MessageTemplate>>;

    /// Delete a non-system template.
    async fn delete(&self, id: DbId) -> StoreResult<bool>;
}

/// Append-only audit trail of channel attempts.
#[async_trait]
pub trait MessageAuditStore: Send + Sync {
    async fn record(&self, input: CreateMessage) -> StoreResult<Message>;

    async fn list_thread(&self, thread_id: Uuid) -> StoreResult<Vec<Message>>;
}

// ---------------------------------------------------------------------------
// Email log and queue
// ---------------------------------------------------------------------------

#[async_trait]
pub trait EmailLogStore: Send + Sync {
    async fn record(&self, input: CreateEmailLog) -> StoreResult<EmailLog>;

    async fn find(&self, id: DbId) -> StoreResult<Option<EmailLog>>;

    async fn count_since(&self, since: Timestamp, status: Option<EmailStatus>)
        -> StoreResult<i64>;

    async fn count_by_template_since(&self, since: Timestamp) -> StoreResult<Vec<TemplateCount>>;

    /// Newest failures created at or after `since`, at most `limit`.
    async fn failed_since(&self, since: Timestamp, limit: i64) -> StoreResult<Vec<EmailLog>>;

    /// `(created_at, status)` of every row at or after `since`.
    async fn outcomes_since(&self, since: Timestamp) -> StoreResult<Vec<(Timestamp, String)>>;

    async fn delete_failed_before(&self, cutoff: Timestamp) -> StoreResult<u64>;
}

/// The out-of-process email queue, as seen from the producing side.
#[async_trait]
pub trait EmailQueue: Send + Sync {
    async fn enqueue(&self, input: EnqueueEmail) -> StoreResult<EmailQueueItem>;

    async fn counts(&self) -> StoreResult<QueueCounts>;

    async fn avg_processing_ms_since(&self, since: Timestamp) -> StoreResult<i64>;

    async fn is_paused(&self) -> StoreResult<bool>;

    /// Atomically set the pause flag, returning its previous value.
    async fn set_paused(&self, paused: bool) -> StoreResult<bool>;
}

// ---------------------------------------------------------------------------
// Reports, submissions, health
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn create(&self, created_by: DbId, input: &CreateReport) -> StoreResult<Report>;

    async fn list_for_user(&self, user_id: DbId) -> StoreResult<Vec<Report>>;

    async fn find(&self, id: DbId) -> StoreResult<Option<Report>>;

    async fn delete(&self, id: DbId, user_id: DbId) -> StoreResult<bool>;

    /// Move the oldest `PENDING` report to `GENERATING`. Two concurrent
    /// callers never receive the same report.
    async fn claim_next_pending(&self) -> StoreResult<Option<Report>>;

    async fn complete(&self, id: DbId, file_url: &str) -> StoreResult<bool>;

    async fn fail(&self, id: DbId, error: &str) -> StoreResult<bool>;

    /// Fail every report that started generating before `started_before`.
    async fn fail_stale(&self, started_before: Timestamp, error: &str) -> StoreResult<u64>;
}

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn set_status(
        &self,
        kind: SubmissionKind,
        id: DbId,
        decision: ReviewDecision,
    ) -> StoreResult<Option<SubmissionContact>>;
}

#[async_trait]
pub trait StoreHealth: Send + Sync {
    /// Trivial round trip to the backing store.
    async fn ping(&self) -> StoreResult<()>;
}

/// Every port at once, for wiring a single backing store into all services.
pub trait MessagingStore:
    UserDirectory
    + PermissionEngine
    + NotificationStore
    + PreferenceStore
    + TemplateStore
    + MessageAuditStore
    + EmailLogStore
    + EmailQueue
    + ReportStore
    + SubmissionStore
    + StoreHealth
    + 'static
{
}

impl<T> MessagingStore for T where
    T: UserDirectory
        + PermissionEngine
        + NotificationStore
        + PreferenceStore
        + TemplateStore
        + MessageAuditStore
        + EmailLogStore
        + EmailQueue
        + ReportStore
        + SubmissionStore
        + StoreHealth
        + 'static
{
}
