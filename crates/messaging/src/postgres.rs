//! PostgreSQL implementation of every persistence port, delegating to the
//! `ebic-db` repositories.

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
use ebic_db::repositories::{
    EmailLogRepo, EmailQueueRepo, MessageRepo, NotificationPreferenceRepo, NotificationRepo,
    PermissionRepo, QueueControlRepo, ReportRepo, SubmissionRepo, TemplateRepo, UserRepo,
};
use ebic_db::DbPool;
use uuid::Uuid;

use crate::store::{
    EmailLogStore, EmailQueue, MessageAuditStore, NotificationStore, PermissionEngine,
    PreferenceStore, ReportStore, StoreHealth, StoreResult, SubmissionStore, TemplateStore,
    UserDirectory,
};

/// Name of the email queue's row in `queue_controls`.
pub const EMAIL_QUEUE_NAME: &str = "email";

/// All persistence ports over one connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl UserDirectory for PgStore {
    async fn active_contacts(&self) -> StoreResult<Vec<UserContact>> {
        Ok(UserRepo::list_active_contacts(&self.pool).await?)
    }
}

#[async_trait]
impl PermissionEngine for PgStore {
    async fn has_permission(
        &self,
        user_id: DbId,
        resource: &str,
        action: &str,
    ) -> StoreResult<bool> {
        Ok(PermissionRepo::has_permission(&self.pool, user_id, resource, action).await?)
    }

    async fn user_permissions(&self, user_id: DbId) -> StoreResult<Vec<Permission>> {
        let rows = PermissionRepo::list_for_user(&self.pool, user_id).await?;
        Ok(rows
            .into_iter()
            .map(|row| Permission::new(row.resource, row.action))
            .collect())
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn create(&self, input: CreateNotification) -> StoreResult<Notification> {
        Ok(NotificationRepo::create(&self.pool, &input).await?)
    }

    async fn list(
        &self,
        user_id: DbId,
        filter: &NotificationFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Notification>> {
        Ok(NotificationRepo::list_for_user(&self.pool, user_id, filter, limit, offset).await?)
    }

    async fn count(&self, user_id: DbId, filter: &NotificationFilter) -> StoreResult<i64> {
        Ok(NotificationRepo::count_for_user(&self.pool, user_id, filter).await?)
    }

    async fn unread_count(&self, user_id: DbId) -> StoreResult<i64> {
        Ok(NotificationRepo::unread_count(&self.pool, user_id).await?)
    }

    async fn mark_read(&self, id: DbId, user_id: DbId) -> StoreResult<bool> {
        Ok(NotificationRepo::mark_read(&self.pool, id, user_id).await?)
    }

    async fn mark_all_read(&self, user_id: DbId) -> StoreResult<u64> {
        Ok(NotificationRepo::mark_all_read(&self.pool, user_id).await?)
    }

    async fn delete(&self, id: DbId, user_id: DbId) -> StoreResult<bool> {
        Ok(NotificationRepo::delete(&self.pool, id, user_id).await?)
    }
}

#[async_trait]
impl PreferenceStore for PgStore {
    async fn get(&self, user_id: DbId) -> StoreResult<Option<NotificationPreferences>> {
        let value = NotificationPreferenceRepo::get(&self.pool, user_id).await?;
        Ok(value.map(NotificationPreferences::from_value))
    }

    async fn merge(
        &self,
        user_id: DbId,
        patch: &PreferencesPatch,
    ) -> StoreResult<Option<NotificationPreferences>> {
        let patch = serde_json::Value::Object(patch.as_map().clone());
        let merged = NotificationPreferenceRepo::merge(&self.pool, user_id, &patch).await?;
        Ok(merged.map(NotificationPreferences::from_value))
    }
}

#[async_trait]
impl TemplateStore for PgStore {
    async fn list(&self) -> StoreResult<Vec<MessageTemplate>> {
        Ok(TemplateRepo::list(&self.pool).await?)
    }

    async fn find_by_id(&self, id: DbId) -> StoreResult<Option<MessageTemplate>> {
        Ok(TemplateRepo::find_by_id(&self.pool, id).await?)
    }

    async fn find_by_slug(&self, slug: &str) -> StoreResult<Option<MessageTemplate>> {
        Ok(TemplateRepo::find_by_slug(&self.pool, slug).await?)
    }

    async fn create(
        &self,
        draft: &TemplateDraft,
        is_active: bool,
    ) -> StoreResult<MessageTemplate> {
        Ok(TemplateRepo::create(&self.pool, draft, is_active).await?)
    }

    async fn update(
        &self,
        id: DbId,
        draft: &TemplateDraft,
        is_active: bool,
    ) -> StoreResult<Option<MessageTemplate>> {
        Ok(TemplateRepo::update(&self.pool, id, draft, is_active).await?)
    }

    async fn delete(&self, id: DbId) -> StoreResult<bool> {
        Ok(TemplateRepo::delete(&self.pool, id).await?)
    }
}

#[async_trait]
impl MessageAuditStore for PgStore {
    async fn record(&self, input: CreateMessage) -> StoreResult<Message> {
        Ok(MessageRepo::create(&self.pool, &input).await?)
    }

    async fn list_thread(&self, thread_id: Uuid) -> StoreResult<Vec<Message>> {
        Ok(MessageRepo::list_by_thread(&self.pool, thread_id).await?)
    }
}

#[async_trait]
impl EmailLogStore for PgStore {
    async fn record(&self, input: CreateEmailLog) -> StoreResult<EmailLog> {
        Ok(EmailLogRepo::create(&self.pool, &input).await?)
    }

    async fn find(&self, id: DbId) -> StoreResult<Option<EmailLog>> {
        Ok(EmailLogRepo::find_by_id(&self.pool, id).await?)
    }

    async fn count_since(
        &self,
        since: Timestamp,
        status: Option<EmailStatus>,
    ) -> StoreResult<i64> {
        Ok(EmailLogRepo::count_since(&self.pool, since, status).await?)
    }

    async fn count_by_template_since(&self, since: Timestamp) -> StoreResult<Vec<TemplateCount>> {
        Ok(EmailLogRepo::count_by_template_since(&self.pool, since).await?)
    }

    async fn failed_since(&self, since: Timestamp, limit: i64) -> StoreResult<Vec<EmailLog>> {
        Ok(EmailLogRepo::failed_since(&self.pool, since, limit).await?)
    }

    async fn outcomes_since(&self, since: Timestamp) -> StoreResult<Vec<(Timestamp, String)>> {
        Ok(EmailLogRepo::outcomes_since(&self.pool, since).await?)
    }

    async fn delete_failed_before(&self, cutoff: Timestamp) -> StoreResult<u64> {
        Ok(EmailLogRepo::delete_failed_before(&self.pool, cutoff).await?)
    }
}

#[async_trait]
impl EmailQueue for PgStore {
    async fn enqueue(&self, input: EnqueueEmail) -> StoreResult<EmailQueueItem> {
        Ok(EmailQueueRepo::enqueue(&self.pool, &input).await?)
    }

    async fn counts(&self) -> StoreResult<QueueCounts> {
        Ok(EmailQueueRepo::counts(&self.pool).await?)
    }

    async fn avg_processing_ms_since(&self, since: Timestamp) -> StoreResult<i64> {
        Ok(EmailQueueRepo::avg_processing_ms_since(&self.pool, since).await?)
    }

    async fn is_paused(&self) -> StoreResult<bool> {
        Ok(QueueControlRepo::is_paused(&self.pool, EMAIL_QUEUE_NAME).await?)
    }

    async fn set_paused(&self, paused: bool) -> StoreResult<bool> {
        Ok(QueueControlRepo::set_paused(&self.pool, EMAIL_QUEUE_NAME, paused).await?)
    }
}

#[async_trait]
impl ReportStore for PgStore {
    async fn create(&self, created_by: DbId, input: &CreateReport) -> StoreResult<Report> {
        Ok(ReportRepo::create(&self.pool, created_by, input).await?)
    }

    async fn list_for_user(&self, user_id: DbId) -> StoreResult<Vec<Report>> {
        Ok(ReportRepo::list_for_user(&self.pool, user_id).await?)
    }

    async fn find(&self, id: DbId) -> StoreResult<Option<Report>> {
        Ok(ReportRepo::find_by_id(&self.pool, id).await?)
    }

    async fn delete(&self, id: DbId, user_id: DbId) -> StoreResult<bool> {
        Ok(ReportRepo::delete(&self.pool, id, user_id).await?)
    }

    async fn claim_next_pending(&self) -> StoreResult<Option<Report>> {
        Ok(ReportRepo::claim_next_pending(&self.pool).await?)
    }

    async fn complete(&self, id: DbId, file_url: &str) -> StoreResult<bool> {
        Ok(ReportRepo::complete(&self.pool, id, file_url).await?)
    }

    async fn fail(&self, id: DbId, error: &str) -> StoreResult<bool> {
        Ok(ReportRepo::fail(&self.pool, id, error).await?)
    }

    async fn fail_stale(&self, started_before: Timestamp, error: &str) -> StoreResult<u64> {
        Ok(ReportRepo::fail_stale(&self.pool, started_before, error).await?)
    }
}

#[async_trait]
impl SubmissionStore for PgStore {
    async fn set_status(
        &self,
        kind: SubmissionKind,
        id: DbId,
        decision: ReviewDecision,
    ) -> StoreResult<Option<SubmissionContact>> {
        Ok(SubmissionRepo::set_status(&self.pool, kind, id, decision).await?)
    }
}

#[async_trait]
impl StoreHealth for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(ebic_db::health_check(&self.pool).await?)
    }
}
