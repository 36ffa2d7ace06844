//! In-process implementation of every persistence port.
//!
//! Compiled for tests and behind the `testing` feature.
//! Fault switches let tests make individual writes fail.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use ebic_core::channels::TemplateChannel;
use ebic_core::notification::{NotificationPreferences, PreferencesPatch};
use ebic_core::permissions::{check_permission, Permission};
use ebic_core::report::ReportStatus;
use ebic_core::review::{ReviewDecision, SubmissionKind, SLUG_STATUS_APPROVED, SLUG_STATUS_REJECTED};
use ebic_core::template::TemplateDraft;
use ebic_core::types::{DbId, Timestamp};
use ebic_db::models::email::{
    CreateEmailLog, EmailLog, EmailQueueItem, EnqueueEmail, QueueCounts, TemplateCount,
};
use ebic_db::models::message::{CreateMessage, Message};
use ebic_db::models::notification::{CreateNotification, Notification, NotificationFilter};
use ebic_db::models::report::{CreateReport, Report};
use ebic_db::models::status::{EmailStatus, QueueStatus};
use ebic_db::models::submission::SubmissionContact;
use ebic_db::models::template::MessageTemplate;
use ebic_db::models::user::UserContact;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::{
    EmailLogStore, EmailQueue, MessageAuditStore, NotificationStore, PermissionEngine,
    PreferenceStore, ReportStore, StoreHealth, StoreResult, SubmissionStore, TemplateStore,
    UserDirectory,
};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

struct MemoryUser {
    id: DbId,
    email: String,
    name: String,
    is_active: bool,
    grants: Vec<Permission>,
    preferences: Map<String, Value>,
}

#[derive(Default)]
struct Faults {
    notification_users: HashSet<DbId>,
    permission_users: HashSet<DbId>,
    audit: bool,
    email_log: bool,
    ping: bool,
}

#[derive(Default)]
struct State {
    next_id: DbId,
    users: Vec<MemoryUser>,
    notifications: Vec<Notification>,
    templates: Vec<MessageTemplate>,
    messages: Vec<Message>,
    email_logs: Vec<EmailLog>,
    queue: Vec<EmailQueueItem>,
    reports: Vec<Report>,
    submissions: Vec<(SubmissionKind, SubmissionContact)>,
    faults: Faults,
}

impl State {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }
}

/// Every port backed by a single mutex-guarded state.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    paused: AtomicBool,
}

fn injected(what: &str) -> StoreError {
    StoreError::Unavailable(format!("injected {what} failure"))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // -- seeding -------------------------------------------------------------

    /// Add an active user holding the given `(resource, action)` grants.
    pub fn add_user(&self, email: &str, name: &str, grants: &[(&str, &str)]) -> DbId {
        let mut state = self.state();
        let id = state.next_id();
        state.users.push(MemoryUser {
            id,
            email: email.to_string(),
            name: name.to_string(),
            is_active: true,
            grants: grants
                .iter()
                .map(|(resource, action)| Permission::new(*resource, *action))
                .collect(),
            preferences: Map::new(),
        });
        id
    }

    pub fn deactivate_user(&self, user_id: DbId) {
        if let Some(user) = self.state().users.iter_mut().find(|u| u.id == user_id) {
            user.is_active = false;
        }
    }

    /// Replace a user's preference document.
    pub fn set_preferences(&self, user_id: DbId, preferences: Value) {
        if let Some(user) = self.state().users.iter_mut().find(|u| u.id == user_id) {
            user.preferences = match preferences {
                Value::Object(map) => map,
                _ => Map::new(),
            };
        }
    }

    pub fn add_submission(
        &self,
        kind: SubmissionKind,
        name: &str,
        email: &str,
        phone: Option<&str>,
    ) -> DbId {
        let mut state = self.state();
        let id = state.next_id();
        state.submissions.push((
            kind,
            SubmissionContact {
                id,
                name: name.to_string(),
                email: email.to_string(),
                phone: phone.map(str::to_string),
                status: "PENDING".to_string(),
                is_visible: false,
            },
        ));
        id
    }

    pub fn seed_template(
        &self,
        draft: &TemplateDraft,
        is_active: bool,
        is_system: bool,
    ) -> MessageTemplate {
        let mut state = self.state();
        let template = build_template(state.next_id(), draft, is_active, is_system);
        state.templates.push(template.clone());
        template
    }

    /// Seed the two review status-update system templates.
    pub fn seed_status_templates(&self) {
        for draft in status_update_drafts() {
            self.seed_template(&draft, true, true);
        }
    }

    /// Insert an email log row with an explicit creation time.
    pub fn insert_email_log_at(&self, input: CreateEmailLog, created_at: Timestamp) -> EmailLog {
        let mut state = self.state();
        let log = build_email_log(state.next_id(), input, created_at);
        state.email_logs.push(log.clone());
        log
    }

    /// Insert a queue item as if the external consumer had processed it.
    pub fn insert_queue_item(
        &self,
        status: QueueStatus,
        created_at: Timestamp,
        processed_at: Option<Timestamp>,
    ) -> EmailQueueItem {
        let mut state = self.state();
        let item = EmailQueueItem {
            id: state.next_id(),
            template: "admin_notification".to_string(),
            payload: Value::Object(Map::new()),
            status: status.as_str().to_string(),
            attempts: 1,
            max_attempts: 5,
            priority: 0,
            last_error: None,
            processed_at,
            created_at,
        };
        state.queue.push(item.clone());
        item
    }

    /// Backdate a report's `started_at`.
    pub fn set_report_started_at(&self, report_id: DbId, started_at: Timestamp) {
        if let Some(report) = self.state().reports.iter_mut().find(|r| r.id == report_id) {
            report.started_at = Some(started_at);
        }
    }

    // -- fault injection -----------------------------------------------------

    /// Make notification inserts for `user_id` fail.
    pub fn fail_notifications_for(&self, user_id: DbId) {
        self.state().faults.notification_users.insert(user_id);
    }

    /// Make permission lookups for `user_id` fail.
    pub fn fail_permission_lookups_for(&self, user_id: DbId) {
        self.state().faults.permission_users.insert(user_id);
    }

    pub fn fail_audit_writes(&self, fail: bool) {
        self.state().faults.audit = fail;
    }

    pub fn fail_email_log_writes(&self, fail: bool) {
        self.state().faults.email_log = fail;
    }

    pub fn fail_ping(&self, fail: bool) {
        self.state().faults.ping = fail;
    }

    // -- inspection ----------------------------------------------------------

    pub fn notifications_for(&self, user_id: DbId) -> Vec<Notification> {
        self.state()
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state().messages.clone()
    }

    pub fn email_logs(&self) -> Vec<EmailLog> {
        self.state().email_logs.clone()
    }

    pub fn queue_items(&self) -> Vec<EmailQueueItem> {
        self.state().queue.clone()
    }

    pub fn submission(&self, id: DbId) -> Option<SubmissionContact> {
        self.state()
            .submissions
            .iter()
            .find(|(_, s)| s.id == id)
            .map(|(_, s)| s.clone())
    }
}

// ---------------------------------------------------------------------------
// Row builders
// ---------------------------------------------------------------------------

fn build_template(
    id: DbId,
    draft: &TemplateDraft,
    is_active: bool,
    is_system: bool,
) -> MessageTemplate {
    let now = Utc::now();
    MessageTemplate {
        id,
        slug: draft.slug.clone(),
        channel: draft.channel.as_str().to_string(),
        name_ar: draft.name_ar.clone(),
        name_en: draft.name_en.clone(),
        subject_ar: draft.subject_ar.clone(),
        subject_en: draft.subject_en.clone(),
        body_ar: draft.body_ar.clone(),
        body_en: draft.body_en.clone(),
        variables: serde_json::json!(draft.variables),
        is_active,
        is_system,
        created_at: now,
        updated_at: now,
    }
}

fn build_email_log(id: DbId, input: CreateEmailLog, created_at: Timestamp) -> EmailLog {
    EmailLog {
        id,
        to_address: input.to_address,
        subject: input.subject,
        template: input.template,
        status: input.status,
        error_message: input.error_message,
        message_id: input.message_id,
        metadata: input.metadata,
        created_at,
    }
}

/// Drafts of the approved/rejected status-update templates.
pub fn status_update_drafts() -> [TemplateDraft; 2] {
    [
        TemplateDraft {
            slug: SLUG_STATUS_APPROVED.to_string(),
            channel: TemplateChannel::Both,
            name_ar: "تحديث الحالة: تمت الموافقة".to_string(),
            name_en: "Status Update: Approved".to_string(),
            subject_ar: Some("✅ تهانينا! تمت الموافقة على طلبك".to_string()),
            subject_en: Some("✅ Congratulations! Your request has been approved".to_string()),
            body_ar: "مرحباً {{name}}،\n\nيسعدنا إخبارك بأنه تمت الموافقة على طلبك.\n\nالخطوات القادمة:\n{{nextSteps}}".to_string(),
            body_en: "Hello {{name}},\n\nWe are pleased to inform you that your request has been approved.\n\nNext Steps:\n{{nextSteps}}".to_string(),
            variables: vec!["name".into(), "type".into(), "nextSteps".into()],
        },
        TemplateDraft {
            slug: SLUG_STATUS_REJECTED.to_string(),
            channel: TemplateChannel::Both,
            name_ar: "تحديث الحالة: مرفوض".to_string(),
            name_en: "Status Update: Rejected".to_string(),
            subject_ar: Some("تحديث بخصوص طلبك".to_string()),
            subject_en: Some("Update regarding your request".to_string()),
            body_ar: "مرحباً {{name}}،\n\nنأسف لإخبارك بأنه لم يتم قبول طلبك في الوقت الحالي.\n\nالسبب:\n{{reason}}".to_string(),
            body_en: "Hello {{name}},\n\nWe regret to inform you that your request was not accepted at this time.\n\nReason:\n{{reason}}".to_string(),
            variables: vec!["name".into(), "type".into(), "reason".into()],
        },
    ]
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn active_contacts(&self) -> StoreResult<Vec<UserContact>> {
        Ok(self
            .state()
            .users
            .iter()
            .filter(|u| u.is_active && !u.email.is_empty())
            .map(|u| UserContact {
                id: u.id,
                email: u.email.clone(),
                name: u.name.clone(),
                notification_preferences: Value::Object(u.preferences.clone()),
            })
            .collect())
    }
}

#[async_trait]
impl PermissionEngine for MemoryStore {
    async fn has_permission(
        &self,
        user_id: DbId,
        resource: &str,
        action: &str,
    ) -> StoreResult<bool> {
        Ok(self
            .state()
            .users
            .iter()
            .find(|u| u.id == user_id && u.is_active)
            .is_some_and(|u| check_permission(&u.grants, resource, action)))
    }

    async fn user_permissions(&self, user_id: DbId) -> StoreResult<Vec<Permission>> {
        let state = self.state();
        if state.faults.permission_users.contains(&user_id) {
            return Err(injected("permission lookup"));
        }
        Ok(state
            .users
            .iter()
            .find(|u| u.id == user_id && u.is_active)
            .map(|u| u.grants.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn create(&self, input: CreateNotification) -> StoreResult<Notification> {
        let mut state = self.state();
        if state.faults.notification_users.contains(&input.user_id) {
            return Err(injected("notification insert"));
        }
        let now = Utc::now();
        let notification = Notification {
            id: state.next_id(),
            user_id: input.user_id,
            category: input.category,
            title: input.title,
            message: input.message,
            data: input.data,
            is_read: false,
            read_at: None,
            action_url: input.action_url,
            priority: input.priority,
            created_at: now,
            updated_at: now,
        };
        state.notifications.push(notification.clone());
        Ok(notification)
    }

    async fn list(
        &self,
        user_id: DbId,
        filter: &NotificationFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Notification>> {
        let mut rows: Vec<Notification> = self
            .state()
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && filter.matches(n))
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(rows
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(0))
            .collect())
    }

    async fn count(&self, user_id: DbId, filter: &NotificationFilter) -> StoreResult<i64> {
        let count = self
            .state()
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && filter.matches(n))
            .count();
        Ok(count as i64)
    }

    async fn unread_count(&self, user_id: DbId) -> StoreResult<i64> {
        let count = self
            .state()
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .count();
        Ok(count as i64)
    }

    async fn mark_read(&self, id: DbId, user_id: DbId) -> StoreResult<bool> {
        let mut state = self.state();
        let Some(n) = state
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
        else {
            return Ok(false);
        };
        if !n.is_read {
            n.is_read = true;
            n.read_at = Some(Utc::now());
        }
        Ok(true)
    }

    async fn mark_all_read(&self, user_id: DbId) -> StoreResult<u64> {
        let now = Utc::now();
        let mut updated = 0;
        for n in self
            .state()
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.is_read)
        {
            n.is_read = true;
            n.read_at = Some(now);
            updated += 1;
        }
        Ok(updated)
    }

    async fn delete(&self, id: DbId, user_id: DbId) -> StoreResult<bool> {
        let mut state = self.state();
        let before = state.notifications.len();
        state
            .notifications
            .retain(|n| !(n.id == id && n.user_id == user_id));
        Ok(state.notifications.len() < before)
    }
}

#[async_trait]
impl PreferenceStore for MemoryStore {
    async fn get(&self, user_id: DbId) -> StoreResult<Option<NotificationPreferences>> {
        Ok(self
            .state()
            .users
            .iter()
            .find(|u| u.id == user_id)
            .map(|u| NotificationPreferences::from_map(u.preferences.clone())))
    }

    async fn merge(
        &self,
        user_id: DbId,
        patch: &PreferencesPatch,
    ) -> StoreResult<Option<NotificationPreferences>> {
        let mut state = self.state();
        let Some(user) = state.users.iter_mut().find(|u| u.id == user_id) else {
            return Ok(None);
        };
        let mut preferences =
            NotificationPreferences::from_map(std::mem::take(&mut user.preferences));
        preferences.merge(patch);
        user.preferences = preferences.as_map().clone();
        Ok(Some(preferences))
    }
}

#[async_trait]
impl TemplateStore for MemoryStore {
    async fn list(&self) -> StoreResult<Vec<MessageTemplate>> {
        let mut templates = self.state().templates.clone();
        templates.sort_by(|a, b| b.is_system.cmp(&a.is_system).then(a.slug.cmp(&b.slug)));
        Ok(templates)
    }

    async fn find_by_id(&self, id: DbId) -> StoreResult<Option<MessageTemplate>> {
        Ok(self.state().templates.iter().find(|t| t.id == id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> StoreResult<Option<MessageTemplate>> {
        Ok(self
            .state()
            .templates
            .iter()
            .find(|t| t.slug == slug)
            .cloned())
    }

    async fn create(
        &self,
        draft: &TemplateDraft,
        is_active: bool,
    ) -> StoreResult<MessageTemplate> {
        let mut state = self.state();
        if state.templates.iter().any(|t| t.slug == draft.slug) {
            return Err(StoreError::Conflict(format!(
                "template slug '{}' already exists",
                draft.slug
            )));
        }
        let template = build_template(state.next_id(), draft, is_active, false);
        state.templates.push(template.clone());
        Ok(template)
    }

    async fn update(
        &self,
        id: DbId,
        draft: &TemplateDraft,
        is_active: bool,
    ) -> StoreResult<Option<MessageTemplate>> {
        let mut state = self.state();
        let Some(existing) = state.templates.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        let mut updated = build_template(id, draft, is_active, existing.is_system);
        updated.slug = existing.slug.clone();
        updated.created_at = existing.created_at;
        *existing = updated.clone();
        Ok(Some(updated))
    }

    async fn delete(&self, id: DbId) -> StoreResult<bool> {
        let mut state = self.state();
        let before = state.templates.len();
        state.templates.retain(|t| !(t.id == id && !t.is_system));
        Ok(state.templates.len() < before)
    }
}

#[async_trait]
impl MessageAuditStore for MemoryStore {
    async fn record(&self, input: CreateMessage) -> StoreResult<Message> {
        let mut state = self.state();
        if state.faults.audit {
            return Err(injected("audit write"));
        }
        let message = Message {
            id: state.next_id(),
            thread_id: input.thread_id,
            channel: input.channel,
            direction: input.direction,
            from_address: input.from_address,
            to_address: input.to_address,
            subject: input.subject,
            body: input.body,
            status: input.status,
            template_id: input.template_id,
            sent_by: input.sent_by,
            external_id: input.external_id,
            error_message: input.error_message,
            created_at: Utc::now(),
        };
        state.messages.push(message.clone());
        Ok(message)
    }

    async fn list_thread(&self, thread_id: Uuid) -> StoreResult<Vec<Message>> {
        Ok(self
            .state()
            .messages
            .iter()
            .filter(|m| m.thread_id == thread_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl EmailLogStore for MemoryStore {
    async fn record(&self, input: CreateEmailLog) -> StoreResult<EmailLog> {
        let mut state = self.state();
        if state.faults.email_log {
            return Err(injected("email log write"));
        }
        let log = build_email_log(state.next_id(), input, Utc::now());
        state.email_logs.push(log.clone());
        Ok(log)
    }

    async fn find(&self, id: DbId) -> StoreResult<Option<EmailLog>> {
        Ok(self.state().email_logs.iter().find(|l| l.id == id).cloned())
    }

    async fn count_since(
        &self,
        since: Timestamp,
        status: Option<EmailStatus>,
    ) -> StoreResult<i64> {
        let count = self
            .state()
            .email_logs
            .iter()
            .filter(|l| l.created_at >= since)
            .filter(|l| status.map_or(true, |s| l.status == s.as_str()))
            .count();
        Ok(count as i64)
    }

    async fn count_by_template_since(&self, since: Timestamp) -> StoreResult<Vec<TemplateCount>> {
        let mut counts: Vec<TemplateCount> = Vec::new();
        for log in self.state().email_logs.iter().filter(|l| l.created_at >= since) {
            match counts.iter_mut().find(|c| c.template == log.template) {
                Some(entry) => entry.count += 1,
                None => counts.push(TemplateCount {
                    template: log.template.clone(),
                    count: 1,
                }),
            }
        }
        counts.sort_by(|a, b| b.count.cmp(&a.count).then(a.template.cmp(&b.template)));
        Ok(counts)
    }

    async fn failed_since(&self, since: Timestamp, limit: i64) -> StoreResult<Vec<EmailLog>> {
        let mut rows: Vec<EmailLog> = self
            .state()
            .email_logs
            .iter()
            .filter(|l| l.status == EmailStatus::Failed.as_str() && l.created_at >= since)
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }

    async fn outcomes_since(&self, since: Timestamp) -> StoreResult<Vec<(Timestamp, String)>> {
        Ok(self
            .state()
            .email_logs
            .iter()
            .filter(|l| l.created_at >= since)
            .map(|l| (l.created_at, l.status.clone()))
            .collect())
    }

    async fn delete_failed_before(&self, cutoff: Timestamp) -> StoreResult<u64> {
        let mut state = self.state();
        let before = state.email_logs.len();
        state
            .email_logs
            .retain(|l| !(l.status == EmailStatus::Failed.as_str() && l.created_at < cutoff));
        Ok((before - state.email_logs.len()) as u64)
    }
}

#[async_trait]
impl EmailQueue for MemoryStore {
    async fn enqueue(&self, input: EnqueueEmail) -> StoreResult<EmailQueueItem> {
        let mut state = self.state();
        let item = EmailQueueItem {
            id: state.next_id(),
            template: input.template,
            payload: input.payload,
            status: QueueStatus::Pending.as_str().to_string(),
            attempts: 0,
            max_attempts: input.max_attempts,
            priority: input.priority,
            last_error: None,
            processed_at: None,
            created_at: Utc::now(),
        };
        state.queue.push(item.clone());
        Ok(item)
    }

    async fn counts(&self) -> StoreResult<QueueCounts> {
        let state = self.state();
        let count = |status: QueueStatus| {
            state
                .queue
                .iter()
                .filter(|i| i.status == status.as_str())
                .count() as i64
        };
        Ok(QueueCounts {
            waiting: count(QueueStatus::Pending),
            active: count(QueueStatus::Running),
            completed: count(QueueStatus::Completed),
            failed: count(QueueStatus::Failed),
        })
    }

    async fn avg_processing_ms_since(&self, since: Timestamp) -> StoreResult<i64> {
        let durations: Vec<i64> = self
            .state()
            .queue
            .iter()
            .filter(|i| i.status == QueueStatus::Completed.as_str() && i.created_at >= since)
            .filter_map(|i| i.processed_at.map(|done| (done - i.created_at).num_milliseconds()))
            .collect();
        Ok(ebic_core::monitor::average_processing_ms(&durations))
    }

    async fn is_paused(&self) -> StoreResult<bool> {
        Ok(self.paused.load(Ordering::SeqCst))
    }

    async fn set_paused(&self, paused: bool) -> StoreResult<bool> {
        Ok(self.paused.swap(paused, Ordering::SeqCst))
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn create(&self, created_by: DbId, input: &CreateReport) -> StoreResult<Report> {
        let mut state = self.state();
        let now = Utc::now();
        let report = Report {
            id: state.next_id(),
            name: input.name.clone(),
            report_type: input.report_type.as_str().to_string(),
            format: input.format.as_str().to_string(),
            status: ReportStatus::Pending.as_str().to_string(),
            parameters: input.parameters.clone().map(Value::Object),
            file_url: None,
            generated_at: None,
            error_message: None,
            started_at: None,
            created_by_id: created_by,
            created_at: now,
            updated_at: now,
        };
        state.reports.push(report.clone());
        Ok(report)
    }

    async fn list_for_user(&self, user_id: DbId) -> StoreResult<Vec<Report>> {
        let mut rows: Vec<Report> = self
            .state()
            .reports
            .iter()
            .filter(|r| r.created_by_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(rows)
    }

    async fn find(&self, id: DbId) -> StoreResult<Option<Report>> {
        Ok(self.state().reports.iter().find(|r| r.id == id).cloned())
    }

    async fn delete(&self, id: DbId, user_id: DbId) -> StoreResult<bool> {
        let mut state = self.state();
        let before = state.reports.len();
        state
            .reports
            .retain(|r| !(r.id == id && r.created_by_id == user_id));
        Ok(state.reports.len() < before)
    }

    async fn claim_next_pending(&self) -> StoreResult<Option<Report>> {
        let mut state = self.state();
        let next = state
            .reports
            .iter_mut()
            .filter(|r| can_move(r, ReportStatus::Generating))
            .min_by_key(|r| (r.created_at, r.id));
        Ok(next.map(|report| {
            let now = Utc::now();
            report.status = ReportStatus::Generating.as_str().to_string();
            report.started_at = Some(now);
            report.updated_at = now;
            report.clone()
        }))
    }

    async fn complete(&self, id: DbId, file_url: &str) -> StoreResult<bool> {
        let mut state = self.state();
        let Some(report) = state
            .reports
            .iter_mut()
            .find(|r| r.id == id && can_move(r, ReportStatus::Completed))
        else {
            return Ok(false);
        };
        let now = Utc::now();
        report.status = ReportStatus::Completed.as_str().to_string();
        report.file_url = Some(file_url.to_string());
        report.generated_at = Some(now);
        report.error_message = None;
        report.updated_at = now;
        Ok(true)
    }

    async fn fail(&self, id: DbId, error: &str) -> StoreResult<bool> {
        let mut state = self.state();
        let Some(report) = state
            .reports
            .iter_mut()
            .find(|r| r.id == id && can_move(r, ReportStatus::Failed))
        else {
            return Ok(false);
        };
        mark_failed(report, error);
        Ok(true)
    }

    async fn fail_stale(&self, started_before: Timestamp, error: &str) -> StoreResult<u64> {
        let mut failed = 0;
        for report in self.state().reports.iter_mut().filter(|r| {
            can_move(r, ReportStatus::Failed)
                && r.started_at.is_some_and(|at| at < started_before)
        }) {
            mark_failed(report, error);
            failed += 1;
        }
        Ok(failed)
    }
}

/// Whether the stored status of `report` may move to `next`.
fn can_move(report: &Report, next: ReportStatus) -> bool {
    report
        .status
        .parse::<ReportStatus>()
        .is_ok_and(|status| status.can_transition_to(next))
}

fn mark_failed(report: &mut Report, error: &str) {
    report.status = ReportStatus::Failed.as_str().to_string();
    report.error_message = Some(error.to_string());
    report.file_url = None;
    report.generated_at = None;
    report.updated_at = Utc::now();
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn set_status(
        &self,
        kind: SubmissionKind,
        id: DbId,
        decision: ReviewDecision,
    ) -> StoreResult<Option<SubmissionContact>> {
        let mut state = self.state();
        let Some((_, contact)) = state
            .submissions
            .iter_mut()
            .find(|(k, s)| *k == kind && s.id == id)
        else {
            return Ok(None);
        };
        contact.status = decision.record_status().to_string();
        contact.is_visible |= decision.is_approved();
        Ok(Some(contact.clone()))
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        if self.state().faults.ping {
            return Err(injected("ping"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ebic_core::report::{ReportFormat, ReportType};

    fn report_input() -> CreateReport {
        CreateReport {
            name: "Q1".into(),
            report_type: ReportType::UserActivity,
            format: ReportFormat::Csv,
            parameters: None,
        }
    }

    #[tokio::test]
    async fn set_paused_returns_previous_value() {
        let store = MemoryStore::new();
        assert!(!store.set_paused(true).await.unwrap());
        assert!(store.set_paused(true).await.unwrap());
        assert!(store.set_paused(false).await.unwrap());
        assert!(!store.is_paused().await.unwrap());
    }

    #[tokio::test]
    async fn claim_takes_oldest_pending_once() {
        let store = MemoryStore::new();
        let first = ReportStore::create(&store, 1, &report_input()).await.unwrap();
        let second = ReportStore::create(&store, 1, &report_input()).await.unwrap();

        assert_eq!(store.claim_next_pending().await.unwrap().unwrap().id, first.id);
        assert_eq!(store.claim_next_pending().await.unwrap().unwrap().id, second.id);
        assert!(store.claim_next_pending().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn complete_requires_generating() {
        let store = MemoryStore::new();
        let report = ReportStore::create(&store, 1, &report_input()).await.unwrap();
        assert!(!store.complete(report.id, "/x").await.unwrap());
        store.claim_next_pending().await.unwrap();
        assert!(store.complete(report.id, "/x").await.unwrap());
        assert!(!store.fail(report.id, "late").await.unwrap());
    }

    #[tokio::test]
    async fn system_templates_survive_delete() {
        let store = MemoryStore::new();
        store.seed_status_templates();
        let template = store
            .find_by_slug(SLUG_STATUS_APPROVED)
            .await
            .unwrap()
            .unwrap();
        assert!(!TemplateStore::delete(&store, template.id).await.unwrap());
    }

    #[test]
    fn seeded_status_templates_are_valid() {
        for draft in status_update_drafts() {
            assert!(draft.validate().is_empty(), "{}", draft.slug);
        }
    }
}
