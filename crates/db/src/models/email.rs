//! Email delivery log and queue rows.

use ebic_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `email_logs` table: one per email send attempt.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailLog {
    pub id: DbId,
    #[serde(rename = "to")]
    pub to_address: String,
    pub subject: String,
    pub template: String,
    pub status: String,
    pub error_message: Option<String>,
    pub message_id: Option<String>,
    /// Everything needed to rebuild the send (`to`, `subject`, `body`, ...).
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateEmailLog {
    pub to_address: String,
    pub subject: String,
    pub template: String,
    pub status: String,
    pub error_message: Option<String>,
    pub message_id: Option<String>,
    pub metadata: serde_json::Value,
}

/// Send count for one template slug.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct TemplateCount {
    pub template: String,
    pub count: i64,
}

/// A row from the `email_queue` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailQueueItem {
    pub id: DbId,
    pub template: String,
    pub payload: serde_json::Value,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub priority: i32,
    pub last_error: Option<String>,
    pub processed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// Enqueue request for the external email consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct EnqueueEmail {
    pub template: String,
    pub payload: serde_json::Value,
    pub priority: i32,
    pub max_attempts: i32,
}

/// Item counts per queue status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize)]
pub struct QueueCounts {
    pub waiting: i64,
    pub active: i64,
    pub completed: i64,
    pub failed: i64,
}
