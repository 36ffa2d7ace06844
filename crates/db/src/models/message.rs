//! Append-only message audit rows.

use ebic_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A row from the `messages` table. Never updated after insert.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: DbId,
    pub thread_id: Uuid,
    pub channel: String,
    pub direction: String,
    pub from_address: String,
    pub to_address: String,
    pub subject: Option<String>,
    pub body: String,
    pub status: String,
    pub template_id: Option<DbId>,
    pub sent_by: Option<DbId>,
    pub external_id: Option<String>,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
}

/// Insert payload for one channel attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateMessage {
    pub thread_id: Uuid,
    pub channel: String,
    pub direction: String,
    pub from_address: String,
    pub to_address: String,
    pub subject: Option<String>,
    pub body: String,
    pub status: String,
    pub template_id: Option<DbId>,
    pub sent_by: Option<DbId>,
    pub external_id: Option<String>,
    pub error_message: Option<String>,
}
