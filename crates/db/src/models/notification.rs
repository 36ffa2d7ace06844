//! Admin notification rows and DTOs.

use ebic_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `notifications` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: DbId,
    pub user_id: DbId,
    /// Category wire name, e.g. `NEW_COLLABORATOR`.
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub category: String,
    pub title: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub action_url: Option<String>,
    pub priority: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Insert payload for a single recipient's notification.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateNotification {
    pub user_id: DbId,
    pub category: String,
    pub title: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
    pub action_url: Option<String>,
    pub priority: String,
}

/// Optional filters for listing a user's notifications.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationFilter {
    pub category: Option<String>,
    pub is_read: Option<bool>,
    pub priority: Option<String>,
}

impl NotificationFilter {
    /// Whether `n` passes every set filter.
    pub fn matches(&self, n: &Notification) -> bool {
        self.category.as_ref().map_or(true, |c| *c == n.category)
            && self.is_read.map_or(true, |r| r == n.is_read)
            && self.priority.as_ref().map_or(true, |p| *p == n.priority)
    }
}
