//! User rows as seen by the messaging core.

use ebic_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: DbId,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub role_id: Option<DbId>,
    pub is_active: bool,
    pub notification_preferences: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// An active user with a deliverable email address, plus the preference
/// document used to gate admin notifications.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContact {
    pub id: DbId,
    pub email: String,
    pub name: String,
    pub notification_preferences: serde_json::Value,
}

/// A single `resource:action` grant row.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct PermissionRow {
    pub resource: String,
    pub action: String,
}
