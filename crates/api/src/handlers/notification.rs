//! Handlers for the `/notifications` resource.
//!
//! Every endpoint acts on the caller's own notifications and requires
//! `dashboard:read`.

use axum::extract::{Path, Query, State};
use axum::Json;
use ebic_core::error::CoreError;
use ebic_core::notification::{Category, NotificationPreferences, PreferencesPatch, Priority};
use ebic_core::types::DbId;
use ebic_db::models::notification::{Notification, NotificationFilter};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppResult;
use crate::middleware::rbac::DashboardReader;
use crate::query::{PageParams, Pagination};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(rename = "type")]
    pub category: Option<String>,
    pub is_read: Option<bool>,
    pub priority: Option<String>,
}

impl NotificationQuery {
    /// Validate the filters against the known categories and priorities.
    fn filter(&self) -> Result<NotificationFilter, CoreError> {
        let category = self
            .category
            .as_deref()
            .map(str::parse::<Category>)
            .transpose()?;
        let priority = self
            .priority
            .as_deref()
            .map(str::parse::<Priority>)
            .transpose()?;
        Ok(NotificationFilter {
            category: category.map(|c| c.as_str().to_string()),
            is_read: self.is_read,
            priority: priority.map(|p| p.as_str().to_string()),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPage {
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
    pub pagination: Pagination,
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// GET /api/v1/notifications
pub async fn list_notifications(
    DashboardReader(auth): DashboardReader,
    State(state): State<AppState>,
    Query(params): Query<NotificationQuery>,
) -> AppResult<Json<DataResponse<NotificationPage>>> {
    let filter = params.filter()?;
    let (page, limit, offset) = PageParams {
        page: params.page,
        limit: params.limit,
    }
    .resolve();

    let store = &state.notifications;
    let notifications = store.list(auth.user_id, &filter, limit, offset).await?;
    let total = store.count(auth.user_id, &filter).await?;
    let unread_count = store.unread_count(auth.user_id).await?;

    Ok(Json(DataResponse {
        data: NotificationPage {
            notifications,
            unread_count,
            pagination: Pagination::new(page, limit, total),
        },
    }))
}

/// GET /api/v1/notifications/unread-count
pub async fn unread_count(
    DashboardReader(auth): DashboardReader,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Value>>> {
    let count = state.notifications.unread_count(auth.user_id).await?;
    Ok(Json(DataResponse {
        data: serde_json::json!({ "count": count }),
    }))
}

/// PATCH /api/v1/notifications/{id}/read
///
/// 404 when the notification does not belong to the caller.
pub async fn mark_read(
    DashboardReader(auth): DashboardReader,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Value>>> {
    let found = state.notifications.mark_read(id, auth.user_id).await?;
    if !found {
        return Err(CoreError::NotFound {
            entity: "Notification",
            id,
        }
        .into());
    }
    Ok(Json(DataResponse {
        data: serde_json::json!({ "success": true }),
    }))
}

/// PATCH /api/v1/notifications/mark-all-read
pub async fn mark_all_read(
    DashboardReader(auth): DashboardReader,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Value>>> {
    let updated = state.notifications.mark_all_read(auth.user_id).await?;
    tracing::debug!(user_id = auth.user_id, updated, "Marked all notifications read");
    Ok(Json(DataResponse {
        data: serde_json::json!({ "updated": updated }),
    }))
}

/// DELETE /api/v1/notifications/{id}
pub async fn delete_notification(
    DashboardReader(auth): DashboardReader,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Value>>> {
    let deleted = state.notifications.delete(id, auth.user_id).await?;
    if !deleted {
        return Err(CoreError::NotFound {
            entity: "Notification",
            id,
        }
        .into());
    }
    Ok(Json(DataResponse {
        data: serde_json::json!({ "success": true }),
    }))
}

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

/// GET /api/v1/notifications/preferences
pub async fn get_preferences(
    DashboardReader(auth): DashboardReader,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<NotificationPreferences>>> {
    let prefs = state
        .preferences
        .get(auth.user_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "User",
            id: auth.user_id,
        })?;
    Ok(Json(DataResponse { data: prefs }))
}

/// PUT /api/v1/notifications/preferences
///
/// Merges the body into the stored document; keys not sent are kept.
pub async fn update_preferences(
    DashboardReader(auth): DashboardReader,
    State(state): State<AppState>,
    Json(body): Json<Map<String, Value>>,
) -> AppResult<Json<DataResponse<NotificationPreferences>>> {
    let patch = PreferencesPatch::parse(body)?;
    let merged = state
        .preferences
        .merge(auth.user_id, &patch)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "User",
            id: auth.user_id,
        })?;
    tracing::info!(user_id = auth.user_id, keys = patch.as_map().len(), "Notification preferences updated");
    Ok(Json(DataResponse { data: merged }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn filter_accepts_known_values() {
        let q = NotificationQuery {
            category: Some("NEW_COLLABORATOR".into()),
            priority: Some("HIGH".into()),
            is_read: Some(false),
            ..Default::default()
        };
        let f = q.filter().unwrap();
        assert_eq!(f.category.as_deref(), Some("NEW_COLLABORATOR"));
        assert_eq!(f.priority.as_deref(), Some("HIGH"));
        assert_eq!(f.is_read, Some(false));
    }

    #[test]
    fn filter_rejects_unknown_type() {
        let q = NotificationQuery {
            category: Some("BIRTHDAY".into()),
            ..Default::default()
        };
        assert_matches!(q.filter(), Err(CoreError::Validation(_)));
    }
}
