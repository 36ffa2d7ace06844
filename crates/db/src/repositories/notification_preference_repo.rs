//! Repository for the `users.notification_preferences` document.

use ebic_core::types::DbId;
use sqlx::PgPool;

/// Reads and merges per-user notification preferences.
pub struct NotificationPreferenceRepo;

impl NotificationPreferenceRepo {
    /// Fetch a user's preference document. `None` if the user does not exist.
    pub async fn get(pool: &PgPool, user_id: DbId) -> Result<Option<serde_json::Value>, sqlx::Error> {
        sqlx::query_scalar("SELECT notification_preferences FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Shallow-merge `patch` into the stored document in a single statement,
    /// returning the merged result. Keys absent from `patch` are preserved.
    pub async fn merge(
        pool: &PgPool,
        user_id: DbId,
        patch: &serde_json::Value,
    ) -> Result<Option<serde_json::Value>, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE users \
             SET notification_preferences = COALESCE(notification_preferences, '{}'::jsonb) || $2 \
             WHERE id = $1 \
             RETURNING notification_preferences",
        )
        .bind(user_id)
        .bind(patch)
        .fetch_optional(pool)
        .await
    }
}
