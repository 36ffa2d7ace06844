//! Role-based permission lookups.
//!
//! A `manage` grant on a resource satisfies any action on that resource.
//! Inactive users hold no permissions.

use ebic_core::permissions::actions::MANAGE;
use ebic_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::PermissionRow;

pub struct PermissionRepo;

impl PermissionRepo {
    /// All grants reachable through the user's role.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<PermissionRow>, sqlx::Error> {
        sqlx::query_as::<_, PermissionRow>(
            "SELECT p.resource, p.action \
             FROM users u \
             JOIN role_permissions rp ON rp.role_id = u.role_id \
             JOIN permissions p ON p.id = rp.permission_id \
             WHERE u.id = $1 AND u.is_active = true \
             ORDER BY p.resource, p.action",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn has_permission(
        pool: &PgPool,
        user_id: DbId,
        resource: &str,
        action: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS ( \
                 SELECT 1 \
                 FROM users u \
                 JOIN role_permissions rp ON rp.role_id = u.role_id \
                 JOIN permissions p ON p.id = rp.permission_id \
                 WHERE u.id = $1 AND u.is_active = true \
                   AND p.resource = $2 AND (p.action = $3 OR p.action = $4) \
             )",
        )
        .bind(user_id)
        .bind(resource)
        .bind(action)
        .bind(MANAGE)
        .fetch_one(pool)
        .await
    }
}
