//! Repository for the `users` table.

use ebic_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::{User, UserContact};

const COLUMNS: &str = "id, email, name, phone, role_id, is_active, notification_preferences, \
                       created_at, updated_at";

pub struct UserRepo;

impl UserRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Active users with a non-empty email address, ordered by id.
    pub async fn list_active_contacts(pool: &PgPool) -> Result<Vec<UserContact>, sqlx::Error> {
        sqlx::query_as::<_, UserContact>(
            "SELECT id, email, name, notification_preferences \
             FROM users \
             WHERE is_active = true AND email <> '' \
             ORDER BY id",
        )
        .fetch_all(pool)
        .await
    }
}
