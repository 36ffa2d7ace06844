//! Repository for the append-only `messages` audit table.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::message::{CreateMessage, Message};

const COLUMNS: &str = "id, thread_id, channel, direction, from_address, to_address, subject, \
                       body, status, template_id, sent_by, external_id, error_message, created_at";

pub struct MessageRepo;

impl MessageRepo {
    /// Record one channel attempt. Rows are never updated afterwards.
    pub async fn create(pool: &PgPool, input: &CreateMessage) -> Result<Message, sqlx::Error> {
        let query = format!(
            "INSERT INTO messages \
                (thread_id, channel, direction, from_address, to_address, subject, body, \
                 status, template_id, sent_by, external_id, error_message) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(input.thread_id)
            .bind(&input.channel)
            .bind(&input.direction)
            .bind(&input.from_address)
            .bind(&input.to_address)
            .bind(&input.subject)
            .bind(&input.body)
            .bind(&input.status)
            .bind(input.template_id)
            .bind(input.sent_by)
            .bind(&input.external_id)
            .bind(&input.error_message)
            .fetch_one(pool)
            .await
    }

    /// Every attempt of one dispatch, in insert order.
    pub async fn list_by_thread(
        pool: &PgPool,
        thread_id: Uuid,
    ) -> Result<Vec<Message>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM messages WHERE thread_id = $1 ORDER BY id");
        sqlx::query_as::<_, Message>(&query)
            .bind(thread_id)
            .fetch_all(pool)
            .await
    }
}
