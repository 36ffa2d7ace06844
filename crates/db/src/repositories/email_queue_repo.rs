//! Repository for the `email_queue` table.
//!
//! Items are consumed out of process; this side only enqueues and reports.

use ebic_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::email::{EmailQueueItem, EnqueueEmail, QueueCounts};
use crate::models::status::QueueStatus;

const COLUMNS: &str = "id, template, payload, status, attempts, max_attempts, priority, \
                       last_error, processed_at, created_at";

pub struct EmailQueueRepo;

impl EmailQueueRepo {
    pub async fn enqueue(
        pool: &PgPool,
        input: &EnqueueEmail,
    ) -> Result<EmailQueueItem, sqlx::Error> {
        let query = format!(
            "INSERT INTO email_queue (template, payload, priority, max_attempts) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EmailQueueItem>(&query)
            .bind(&input.template)
            .bind(&input.payload)
            .bind(input.priority)
            .bind(input.max_attempts)
            .fetch_one(pool)
            .await
    }

    /// Item counts per status across the whole queue.
    pub async fn counts(pool: &PgPool) -> Result<QueueCounts, sqlx::Error> {
        sqlx::query_as::<_, QueueCounts>(
            "SELECT \
                COUNT(*) FILTER (WHERE status = $1) AS waiting, \
                COUNT(*) FILTER (WHERE status = $2) AS active, \
                COUNT(*) FILTER (WHERE status = $3) AS completed, \
                COUNT(*) FILTER (WHERE status = $4) AS failed \
             FROM email_queue",
        )
        .bind(QueueStatus::Pending.as_str())
        .bind(QueueStatus::Running.as_str())
        .bind(QueueStatus::Completed.as_str())
        .bind(QueueStatus::Failed.as_str())
        .fetch_one(pool)
        .await
    }

    /// Mean enqueue-to-finish time of items completed since `since`, in ms.
    pub async fn avg_processing_ms_since(
        pool: &PgPool,
        since: Timestamp,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COALESCE(ROUND(AVG(EXTRACT(EPOCH FROM (processed_at - created_at)) * 1000)), 0)::BIGINT \
             FROM email_queue \
             WHERE status = $1 AND processed_at IS NOT NULL AND created_at >= $2",
        )
        .bind(QueueStatus::Completed.as_str())
        .bind(since)
        .fetch_one(pool)
        .await
    }
}
