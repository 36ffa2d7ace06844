//! Repository for the `email_logs` table.

use ebic_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::email::{CreateEmailLog, EmailLog, TemplateCount};
use crate::models::status::EmailStatus;

const COLUMNS: &str = "id, to_address, subject, template, status, error_message, message_id, \
                       metadata, created_at";

pub struct EmailLogRepo;

impl EmailLogRepo {
    pub async fn create(pool: &PgPool, input: &CreateEmailLog) -> Result<EmailLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO email_logs \
                (to_address, subject, template, status, error_message, message_id, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EmailLog>(&query)
            .bind(&input.to_address)
            .bind(&input.subject)
            .bind(&input.template)
            .bind(&input.status)
            .bind(&input.error_message)
            .bind(&input.message_id)
            .bind(&input.metadata)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<EmailLog>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM email_logs WHERE id = $1");
        sqlx::query_as::<_, EmailLog>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Count rows created at or after `since`, optionally of one status.
    pub async fn count_since(
        pool: &PgPool,
        since: Timestamp,
        status: Option<EmailStatus>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM email_logs \
             WHERE created_at >= $1 AND ($2::TEXT IS NULL OR status = $2)",
        )
        .bind(since)
        .bind(status.map(|s| s.as_str()))
        .fetch_one(pool)
        .await
    }

    /// Per-template send counts, busiest first.
    pub async fn count_by_template_since(
        pool: &PgPool,
        since: Timestamp,
    ) -> Result<Vec<TemplateCount>, sqlx::Error> {
        sqlx::query_as::<_, TemplateCount>(
            "SELECT template, COUNT(*) AS count FROM email_logs \
             WHERE created_at >= $1 \
             GROUP BY template \
             ORDER BY count DESC, template",
        )
        .bind(since)
        .fetch_all(pool)
        .await
    }

    /// Most recent failures at or after `since`, newest first.
    pub async fn failed_since(
        pool: &PgPool,
        since: Timestamp,
        limit: i64,
    ) -> Result<Vec<EmailLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM email_logs \
             WHERE status = $1 AND created_at >= $2 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $3"
        );
        sqlx::query_as::<_, EmailLog>(&query)
            .bind(EmailStatus::Failed.as_str())
            .bind(since)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// `(created_at, status)` of every row at or after `since`, for hourly
    /// bucketing.
    pub async fn outcomes_since(
        pool: &PgPool,
        since: Timestamp,
    ) -> Result<Vec<(Timestamp, String)>, sqlx::Error> {
        sqlx::query_as::<_, (Timestamp, String)>(
            "SELECT created_at, status FROM email_logs WHERE created_at >= $1",
        )
        .bind(since)
        .fetch_all(pool)
        .await
    }

    /// Delete failed rows created before `cutoff`; returns the count.
    pub async fn delete_failed_before(
        pool: &PgPool,
        cutoff: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM email_logs WHERE status = $1 AND created_at < $2")
            .bind(EmailStatus::Failed.as_str())
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
