//! Repository for the `reports` table.
//!
//! Status changes are guarded in SQL so only forward transitions of the
//! report lifecycle are ever applied.

use ebic_core::report::ReportStatus;
use ebic_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::report::{CreateReport, Report};

const COLUMNS: &str = "id, name, type, format, status, parameters, file_url, generated_at, \
                       error_message, started_at, created_by_id, created_at, updated_at";

pub struct ReportRepo;

impl ReportRepo {
    /// Insert a `PENDING` report owned by `created_by`.
    pub async fn create(
        pool: &PgPool,
        created_by: DbId,
        input: &CreateReport,
    ) -> Result<Report, sqlx::Error> {
        let query = format!(
            "INSERT INTO reports (name, type, format, parameters, created_by_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Report>(&query)
            .bind(&input.name)
            .bind(input.report_type.as_str())
            .bind(input.format.as_str())
            .bind(input.parameters.clone().map(serde_json::Value::Object))
            .bind(created_by)
            .fetch_one(pool)
            .await
    }

    /// A user's reports, newest first.
    pub async fn list_for_user(pool: &PgPool, user_id: DbId) -> Result<Vec<Report>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM reports WHERE created_by_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Report>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Report>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM reports WHERE id = $1");
        sqlx::query_as::<_, Report>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Delete a report owned by `user_id`.
    pub async fn delete(pool: &PgPool, id: DbId, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM reports WHERE id = $1 AND created_by_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Atomically move the oldest `PENDING` report to `GENERATING`.
    ///
    /// Uses `FOR UPDATE SKIP LOCKED` so concurrent workers never claim the
    /// same report.
    pub async fn claim_next_pending(pool: &PgPool) -> Result<Option<Report>, sqlx::Error> {
        let query = format!(
            "UPDATE reports SET status = $1, started_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM reports \
                 WHERE status = $2 \
                 ORDER BY created_at, id \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Report>(&query)
            .bind(ReportStatus::Generating.as_str())
            .bind(ReportStatus::Pending.as_str())
            .fetch_optional(pool)
            .await
    }

    /// `GENERATING -> COMPLETED`. Returns `false` if the report was not
    /// generating (deleted, or already finished).
    pub async fn complete(pool: &PgPool, id: DbId, file_url: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE reports \
             SET status = $2, file_url = $3, generated_at = NOW(), error_message = NULL \
             WHERE id = $1 AND status = $4",
        )
        .bind(id)
        .bind(ReportStatus::Completed.as_str())
        .bind(file_url)
        .bind(ReportStatus::Generating.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// `GENERATING -> FAILED`.
    pub async fn fail(pool: &PgPool, id: DbId, error: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE reports \
             SET status = $2, error_message = $3, file_url = NULL, generated_at = NULL \
             WHERE id = $1 AND status = $4",
        )
        .bind(id)
        .bind(ReportStatus::Failed.as_str())
        .bind(error)
        .bind(ReportStatus::Generating.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Fail every report that started generating before `started_before`.
    pub async fn fail_stale(
        pool: &PgPool,
        started_before: Timestamp,
        error: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE reports \
             SET status = $1, error_message = $2, file_url = NULL, generated_at = NULL \
             WHERE status = $3 AND started_at < $4",
        )
        .bind(ReportStatus::Failed.as_str())
        .bind(error)
        .bind(ReportStatus::Generating.as_str())
        .bind(started_before)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
