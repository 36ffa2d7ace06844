//! Repository for the `queue_controls` pause switches.

use sqlx::PgPool;

pub struct QueueControlRepo;

impl QueueControlRepo {
    /// `false` for a queue that has never been paused.
    pub async fn is_paused(pool: &PgPool, queue_name: &str) -> Result<bool, sqlx::Error> {
        let paused: Option<bool> =
            sqlx::query_scalar("SELECT is_paused FROM queue_controls WHERE queue_name = $1")
                .bind(queue_name)
                .fetch_optional(pool)
                .await?;
        Ok(paused.unwrap_or(false))
    }

    /// Set the pause flag and return its previous value.
    ///
    /// The read and write happen under one row lock, so concurrent callers
    /// observe a consistent sequence of previous values.
    pub async fn set_paused(
        pool: &PgPool,
        queue_name: &str,
        paused: bool,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "INSERT INTO queue_controls (queue_name) VALUES ($1) \
             ON CONFLICT (queue_name) DO NOTHING",
        )
        .bind(queue_name)
        .execute(&mut *tx)
        .await?;

        let previous: bool = sqlx::query_scalar(
            "SELECT is_paused FROM queue_controls WHERE queue_name = $1 FOR UPDATE",
        )
        .bind(queue_name)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE queue_controls SET is_paused = $2 WHERE queue_name = $1")
            .bind(queue_name)
            .bind(paused)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(previous)
    }
}
