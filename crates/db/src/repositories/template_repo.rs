//! Repository for the `message_templates` table.

use ebic_core::template::TemplateDraft;
use ebic_core::types::DbId;
use sqlx::PgPool;

use crate::models::template::MessageTemplate;

const COLUMNS: &str = "id, slug, channel, name_ar, name_en, subject_ar, subject_en, \
                       body_ar, body_en, variables, is_active, is_system, created_at, updated_at";

/// Provides CRUD operations for message templates.
///
/// Callers validate drafts before they reach this layer; the slug unique
/// constraint (`uq_message_templates_slug`) is the last line against
/// duplicates.
pub struct TemplateRepo;

impl TemplateRepo {
    /// All templates, system ones first, then by slug.
    pub async fn list(pool: &PgPool) -> Result<Vec<MessageTemplate>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM message_templates ORDER BY is_system DESC, slug"
        );
        sqlx::query_as::<_, MessageTemplate>(&query)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<MessageTemplate>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM message_templates WHERE id = $1");
        sqlx::query_as::<_, MessageTemplate>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Look a template up by slug, active or not.
    pub async fn find_by_slug(
        pool: &PgPool,
        slug: &str,
    ) -> Result<Option<MessageTemplate>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM message_templates WHERE slug = $1");
        sqlx::query_as::<_, MessageTemplate>(&query)
            .bind(slug)
            .fetch_optional(pool)
            .await
    }

    /// Insert an operator-authored (non-system) template.
    pub async fn create(
        pool: &PgPool,
        draft: &TemplateDraft,
        is_active: bool,
    ) -> Result<MessageTemplate, sqlx::Error> {
        let query = format!(
            "INSERT INTO message_templates \
                (slug, channel, name_ar, name_en, subject_ar, subject_en, body_ar, body_en, \
                 variables, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MessageTemplate>(&query)
            .bind(&draft.slug)
            .bind(draft.channel.as_str())
            .bind(&draft.name_ar)
            .bind(&draft.name_en)
            .bind(&draft.subject_ar)
            .bind(&draft.subject_en)
            .bind(&draft.body_ar)
            .bind(&draft.body_en)
            .bind(serde_json::json!(draft.variables))
            .bind(is_active)
            .fetch_one(pool)
            .await
    }

    /// Overwrite the editable fields. The slug is never changed here.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        draft: &TemplateDraft,
        is_active: bool,
    ) -> Result<Option<MessageTemplate>, sqlx::Error> {
        let query = format!(
            "UPDATE message_templates SET \
                channel = $2, name_ar = $3, name_en = $4, subject_ar = $5, subject_en = $6, \
                body_ar = $7, body_en = $8, variables = $9, is_active = $10 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MessageTemplate>(&query)
            .bind(id)
            .bind(draft.channel.as_str())
            .bind(&draft.name_ar)
            .bind(&draft.name_en)
            .bind(&draft.subject_ar)
            .bind(&draft.subject_en)
            .bind(&draft.body_ar)
            .bind(&draft.body_en)
            .bind(serde_json::json!(draft.variables))
            .bind(is_active)
            .fetch_optional(pool)
            .await
    }

    /// Delete a non-system template. System templates are never removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM message_templates WHERE id = $1 AND is_system = false")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
