//! Status updates on public submissions.

use ebic_core::review::{ReviewDecision, SubmissionKind};
use ebic_core::types::DbId;
use sqlx::PgPool;

use crate::models::submission::SubmissionContact;

pub struct SubmissionRepo;

impl SubmissionRepo {
    /// Record a review decision and return the submission's contact details.
    ///
    /// Approval also makes the submission publicly visible.
    pub async fn set_status(
        pool: &PgPool,
        kind: SubmissionKind,
        id: DbId,
        decision: ReviewDecision,
    ) -> Result<Option<SubmissionContact>, sqlx::Error> {
        let query = match kind {
            SubmissionKind::Collaborator => {
                "UPDATE collaborators \
                 SET status = $2, is_visible = (is_visible OR $3) \
                 WHERE id = $1 \
                 RETURNING id, company_name AS name, email, phone, status, is_visible"
            }
            SubmissionKind::Innovator => {
                "UPDATE innovators \
                 SET status = $2, is_visible = (is_visible OR $3) \
                 WHERE id = $1 \
                 RETURNING id, name, email, phone, status, is_visible"
            }
        };
        sqlx::query_as::<_, SubmissionContact>(query)
            .bind(id)
            .bind(decision.record_status())
            .bind(decision.is_approved())
            .fetch_optional(pool)
            .await
    }
}
