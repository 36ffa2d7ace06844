//! Public submissions (collaborators, innovators) as seen by the review flow.

use ebic_core::types::DbId;
use serde::Serialize;
use sqlx::FromRow;

/// Contact details of a reviewed submission, after its status update.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionContact {
    pub id: DbId,
    /// Company name for collaborators, person name for innovators.
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub status: String,
    pub is_visible: bool,
}
