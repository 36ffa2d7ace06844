//! Report export rows and DTOs.

use ebic_core::report::{ReportFormat, ReportType};
use ebic_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `reports` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: DbId,
    pub name: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub report_type: String,
    pub format: String,
    pub status: String,
    pub parameters: Option<serde_json::Value>,
    pub file_url: Option<String>,
    pub generated_at: Option<Timestamp>,
    pub error_message: Option<String>,
    pub started_at: Option<Timestamp>,
    pub created_by_id: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for requesting a new report.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReport {
    pub name: String,
    #[serde(rename = "type")]
    pub report_type: ReportType,
    pub format: ReportFormat,
    pub parameters: Option<serde_json::Map<String, serde_json::Value>>,
}
