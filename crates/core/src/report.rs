//! Report export lifecycle.
//!
//! ```text
//! PENDING --claim--> GENERATING --ok--> COMPLETED
//!                               \--err-> FAILED
//! ```
//!
//! Transitions only move forward; nothing is skipped or revisited.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

pub const MAX_REPORT_NAME_LENGTH: usize = 200;

/// Error recorded on reports found stuck in `GENERATING` after a restart.
pub const INTERRUPTED_MESSAGE: &str = "generation interrupted";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReportStatus {
    Pending,
    Generating,
    Completed,
    Failed,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Pending => "PENDING",
            ReportStatus::Generating => "GENERATING",
            ReportStatus::Completed => "COMPLETED",
            ReportStatus::Failed => "FAILED",
        }
    }

    pub fn can_transition_to(self, next: ReportStatus) -> bool {
        matches!(
            (self, next),
            (ReportStatus::Pending, ReportStatus::Generating)
                | (ReportStatus::Generating, ReportStatus::Completed)
                | (ReportStatus::Generating, ReportStatus::Failed)
        )
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ReportStatus::Pending),
            "GENERATING" => Ok(ReportStatus::Generating),
            "COMPLETED" => Ok(ReportStatus::Completed),
            "FAILED" => Ok(ReportStatus::Failed),
            other => Err(CoreError::Validation(format!("Unknown report status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportType {
    SubmissionsSummary,
    UserActivity,
    StrategicPlans,
    FullPlatform,
}

impl ReportType {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportType::SubmissionsSummary => "SUBMISSIONS_SUMMARY",
            ReportType::UserActivity => "USER_ACTIVITY",
            ReportType::StrategicPlans => "STRATEGIC_PLANS",
            ReportType::FullPlatform => "FULL_PLATFORM",
        }
    }
}

impl FromStr for ReportType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUBMISSIONS_SUMMARY" => Ok(ReportType::SubmissionsSummary),
            "USER_ACTIVITY" => Ok(ReportType::UserActivity),
            "STRATEGIC_PLANS" => Ok(ReportType::StrategicPlans),
            "FULL_PLATFORM" => Ok(ReportType::FullPlatform),
            other => Err(CoreError::Validation(format!("Unknown report type '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReportFormat {
    Pdf,
    Csv,
}

impl ReportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportFormat::Pdf => "PDF",
            ReportFormat::Csv => "CSV",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Pdf => "pdf",
            ReportFormat::Csv => "csv",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PDF" => Ok(ReportFormat::Pdf),
            "CSV" => Ok(ReportFormat::Csv),
            other => Err(CoreError::Validation(format!("Unknown report format '{other}'"))),
        }
    }
}

/// Public link under which a finished report is served.
pub fn download_url(report_id: DbId) -> String {
    format!("/api/v1/reports/{report_id}/download")
}

pub fn validate_report_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation("Report name must not be empty".into()));
    }
    if name.chars().count() > MAX_REPORT_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "Report name exceeds {MAX_REPORT_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const ALL: [ReportStatus; 4] = [
        ReportStatus::Pending,
        ReportStatus::Generating,
        ReportStatus::Completed,
        ReportStatus::Failed,
    ];

    #[test]
    fn only_forward_transitions_are_allowed() {
        let allowed: Vec<_> = ALL
            .iter()
            .flat_map(|from| ALL.iter().map(move |to| (*from, *to)))
            .filter(|(from, to)| from.can_transition_to(*to))
            .collect();
        assert_eq!(
            allowed,
            vec![
                (ReportStatus::Pending, ReportStatus::Generating),
                (ReportStatus::Generating, ReportStatus::Completed),
                (ReportStatus::Generating, ReportStatus::Failed),
            ]
        );
    }

    #[test]
    fn enums_parse_wire_names() {
        assert_eq!("FULL_PLATFORM".parse::<ReportType>().unwrap(), ReportType::FullPlatform);
        assert_eq!("CSV".parse::<ReportFormat>().unwrap().extension(), "csv");
        assert_matches!("XLSX".parse::<ReportFormat>(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn report_names_are_checked() {
        assert!(validate_report_name("Q1 submissions").is_ok());
        assert!(validate_report_name("  ").is_err());
        assert!(validate_report_name(&"n".repeat(201)).is_err());
    }
}
