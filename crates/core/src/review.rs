//! Submission review decisions and the status-update message they trigger.

use serde::{Deserialize, Serialize};

use crate::template::Variables;

pub const SLUG_STATUS_APPROVED: &str = "status_update_approved";
pub const SLUG_STATUS_REJECTED: &str = "status_update_rejected";

const APPROVED_NEXT_STEPS: [&str; 2] = [
    "Your submission is now visible on our platform",
    "You will be contacted for further steps",
];

const REJECTED_NEXT_STEPS: [&str; 2] = [
    "You can submit a new application with improved details",
    "Contact support for assistance",
];

/// Which kind of public submission is being reviewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionKind {
    Collaborator,
    Innovator,
}

impl SubmissionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionKind::Collaborator => "collaborator",
            SubmissionKind::Innovator => "innovator",
        }
    }

    /// Entity name used in not-found errors.
    pub fn entity(self) -> &'static str {
        match self {
            SubmissionKind::Collaborator => "Collaborator",
            SubmissionKind::Innovator => "Innovator",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl ReviewDecision {
    /// Value written to the submission's `status` column.
    pub fn record_status(self) -> &'static str {
        match self {
            ReviewDecision::Approved => "APPROVED",
            ReviewDecision::Rejected => "REJECTED",
        }
    }

    pub fn template_slug(self) -> &'static str {
        match self {
            ReviewDecision::Approved => SLUG_STATUS_APPROVED,
            ReviewDecision::Rejected => SLUG_STATUS_REJECTED,
        }
    }

    pub fn next_steps(self) -> &'static [&'static str] {
        match self {
            ReviewDecision::Approved => &APPROVED_NEXT_STEPS,
            ReviewDecision::Rejected => &REJECTED_NEXT_STEPS,
        }
    }

    pub fn is_approved(self) -> bool {
        matches!(self, ReviewDecision::Approved)
    }
}

/// Template variables for the status-update message.
pub fn status_update_variables(
    kind: SubmissionKind,
    decision: ReviewDecision,
    name: &str,
    reason: Option<&str>,
) -> Variables {
    let mut vars = Variables::new();
    vars.insert("name".into(), name.to_string());
    vars.insert("type".into(), kind.as_str().to_string());
    vars.insert(
        "nextSteps".into(),
        decision
            .next_steps()
            .iter()
            .map(|step| format!("- {step}"))
            .collect::<Vec<_>>()
            .join("\n"),
    );
    if let Some(reason) = reason.filter(|r| !r.trim().is_empty()) {
        vars.insert("reason".into(), reason.to_string());
    }
    vars
}
