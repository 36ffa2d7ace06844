//! Resource/action permission vocabulary.
//!
//! Role-to-permission resolution lives outside this crate; here we only
//! know how to name a permission and how a set of grants answers a check.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub mod resources {
    pub const USERS: &str = "users";
    pub const NEWS: &str = "news";
    pub const COLLABORATORS: &str = "collaborators";
    pub const INNOVATORS: &str = "innovators";
    pub const DASHBOARD: &str = "dashboard";
    pub const SETTINGS: &str = "settings";
    pub const INVITATIONS: &str = "invitations";
    pub const CONTENT: &str = "content";
    pub const TEMPLATES: &str = "templates";
    pub const MESSAGES: &str = "messages";
    pub const REPORTS: &str = "reports";
    pub const STRATEGIC_PLANS: &str = "strategic_plans";

    pub const ALL: &[&str] = &[
        USERS,
        NEWS,
        COLLABORATORS,
        INNOVATORS,
        DASHBOARD,
        SETTINGS,
        INVITATIONS,
        CONTENT,
        TEMPLATES,
        MESSAGES,
        REPORTS,
        STRATEGIC_PLANS,
    ];
}

pub mod actions {
    pub const CREATE: &str = "create";
    pub const READ: &str = "read";
    pub const UPDATE: &str = "update";
    pub const DELETE: &str = "delete";
    /// Grants every other action on the same resource.
    pub const MANAGE: &str = "manage";
    pub const INVITE: &str = "invite";
    pub const APPROVE: &str = "approve";
    pub const REJECT: &str = "reject";

    pub const ALL: &[&str] = &[CREATE, READ, UPDATE, DELETE, MANAGE, INVITE, APPROVE, REJECT];
}

/// A single `resource:action` grant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    pub resource: String,
    pub action: String,
}

impl Permission {
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
        }
    }

    /// Parse `"resource:action"`. A bare `"resource"` means `resource:manage`.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let (resource, action) = match raw.split_once(':') {
            Some((resource, action)) => (resource.trim(), action.trim()),
            None => (raw.trim(), actions::MANAGE),
        };

        if !resources::ALL.contains(&resource) {
            return Err(CoreError::Validation(format!(
                "Unknown permission resource '{resource}'"
            )));
        }
        let action = if action.is_empty() {
            actions::MANAGE
        } else {
            action
        };
        if !actions::ALL.contains(&action) {
            return Err(CoreError::Validation(format!(
                "Unknown permission action '{action}'"
            )));
        }

        Ok(Self::new(resource, action))
    }

    /// Whether this grant satisfies a check for `resource`/`action`.
    pub fn allows(&self, resource: &str, action: &str) -> bool {
        self.resource == resource && (self.action == action || self.action == actions::MANAGE)
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.resource, self.action)
    }
}

/// Answer a permission check against a user's grant list.
pub fn check_permission(grants: &[Permission], resource: &str, action: &str) -> bool {
    grants.iter().any(|p| p.allows(resource, action))
}
