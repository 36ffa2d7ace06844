//! Admin notification categories, priorities and opt-out preferences.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::permissions::{actions, resources, Permission};
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// The semantic kind of an admin notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    NewRegistration,
    NewCollaborator,
    NewInnovator,
    SubmissionApproved,
    SubmissionRejected,
    SystemError,
    SecurityAlert,
    UserAccountCreated,
    RoleChanged,
    DatabaseBackupComplete,
    FailedLoginAttempts,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::NewRegistration,
        Category::NewCollaborator,
        Category::NewInnovator,
        Category::SubmissionApproved,
        Category::SubmissionRejected,
        Category::SystemError,
        Category::SecurityAlert,
        Category::UserAccountCreated,
        Category::RoleChanged,
        Category::DatabaseBackupComplete,
        Category::FailedLoginAttempts,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::NewRegistration => "NEW_REGISTRATION",
            Category::NewCollaborator => "NEW_COLLABORATOR",
            Category::NewInnovator => "NEW_INNOVATOR",
            Category::SubmissionApproved => "SUBMISSION_APPROVED",
            Category::SubmissionRejected => "SUBMISSION_REJECTED",
            Category::SystemError => "SYSTEM_ERROR",
            Category::SecurityAlert => "SECURITY_ALERT",
            Category::UserAccountCreated => "USER_ACCOUNT_CREATED",
            Category::RoleChanged => "ROLE_CHANGED",
            Category::DatabaseBackupComplete => "DATABASE_BACKUP_COMPLETE",
            Category::FailedLoginAttempts => "FAILED_LOGIN_ATTEMPTS",
        }
    }

    /// The preference switch that gates this category.
    ///
    /// Every current category has one; the `Option` keeps new categories
    /// fail-open until they are given a switch.
    pub fn preference_key(self) -> Option<PreferenceKey> {
        let key = match self {
            Category::NewRegistration | Category::NewCollaborator | Category::NewInnovator => {
                PreferenceKey::NewSubmissions
            }
            Category::SubmissionApproved | Category::SubmissionRejected => {
                PreferenceKey::StatusChanges
            }
            Category::SystemError => PreferenceKey::SystemErrors,
            Category::SecurityAlert | Category::FailedLoginAttempts => {
                PreferenceKey::SecurityAlerts
            }
            Category::UserAccountCreated | Category::RoleChanged => PreferenceKey::UserActivity,
            Category::DatabaseBackupComplete => PreferenceKey::Backups,
        };
        Some(key)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown notification type '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Normal => "NORMAL",
            Priority::High => "HIGH",
            Priority::Urgent => "URGENT",
        }
    }
}

impl FromStr for Priority {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Priority::Low),
            "NORMAL" => Ok(Priority::Normal),
            "HIGH" => Ok(Priority::High),
            "URGENT" => Ok(Priority::Urgent),
            other => Err(CoreError::Validation(format!("Unknown priority '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

/// Boolean opt-out switches stored in a user's preference document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceKey {
    NewSubmissions,
    StatusChanges,
    SystemErrors,
    SecurityAlerts,
    UserActivity,
    Backups,
}

impl PreferenceKey {
    pub const ALL: [PreferenceKey; 6] = [
        PreferenceKey::NewSubmissions,
        PreferenceKey::StatusChanges,
        PreferenceKey::SystemErrors,
        PreferenceKey::SecurityAlerts,
        PreferenceKey::UserActivity,
        PreferenceKey::Backups,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PreferenceKey::NewSubmissions => "emailNewSubmissions",
            PreferenceKey::StatusChanges => "emailStatusChanges",
            PreferenceKey::SystemErrors => "emailSystemErrors",
            PreferenceKey::SecurityAlerts => "emailSecurityAlerts",
            PreferenceKey::UserActivity => "emailUserActivity",
            PreferenceKey::Backups => "emailBackups",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        PreferenceKey::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

/// Key of the digest selector inside the preference document.
pub const DIGEST_MODE_KEY: &str = "digestMode";

/// Requested delivery cadence.
///
/// Only `Immediate` changes delivery behaviour; batching is not implemented
/// and the other values are stored and echoed back as-is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestMode {
    #[default]
    Immediate,
    Daily,
    Weekly,
}

impl DigestMode {
    pub fn is_batched(self) -> bool {
        !matches!(self, DigestMode::Immediate)
    }
}

/// A user's notification preference document.
///
/// Stored as a JSON object. Missing keys mean "send"; a switch is off only
/// when it is explicitly `false`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationPreferences(Map<String, Value>);

impl NotificationPreferences {
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Build from a stored JSON value. Anything that is not an object is
    /// treated as empty.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn is_enabled(&self, key: PreferenceKey) -> bool {
        !matches!(self.0.get(key.as_str()), Some(Value::Bool(false)))
    }

    /// Whether a notification of `category` should be delivered.
    pub fn allows(&self, category: Category) -> bool {
        category
            .preference_key()
            .map_or(true, |key| self.is_enabled(key))
    }

    pub fn digest_mode(&self) -> DigestMode {
        self.0
            .get(DIGEST_MODE_KEY)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    /// Overlay `patch` onto these preferences. Keys not in the patch survive.
    pub fn merge(&mut self, patch: &PreferencesPatch) {
        for (k, v) in &patch.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }
}

/// A validated partial preference update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferencesPatch(Map<String, Value>);

impl PreferencesPatch {
    /// Validate an incoming update body.
    ///
    /// Known switches must be booleans and `digestMode` must name a mode.
    /// Unknown keys are rejected so typos do not silently accumulate.
    pub fn parse(body: Map<String, Value>) -> Result<Self, CoreError> {
        let mut errors = Vec::new();
        for (key, value) in &body {
            if key == DIGEST_MODE_KEY {
                if serde_json::from_value::<DigestMode>(value.clone()).is_err() {
                    errors.push(format!(
                        "{DIGEST_MODE_KEY} must be one of immediate, daily, weekly"
                    ));
                }
            } else if PreferenceKey::from_name(key).is_some() {
                if !value.is_boolean() {
                    errors.push(format!("{key} must be a boolean"));
                }
            } else {
                errors.push(format!("Unknown preference '{key}'"));
            }
        }

        if errors.is_empty() {
            Ok(Self(body))
        } else {
            Err(CoreError::Validation(errors.join("; ")))
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// One logical admin event to fan out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationRequest {
    pub category: Category,
    pub title: String,
    pub message: String,
    pub action_url: Option<String>,
    pub priority: Priority,
    pub payload: Option<Value>,
    /// Extra grant that also qualifies a user, on top of dashboard access.
    pub required_permission: Option<Permission>,
}

impl NotificationRequest {
    pub fn new(category: Category, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            category,
            title: title.into(),
            message: message.into(),
            action_url: None,
            priority: Priority::Normal,
            payload: None,
            required_permission: None,
        }
    }

    pub fn with_action_url(mut self, url: impl Into<String>) -> Self {
        self.action_url = Some(url.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn requiring(mut self, permission: Permission) -> Self {
        self.required_permission = Some(permission);
        self
    }

    pub fn new_collaborator(id: DbId, company_name: &str, email: &str) -> Self {
        Self::new(
            Category::NewCollaborator,
            "New Collaborator Registration",
            format!("{company_name} ({email}) has registered as a collaborator."),
        )
        .with_action_url(format!("/admin/collaborators?id={id}"))
        .with_priority(Priority::High)
        .with_payload(serde_json::json!({ "id": id, "companyName": company_name, "email": email }))
        .requiring(Permission::new(resources::COLLABORATORS, actions::MANAGE))
    }

    pub fn new_innovator(id: DbId, name: &str, email: &str) -> Self {
        Self::new(
            Category::NewInnovator,
            "New Innovator Registration",
            format!("{name} ({email}) has submitted an innovation."),
        )
        .with_action_url(format!("/admin/innovators?id={id}"))
        .with_priority(Priority::High)
        .with_payload(serde_json::json!({ "id": id, "name": name, "email": email }))
        .requiring(Permission::new(resources::INNOVATORS, actions::MANAGE))
    }

    pub fn system_error(message: &str, details: Option<Value>) -> Self {
        let req = Self::new(Category::SystemError, "System Error", message)
            .with_action_url("/admin/system/logs")
            .with_priority(Priority::Urgent);
        match details {
            Some(details) => req.with_payload(details),
            None => req,
        }
    }

    pub fn security_alert(message: &str, details: Option<Value>) -> Self {
        let req = Self::new(Category::SecurityAlert, "Security Alert", message)
            .with_priority(Priority::Urgent);
        match details {
            Some(details) => req.with_payload(details),
            None => req,
        }
    }

    pub fn failed_login_attempts(email: &str, attempts: u32, ip_address: Option<&str>) -> Self {
        let origin = ip_address.map(|ip| format!(" from {ip}")).unwrap_or_default();
        Self::new(
            Category::FailedLoginAttempts,
            "Failed Login Attempts",
            format!("{attempts} failed login attempts for {email}{origin}."),
        )
        .with_priority(Priority::High)
        .with_payload(serde_json::json!({
            "email": email,
            "attempts": attempts,
            "ipAddress": ip_address,
        }))
    }

    /// Tell admins that a submission was reviewed.
    pub fn submission_reviewed(kind: &str, id: DbId, name: &str, approved: bool) -> Self {
        let (category, verb) = if approved {
            (Category::SubmissionApproved, "approved")
        } else {
            (Category::SubmissionRejected, "rejected")
        };
        Self::new(
            category,
            format!("Submission {verb}"),
            format!("The {kind} submission from {name} was {verb}."),
        )
        .with_payload(serde_json::json!({ "id": id, "type": kind, "name": name }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn prefs(value: Value) -> NotificationPreferences {
        NotificationPreferences::from_value(value)
    }

    #[test]
    fn category_round_trips_through_str() {
        for c in Category::ALL {
            assert_eq!(c.as_str().parse::<Category>().unwrap(), c);
        }
        assert_matches!("NOPE".parse::<Category>(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn submission_categories_share_one_switch() {
        assert_eq!(
            Category::NewCollaborator.preference_key(),
            Some(PreferenceKey::NewSubmissions)
        );
        assert_eq!(
            Category::NewInnovator.preference_key(),
            Some(PreferenceKey::NewSubmissions)
        );
        assert_eq!(
            Category::FailedLoginAttempts.preference_key(),
            Some(PreferenceKey::SecurityAlerts)
        );
    }

    #[test]
    fn empty_preferences_allow_everything() {
        let p = NotificationPreferences::default();
        assert!(Category::ALL.into_iter().all(|c| p.allows(c)));
    }

    #[test]
    fn only_explicit_false_disables() {
        let p = prefs(json!({ "emailNewSubmissions": false, "emailSystemErrors": "no" }));
        assert!(!p.allows(Category::NewCollaborator));
        assert!(p.allows(Category::SystemError));
        assert!(p.allows(Category::SecurityAlert));
    }

    #[test]
    fn non_object_value_is_empty() {
        assert_eq!(prefs(Value::Null), NotificationPreferences::default());
    }

    #[test]
    fn digest_mode_defaults_to_immediate() {
        assert_eq!(prefs(json!({})).digest_mode(), DigestMode::Immediate);
        assert_eq!(prefs(json!({ "digestMode": "weekly" })).digest_mode(), DigestMode::Weekly);
        assert_eq!(prefs(json!({ "digestMode": 3 })).digest_mode(), DigestMode::Immediate);
    }

    #[test]
    fn merge_keeps_unspecified_keys() {
        let mut p = prefs(json!({ "emailNewSubmissions": false, "digestMode": "daily" }));
        let patch = PreferencesPatch::parse(
            json!({ "emailBackups": true }).as_object().unwrap().clone(),
        )
        .unwrap();
        p.merge(&patch);
        assert_eq!(
            p.into_value(),
            json!({ "emailNewSubmissions": false, "digestMode": "daily", "emailBackups": true })
        );
    }

    #[test]
    fn patch_rejects_bad_values() {
        let body = json!({ "emailBackups": "yes", "digestMode": "hourly", "colour": "red" });
        let err = PreferencesPatch::parse(body.as_object().unwrap().clone()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("emailBackups must be a boolean"));
        assert!(msg.contains("digestMode must be one of"));
        assert!(msg.contains("Unknown preference 'colour'"));
    }

    #[test]
    fn new_collaborator_requires_collaborator_management() {
        let req = NotificationRequest::new_collaborator(12, "Acme", "ops@acme.ly");
        assert_eq!(req.priority, Priority::High);
        assert_eq!(req.action_url.as_deref(), Some("/admin/collaborators?id=12"));
        assert_eq!(
            req.required_permission,
            Some(Permission::new("collaborators", "manage"))
        );
    }

    #[test]
    fn system_error_is_urgent_without_extra_permission() {
        let req = NotificationRequest::system_error("disk full", None);
        assert_eq!(req.priority, Priority::Urgent);
        assert!(req.required_permission.is_none());
        assert!(req.payload.is_none());
    }

    #[test]
    fn security_alert_is_urgent_and_carries_details() {
        let req = NotificationRequest::security_alert("token reuse", Some(json!({ "userId": 4 })));
        assert_eq!(req.category, Category::SecurityAlert);
        assert_eq!(req.title, "Security Alert");
        assert_eq!(req.priority, Priority::Urgent);
        assert_eq!(req.payload, Some(json!({ "userId": 4 })));
        assert!(req.action_url.is_none());
        assert!(req.required_permission.is_none());
    }

    #[test]
    fn failed_login_attempts_mentions_origin() {
        let req = NotificationRequest::failed_login_attempts("ops@ebic.ly", 5, Some("10.0.0.7"));
        assert_eq!(req.category, Category::FailedLoginAttempts);
        assert_eq!(req.priority, Priority::High);
        assert_eq!(req.message, "5 failed login attempts for ops@ebic.ly from 10.0.0.7.");
        assert_eq!(
            req.payload,
            Some(json!({ "email": "ops@ebic.ly", "attempts": 5, "ipAddress": "10.0.0.7" }))
        );

        let req = NotificationRequest::failed_login_attempts("ops@ebic.ly", 3, None);
        assert_eq!(req.message, "3 failed login attempts for ops@ebic.ly.");
        assert_eq!(req.payload.unwrap()["ipAddress"], Value::Null);
    }
}
