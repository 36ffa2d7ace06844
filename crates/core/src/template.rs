//! Message template content: placeholder interpolation and save-time
//! validation.
//!
//! Templates carry `{{name}}` placeholders. Every placeholder used in a
//! subject or body must appear in the template's declared variable list.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::channels::{Channel, Locale, TemplateChannel};
use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const MAX_SLUG_LENGTH: usize = 100;
pub const MAX_NAME_LENGTH: usize = 200;
pub const MAX_SUBJECT_LENGTH: usize = 300;
pub const MAX_BODY_LENGTH: usize = 20_000;

/// Matches `{{name}}` tokens.
pub const PLACEHOLDER_PATTERN: &str = r"\{\{([A-Za-z_][A-Za-z0-9_]*)\}\}";

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PLACEHOLDER_PATTERN).expect("valid regex"));

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:[_-][a-z0-9]+)*$").expect("valid regex"));

static VARIABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

/// Template variables supplied by the caller of a templated send.
pub type Variables = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

/// Subject/body pair for one locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedContent {
    pub subject: Option<String>,
    pub body: String,
}

impl LocalizedContent {
    /// Substitute `variables` into both subject and body.
    pub fn render(&self, variables: &Variables) -> LocalizedContent {
        LocalizedContent {
            subject: self.subject.as_deref().map(|s| interpolate(s, variables)),
            body: interpolate(&self.body, variables),
        }
    }
}

/// Fields of a template as written by an operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDraft {
    pub slug: String,
    pub channel: TemplateChannel,
    pub name_ar: String,
    pub name_en: String,
    pub subject_ar: Option<String>,
    pub subject_en: Option<String>,
    pub body_ar: String,
    pub body_en: String,
    pub variables: Vec<String>,
}

impl TemplateDraft {
    pub fn content(&self, locale: Locale) -> LocalizedContent {
        match locale {
            Locale::Ar => LocalizedContent {
                subject: self.subject_ar.clone(),
                body: self.body_ar.clone(),
            },
            Locale::En => LocalizedContent {
                subject: self.subject_en.clone(),
                body: self.body_en.clone(),
            },
        }
    }

    /// Check the draft before it is persisted.
    ///
    /// Returns an empty `Vec` if valid; otherwise a list of human-readable
    /// errors.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !SLUG_RE.is_match(&self.slug) || self.slug.len() > MAX_SLUG_LENGTH {
            errors.push(format!(
                "Slug must be lowercase letters, digits, '_' or '-' (max {MAX_SLUG_LENGTH} chars)"
            ));
        }

        for (label, name) in [("nameAr", &self.name_ar), ("nameEn", &self.name_en)] {
            if name.trim().is_empty() {
                errors.push(format!("{label} must not be empty"));
            } else if name.chars().count() > MAX_NAME_LENGTH {
                errors.push(format!("{label} exceeds {MAX_NAME_LENGTH} characters"));
            }
        }

        for (label, body) in [("bodyAr", &self.body_ar), ("bodyEn", &self.body_en)] {
            if body.trim().is_empty() {
                errors.push(format!("{label} must not be empty"));
            } else if body.chars().count() > MAX_BODY_LENGTH {
                errors.push(format!("{label} exceeds {MAX_BODY_LENGTH} characters"));
            }
        }

        let needs_subject = self.channel.includes(Channel::Email);
        for (label, subject) in [("subjectAr", &self.subject_ar), ("subjectEn", &self.subject_en)]
        {
            match subject.as_deref().map(str::trim) {
                Some(s) if s.chars().count() > MAX_SUBJECT_LENGTH => {
                    errors.push(format!("{label} exceeds {MAX_SUBJECT_LENGTH} characters"));
                }
                None | Some("") if needs_subject => {
                    errors.push(format!("{label} is required for email templates"));
                }
                _ => {}
            }
        }

        errors.extend(validate_variables(&self.variables));

        let declared: BTreeSet<&str> = self.variables.iter().map(String::as_str).collect();
        let texts = [
            self.subject_ar.as_deref().unwrap_or_default(),
            self.subject_en.as_deref().unwrap_or_default(),
            self.body_ar.as_str(),
            self.body_en.as_str(),
        ];
        let undeclared: BTreeSet<String> = texts
            .iter()
            .flat_map(|t| placeholders(t))
            .filter(|p| !declared.contains(p.as_str()))
            .collect();
        if !undeclared.is_empty() {
            let names: Vec<String> = undeclared.into_iter().collect();
            errors.push(format!("Undeclared placeholders: {}", names.join(", ")));
        }

        errors
    }

    /// [`validate`](Self::validate) folded into a single `CoreError`.
    pub fn ensure_valid(&self) -> Result<(), CoreError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Validation(errors.join("; ")))
        }
    }
}

// ---------------------------------------------------------------------------
// Placeholders
// ---------------------------------------------------------------------------

/// Replace every `{{key}}` occurrence for each supplied variable.
///
/// Placeholders without a supplied value are left in place. Substituted
/// values are not themselves scanned for placeholders.
pub fn interpolate(text: &str, variables: &Variables) -> String {
    PLACEHOLDER_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            match variables.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Placeholder names used in `text`, in order of first appearance.
pub fn placeholders(text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for caps in PLACEHOLDER_RE.captures_iter(text) {
        let name = caps[1].to_string();
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

fn validate_variables(variables: &[String]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = BTreeSet::new();
    for name in variables {
        if !VARIABLE_RE.is_match(name) {
            errors.push(format!("Invalid variable name '{name}'"));
        }
        if !seen.insert(name.as_str()) {
            errors.push(format!("Duplicate variable '{name}'"));
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Variables {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn draft() -> TemplateDraft {
        TemplateDraft {
            slug: "status_update_approved".into(),
            channel: TemplateChannel::Both,
            name_ar: "تحديث الحالة".into(),
            name_en: "Status update".into(),
            subject_ar: Some("تهانينا {{name}}".into()),
            subject_en: Some("Congratulations {{name}}".into()),
            body_ar: "مرحباً {{name}}\n{{nextSteps}}".into(),
            body_en: "Hello {{name}}\n{{nextSteps}}".into(),
            variables: vec!["name".into(), "nextSteps".into()],
        }
    }

    #[test]
    fn interpolate_replaces_every_occurrence() {
        let out = interpolate("{{name}} / {{name}}", &vars(&[("name", "Sara")]));
        assert_eq!(out, "Sara / Sara");
    }

    #[test]
    fn interpolate_leaves_unknown_placeholders() {
        let out = interpolate("Hi {{name}}, {{missing}}", &vars(&[("name", "Ali")]));
        assert_eq!(out, "Hi Ali, {{missing}}");
    }

    #[test]
    fn interpolate_does_not_rescan_values() {
        let out = interpolate(
            "{{a}}",
            &vars(&[("a", "{{b}}"), ("b", "should not appear")]),
        );
        assert_eq!(out, "{{b}}");
    }

    #[test]
    fn placeholders_deduplicate_in_order() {
        assert_eq!(
            placeholders("{{b}} {{a}} {{b}} {{ spaced }}"),
            vec!["b".to_string(), "a".to_string()]
        );
    }

    #[test]
    fn render_uses_locale_content() {
        let rendered = draft()
            .content(Locale::En)
            .render(&vars(&[("name", "Sara"), ("nextSteps", "- wait")]));
        assert_eq!(rendered.subject.as_deref(), Some("Congratulations Sara"));
        assert_eq!(rendered.body, "Hello Sara\n- wait");
    }

    #[test]
    fn valid_draft_has_no_errors() {
        assert!(draft().validate().is_empty());
    }

    #[test]
    fn undeclared_placeholder_is_reported() {
        let mut d = draft();
        d.body_en.push_str(" {{reason}}");
        let errors = d.validate();
        assert_eq!(errors, vec!["Undeclared placeholders: reason".to_string()]);
    }

    #[test]
    fn email_templates_need_subjects() {
        let mut d = draft();
        d.subject_ar = None;
        assert!(d
            .validate()
            .contains(&"subjectAr is required for email templates".to_string()));

        d.channel = TemplateChannel::Whatsapp;
        assert!(d.validate().is_empty());
    }

    #[test]
    fn bad_slug_and_variables_are_reported() {
        let mut d = draft();
        d.slug = "Bad Slug".into();
        d.variables.push("name".into());
        d.variables.push("9lives".into());
        let errors = d.validate();
        assert!(errors.iter().any(|e| e.starts_with("Slug must be")));
        assert!(errors.contains(&"Duplicate variable 'name'".to_string()));
        assert!(errors.contains(&"Invalid variable name '9lives'".to_string()));
    }
}
