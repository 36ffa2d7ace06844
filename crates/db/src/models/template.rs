//! Message template rows and DTOs.

use ebic_core::channels::{Locale, TemplateChannel};
use ebic_core::error::CoreError;
use ebic_core::template::{LocalizedContent, TemplateDraft};
use ebic_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `message_templates` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageTemplate {
    pub id: DbId,
    pub slug: String,
    pub channel: String,
    pub name_ar: String,
    pub name_en: String,
    pub subject_ar: Option<String>,
    pub subject_en: Option<String>,
    pub body_ar: String,
    pub body_en: String,
    /// JSON array of declared placeholder names.
    pub variables: serde_json::Value,
    pub is_active: bool,
    pub is_system: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl MessageTemplate {
    pub fn channel(&self) -> Result<TemplateChannel, CoreError> {
        self.channel.parse()
    }

    pub fn variable_names(&self) -> Vec<String> {
        serde_json::from_value(self.variables.clone()).unwrap_or_default()
    }

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

    pub fn name(&self, locale: Locale) -> &str {
        match locale {
            Locale::Ar => &self.name_ar,
            Locale::En => &self.name_en,
        }
    }

    /// The editable fields of this row, for re-validation after an update.
    pub fn to_draft(&self) -> Result<TemplateDraft, CoreError> {
        Ok(TemplateDraft {
            slug: self.slug.clone(),
            channel: self.channel()?,
            name_ar: self.name_ar.clone(),
            name_en: self.name_en.clone(),
            subject_ar: self.subject_ar.clone(),
            subject_en: self.subject_en.clone(),
            body_ar: self.body_ar.clone(),
            body_en: self.body_en.clone(),
            variables: self.variable_names(),
        })
    }
}

/// DTO for creating a template.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplate {
    pub slug: String,
    pub channel: TemplateChannel,
    pub name_ar: String,
    pub name_en: String,
    pub subject_ar: Option<String>,
    pub subject_en: Option<String>,
    pub body_ar: String,
    pub body_en: String,
    #[serde(default)]
    pub variables: Vec<String>,
    pub is_active: Option<bool>,
}

impl CreateTemplate {
    pub fn to_draft(&self) -> TemplateDraft {
        TemplateDraft {
            slug: self.slug.clone(),
            channel: self.channel,
            name_ar: self.name_ar.clone(),
            name_en: self.name_en.clone(),
            subject_ar: self.subject_ar.clone(),
            subject_en: self.subject_en.clone(),
            body_ar: self.body_ar.clone(),
            body_en: self.body_en.clone(),
            variables: self.variables.clone(),
        }
    }
}

/// DTO for updating a template. All fields are optional; the slug may be
/// echoed back but never changed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTemplate {
    pub slug: Option<String>,
    pub channel: Option<TemplateChannel>,
    pub name_ar: Option<String>,
    pub name_en: Option<String>,
    pub subject_ar: Option<String>,
    pub subject_en: Option<String>,
    pub body_ar: Option<String>,
    pub body_en: Option<String>,
    pub variables: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

impl UpdateTemplate {
    /// Overlay this update on an existing draft.
    pub fn apply(&self, mut draft: TemplateDraft) -> Result<TemplateDraft, CoreError> {
        if let Some(slug) = &self.slug {
            if *slug != draft.slug {
                return Err(CoreError::Validation("Template slug cannot be changed".into()));
            }
        }
        if let Some(channel) = self.channel {
            draft.channel = channel;
        }
        if let Some(v) = &self.name_ar {
            draft.name_ar = v.clone();
        }
        if let Some(v) = &self.name_en {
            draft.name_en = v.clone();
        }
        if let Some(v) = &self.subject_ar {
            draft.subject_ar = Some(v.clone());
        }
        if let Some(v) = &self.subject_en {
            draft.subject_en = Some(v.clone());
        }
        if let Some(v) = &self.body_ar {
            draft.body_ar = v.clone();
        }
        if let Some(v) = &self.body_en {
            draft.body_en = v.clone();
        }
        if let Some(v) = &self.variables {
            draft.variables = v.clone();
        }
        Ok(draft)
    }
}
