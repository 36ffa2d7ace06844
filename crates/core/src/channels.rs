//! Delivery channels and content locales.
//!
//! These must match the values stored in `messages.channel`,
//! `message_templates.channel` and `message_templates.*_ar|_en` columns.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A single delivery medium with its own sender and failure domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Channel {
    Email,
    Whatsapp,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Email => "EMAIL",
            Channel::Whatsapp => "WHATSAPP",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel affinity declared by a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TemplateChannel {
    Email,
    Whatsapp,
    Both,
}

impl TemplateChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            TemplateChannel::Email => "EMAIL",
            TemplateChannel::Whatsapp => "WHATSAPP",
            TemplateChannel::Both => "BOTH",
        }
    }

    pub fn includes(self, channel: Channel) -> bool {
        matches!(
            (self, channel),
            (TemplateChannel::Both, _)
                | (TemplateChannel::Email, Channel::Email)
                | (TemplateChannel::Whatsapp, Channel::Whatsapp)
        )
    }
}

impl FromStr for TemplateChannel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EMAIL" => Ok(TemplateChannel::Email),
            "WHATSAPP" => Ok(TemplateChannel::Whatsapp),
            "BOTH" => Ok(TemplateChannel::Both),
            other => Err(CoreError::Validation(format!("Unknown channel '{other}'"))),
        }
    }
}

/// Content language. Arabic is the platform default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Ar,
    En,
}

impl Locale {
    pub fn as_str(self) -> &'static str {
        match self {
            Locale::Ar => "ar",
            Locale::En => "en",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_includes_every_channel() {
        assert!(TemplateChannel::Both.includes(Channel::Email));
        assert!(TemplateChannel::Both.includes(Channel::Whatsapp));
    }

    #[test]
    fn single_channel_templates_include_only_themselves() {
        assert!(TemplateChannel::Email.includes(Channel::Email));
        assert!(!TemplateChannel::Email.includes(Channel::Whatsapp));
        assert!(!TemplateChannel::Whatsapp.includes(Channel::Email));
    }

    #[test]
    fn locale_defaults_to_arabic() {
        assert_eq!(Locale::default(), Locale::Ar);
        let parsed: Locale = serde_json::from_str("\"en\"").unwrap();
        assert_eq!(parsed, Locale::En);
    }
}
