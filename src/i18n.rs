//! Localized message catalog.
//!
//! All prompts, email bodies and auto-replies live in per-language TOML
//! files embedded at compile time. The catalog is built once at startup
//! and injected wherever messages are needed; lookups never fail, they
//! fall back and report instead.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::error;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[^}]*\}").unwrap());

const LOCALES: &[(&str, &str)] = &[
    ("en", include_str!("../locales/en.toml")),
    ("fr", include_str!("../locales/fr.toml")),
];

/// All localized strings for one language. Deserialization fails if any
/// key is missing from the locale file, so a hole in a catalog is caught
/// at startup rather than mid-call.
#[derive(Debug, Clone, Deserialize)]
pub struct Messages {
    pub voice: VoiceMessages,
    pub email: EmailMessages,
    pub messaging: MessagingMessages,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoiceMessages {
    pub welcome: String,
    pub lang_select: String,
    pub please_hold: String,
    pub accept_call: String,
    pub confirm_connected: String,
    pub voicemail: String,
    pub voicemail_repeat: String,
    pub record_after_tone: String,
    pub re_record: String,
    pub gather_outbound: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailMessages {
    pub missed_call_subject: String,
    pub missed_call_content: String,
    pub voicemail_subject: String,
    pub voicemail_content: String,
    pub sms_subject: String,
    pub sms_content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagingMessages {
    pub response: String,
}

pub struct MessageCatalog {
    messages: HashMap<String, Messages>,
    default_lang: String,
}

impl MessageCatalog {
    /// Loads the embedded locale files. This is the one startup step that
    /// is allowed to abort the service: without messages no webhook can
    /// produce valid speech.
    pub fn load(default_lang: &str) -> Result<Self> {
        let mut messages = HashMap::new();
        for (lang, raw) in LOCALES {
            let parsed: Messages = toml::from_str(raw)
                .with_context(|| format!("failed to parse locale file for '{}'", lang))?;
            messages.insert(lang.to_string(), parsed);
        }
        anyhow::ensure!(
            messages.contains_key(default_lang),
            "default language '{}' has no locale file",
            default_lang
        );
        Ok(Self {
            messages,
            default_lang: default_lang.to_string(),
        })
    }

    /// Returns the message selected by `getter` in `lang`.
    pub fn message(&self, lang: &str, getter: impl Fn(&Messages) -> &str) -> String {
        self.message_replace(lang, getter, &[])
    }

    /// Returns the message selected by `getter` in `lang`, substituting
    /// `{placeholder}` tokens from `replacements`. A token without a
    /// replacement renders empty and is reported.
    pub fn message_replace(
        &self,
        lang: &str,
        getter: impl Fn(&Messages) -> &str,
        replacements: &[(&str, &str)],
    ) -> String {
        let messages = match self.messages.get(lang) {
            Some(messages) => messages,
            None => {
                error!(
                    "no messages exist for lang '{}', defaulting to lang '{}'",
                    lang, self.default_lang
                );
                &self.messages[&self.default_lang]
            }
        };

        let template = getter(messages);
        PLACEHOLDER
            .replace_all(template, |caps: &regex::Captures| {
                let token = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
                let key = &token[1..token.len() - 1];
                match replacements.iter().find(|(name, _)| *name == key) {
                    Some((_, value)) => (*value).to_string(),
                    None => {
                        error!("no replacement provided for '{}' in message", key);
                        String::new()
                    }
                }
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> MessageCatalog {
        MessageCatalog::load("en").unwrap()
    }

    #[test]
    fn test_load_all_locales() {
        let catalog = catalog();
        assert!(catalog.messages.contains_key("en"));
        assert!(catalog.messages.contains_key("fr"));
    }

    #[test]
    fn test_message_replace() {
        let msg = catalog().message_replace("en", |m| &m.voice.lang_select, &[("digit", "1")]);
        assert_eq!(msg, "For service in English, press 1.");
    }

    #[test]
    fn test_unknown_lang_falls_back_to_default() {
        let msg = catalog().message("de", |m| &m.voice.please_hold);
        assert_eq!(msg, "Please hold while we connect you to an agent.");
    }

    #[test]
    fn test_missing_replacement_renders_empty() {
        let msg = catalog().message_replace("fr", |m| &m.voice.lang_select, &[]);
        assert_eq!(msg, "Pour le service en français, faites le .");
    }

    #[test]
    fn test_same_inputs_same_output() {
        let catalog = catalog();
        let first =
            catalog.message_replace("en", |m| &m.email.voicemail_subject, &[("phoneNumber", "+1")]);
        let second =
            catalog.message_replace("en", |m| &m.email.voicemail_subject, &[("phoneNumber", "+1")]);
        assert_eq!(first, second);
    }
}
