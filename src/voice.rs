//! Voice model
//!
//! A voice is a named synthetic speaker offered by the TTS engine.
//! Voices are never created by the application, only listed by the engine.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// A synthetic speaker exposed by the TTS engine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Voice {
    /// Human readable name, unique within a catalog
    pub name: String,
    /// Locale tag as reported by the platform (`es-MX`, `it_IT`, `fr`)
    pub language_tag: String,
    /// Backend specific selector (espeak voice file); defaults to the name
    pub identifier: String,
}

impl Voice {
    pub fn new(name: impl Into<String>, language_tag: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            identifier: name.clone(),
            name,
            language_tag: language_tag.into(),
        }
    }

    /// Override the backend selector
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Primary language subtag of this voice (`it_IT` -> `it`)
    pub fn primary_language(&self) -> String {
        primary_subtag(&self.language_tag)
    }

    /// Label shown in the voice picker
    ///
    /// Parenthesised qualifiers are dropped. When another listed voice shares
    /// the stripped name and this one has a nested `Name (Lang (Country))`
    /// form, the country is kept as `Name - Country`.
    pub fn display_label(&self, listed: &[Voice]) -> String {
        let stripped = strip_parentheses(&self.name);
        let shared = listed
            .iter()
            .filter(|v| v.name != self.name)
            .any(|v| v.name.contains(&stripped));

        match (shared, nested_country(&self.name)) {
            (true, Some(country)) => format!("{} - {}", stripped, country),
            _ => stripped,
        }
    }
}

impl std::fmt::Display for Voice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.language_tag)
    }
}

/// Normalize a locale tag and return its primary subtag, lowercased
pub fn primary_subtag(tag: &str) -> String {
    tag.trim()
        .replace('_', "-")
        .split('-')
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

fn strip_parentheses(name: &str) -> String {
    static GROUP: OnceLock<Regex> = OnceLock::new();
    let group = GROUP.get_or_init(|| Regex::new(r"\(.*?\)").expect("valid regex"));
    group.replace_all(name, "").replace(')', "").trim().to_string()
}

fn nested_country(name: &str) -> Option<String> {
    static NESTED: OnceLock<Regex> = OnceLock::new();
    let nested = NESTED
        .get_or_init(|| Regex::new(r"\(([^()]+)\s*\(([^()]+)\)\)").expect("valid regex"));
    nested
        .captures(name)
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str().trim().to_string())
}
