use crate::error::RicottaResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Speaking speed used when nothing is configured, in percent of native rate
pub const DEFAULT_SPEED_PERCENT: u32 = 80;

/// Learning language picked on first run
pub const DEFAULT_LEARNING_LANGUAGE: &str = "Italian";

/// Narration settings shared with the card UI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    // Learning
    pub learning_language: String,
    pub speed_percent: u32,

    /// Voice explicitly picked by the user, keyed by learning language
    pub preferred_voices: HashMap<String, String>,

    // Engine
    pub tts_engine: String,
    pub espeak_binary: String,

    // Meta
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            learning_language: DEFAULT_LEARNING_LANGUAGE.to_string(),
            speed_percent: DEFAULT_SPEED_PERCENT,
            preferred_voices: HashMap::new(),
            tts_engine: "espeak".to_string(),
            espeak_binary: "espeak-ng".to_string(),
            log_level: "INFO".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from the default location, or fall back to defaults
    pub fn load() -> RicottaResult<Self> {
        Self::load_from(&settings_path())
    }

    /// Load settings from an explicit path
    pub fn load_from(path: &Path) -> RicottaResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str(&content) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                // Keep the app usable, park the broken file next to it
                tracing::warn!("⚠️ Settings file corrupted or invalid, using defaults: {}", e);
                let backup_path = path.with_extension("json.corrupt");
                let _ = std::fs::rename(path, &backup_path);
                Ok(Self::default())
            }
        }
    }

    /// Save settings to the default location
    pub fn save(&self) -> RicottaResult<()> {
        self.save_to(&settings_path())
    }

    /// Save settings to an explicit path
    pub fn save_to(&self, path: &Path) -> RicottaResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Rate multiplier handed to the engine (1.0 = native speed)
    pub fn rate_multiplier(&self) -> f32 {
        self.speed_percent as f32 / 100.0
    }

    /// Voice the user picked for a language, if any
    pub fn preferred_voice(&self, language: &str) -> Option<&str> {
        self.preferred_voices.get(language).map(String::as_str)
    }

    /// Voice picked for the current learning language
    pub fn current_preferred_voice(&self) -> Option<&str> {
        self.preferred_voice(&self.learning_language)
    }

    /// Record an explicit voice pick for a language
    pub fn set_preferred_voice(&mut self, language: &str, voice: &str) {
        self.preferred_voices
            .insert(language.to_string(), voice.to_string());
    }
}

/// Location of the settings file
pub fn settings_path() -> PathBuf {
    if let Ok(path) = std::env::var("RICOTTA_SETTINGS") {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("ricotta")
        .join("settings.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_first_run() {
        let settings = Settings::default();
        assert_eq!(settings.learning_language, "Italian");
        assert_eq!(settings.speed_percent, 80);
        assert!((settings.rate_multiplier() - 0.8).abs() < f32::EPSILON);
        assert!(settings.current_preferred_voice().is_none());
    }

    #[test]
    fn test_save_and_load_preferred_voice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/settings.json");

        let mut settings = Settings::default();
        settings.learning_language = "Spanish".to_string();
        settings.set_preferred_voice("Spanish", "Monica");
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.current_preferred_voice(), Some("Monica"));
        assert_eq!(loaded.preferred_voice("French"), None);
    }

    #[test]
    fn test_corrupt_file_falls_back_and_is_backed_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded, Settings::default());
        assert!(!path.exists());
        assert!(dir.path().join("settings.json.corrupt").exists());
    }

    #[test]
    fn test_partial_file_keeps_defaults_for_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"learning_language":"German"}"#).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.learning_language, "German");
        assert_eq!(loaded.speed_percent, DEFAULT_SPEED_PERCENT);
        assert_eq!(loaded.tts_engine, "espeak");
    }
}
