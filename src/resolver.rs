//! Voice Resolver
//!
//! Picks the voice for a learning language:
//! 1. the voice the user explicitly chose, if the engine offers it
//! 2. the curated voice for the language, if the engine offers it
//! 3. the first voice whose locale matches the language
//!
//! Locale matching alone often lands on a robotic voice, hence the curated
//! table in front of it.

use crate::language::{self, CuratedVoice, LanguageBinding, CURATED_VOICES, LANGUAGE_BINDINGS};
use crate::voice::{primary_subtag, Voice};
use tracing::debug;

/// Which rule picked the voice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    Explicit,
    Curated,
    Locale,
}

/// Outcome of a successful resolution
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub voice: Voice,
    pub source: ResolutionSource,
    /// Rate forced by the curated table, overriding the requested speed
    pub rate_override: Option<f32>,
}

impl Resolution {
    /// Rate to speak at, given the speed the caller asked for
    pub fn effective_rate(&self, requested: f32) -> f32 {
        self.rate_override.unwrap_or(requested)
    }
}

/// Data-driven voice selection policy
#[derive(Debug, Clone, Copy)]
pub struct VoiceResolver {
    bindings: &'static [LanguageBinding],
    curated: &'static [CuratedVoice],
}

impl Default for VoiceResolver {
    fn default() -> Self {
        Self::new(LANGUAGE_BINDINGS, CURATED_VOICES)
    }
}

impl VoiceResolver {
    pub fn new(bindings: &'static [LanguageBinding], curated: &'static [CuratedVoice]) -> Self {
        Self { bindings, curated }
    }

    /// Resolve the voice for `language` among `voices`
    ///
    /// Returns `None` only when nothing in the catalog qualifies, which is
    /// always the case while the catalog is still empty.
    pub fn resolve(
        &self,
        voices: &[Voice],
        language: &str,
        explicit: Option<&str>,
    ) -> Option<Resolution> {
        if voices.is_empty() {
            return None;
        }

        if let Some(name) = explicit.filter(|n| !n.is_empty()) {
            if let Some(voice) = voices.iter().find(|v| v.name == name) {
                debug!("Using explicit voice '{}' for {}", name, language);
                return Some(Resolution {
                    voice: voice.clone(),
                    source: ResolutionSource::Explicit,
                    rate_override: None,
                });
            }
            debug!("Explicit voice '{}' not installed, falling back", name);
        }

        if let Some(curated) = language::find_curated(self.curated, language) {
            if let Some(voice) = voices.iter().find(|v| v.name == curated.voice_name) {
                debug!("Using curated voice '{}' for {}", curated.voice_name, language);
                return Some(Resolution {
                    voice: voice.clone(),
                    source: ResolutionSource::Curated,
                    rate_override: curated.rate_override,
                });
            }
        }

        let code = language::find_binding(self.bindings, language)
            .map(|b| primary_subtag(b.locale_code))?;
        let voice = voices.iter().find(|v| v.primary_language() == code)?;
        debug!("Using locale voice '{}' ({}) for {}", voice.name, code, language);
        Some(Resolution {
            voice: voice.clone(),
            source: ResolutionSource::Locale,
            rate_override: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<Voice> {
        vec![
            Voice::new("Alex", "en-US"),
            Voice::new("Monica", "es-ES"),
            Voice::new("Thomas", "fr-FR"),
            Voice::new("Anna", "de-DE"),
            Voice::new("Google Deutsch", "de-DE"),
            Voice::new("Paulina", "es-MX"),
        ]
    }

    #[test]
    fn test_explicit_choice_wins_for_every_voice() {
        let resolver = VoiceResolver::default();
        let voices = catalog();
        for voice in &voices {
            for language in ["Spanish", "German", "Italian", "Klingon"] {
                let res = resolver.resolve(&voices, language, Some(&voice.name)).unwrap();
                assert_eq!(&res.voice, voice);
                assert_eq!(res.source, ResolutionSource::Explicit);
                assert_eq!(res.rate_override, None);
            }
        }
    }

    #[test]
    fn test_curated_beats_locale_scan_in_any_order() {
        let resolver = VoiceResolver::default();
        let mut voices = catalog();
        for _ in 0..voices.len() {
            voices.rotate_left(1);
            let res = resolver.resolve(&voices, "Spanish", None).unwrap();
            assert_eq!(res.voice.name, "Paulina");
            assert_eq!(res.source, ResolutionSource::Curated);
        }
    }

    #[test]
    fn test_missing_explicit_voice_falls_back_to_curated() {
        let resolver = VoiceResolver::default();
        let res = resolver.resolve(&catalog(), "Spanish", Some("Jorge")).unwrap();
        assert_eq!(res.voice.name, "Paulina");
    }

    #[test]
    fn test_locale_fallback_normalizes_underscores() {
        let resolver = VoiceResolver::default();
        let voices = vec![Voice::new("Alice", "it_IT")];
        let res = resolver.resolve(&voices, "Italian", None).unwrap();
        assert_eq!(res.voice.name, "Alice");
        assert_eq!(res.source, ResolutionSource::Locale);
    }

    #[test]
    fn test_empty_catalog_never_resolves() {
        let resolver = VoiceResolver::default();
        for language in ["Spanish", "Italian", "German", ""] {
            assert!(resolver.resolve(&[], language, Some("Paulina")).is_none());
            assert!(resolver.resolve(&[], language, None).is_none());
        }
    }

    #[test]
    fn test_no_match_resolves_to_none() {
        let resolver = VoiceResolver::default();
        assert!(resolver.resolve(&catalog(), "Japanese", None).is_none());
        assert!(resolver.resolve(&catalog(), "Klingon", None).is_none());
    }

    #[test]
    fn test_curated_german_forces_native_rate() {
        let resolver = VoiceResolver::default();
        let res = resolver.resolve(&catalog(), "German", None).unwrap();
        assert_eq!(res.voice.name, "Google Deutsch");
        assert!((res.effective_rate(0.8) - 1.0).abs() < f32::EPSILON);

        // Explicitly picked German voices keep the requested speed
        let res = resolver.resolve(&catalog(), "German", Some("Anna")).unwrap();
        assert!((res.effective_rate(0.8) - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn test_locale_path_keeps_requested_rate() {
        let resolver = VoiceResolver::default();
        let voices = vec![Voice::new("Kyoko", "ja-JP")];
        let res = resolver.resolve(&voices, "Japanese", None).unwrap();
        assert_eq!(res.source, ResolutionSource::Locale);
        assert!((res.effective_rate(0.8) - 0.8).abs() < f32::EPSILON);
    }
}
