//! Learning languages
//!
//! Static tables binding a learning language to its locale code, and the
//! curated voices known to sound good for each language.

use crate::voice::primary_subtag;

/// Maps a learning language to its primary locale code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageBinding {
    pub display_name: &'static str,
    pub locale_code: &'static str,
}

/// A hand-picked voice for a learning language
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CuratedVoice {
    pub language: &'static str,
    pub voice_name: &'static str,
    /// Rate forced when this voice is picked through the curated path
    pub rate_override: Option<f32>,
}

/// Languages offered in the settings menu
pub const LANGUAGE_BINDINGS: &[LanguageBinding] = &[
    LanguageBinding {
        display_name: "Arabic",
        locale_code: "ar",
    },
    LanguageBinding {
        display_name: "English",
        locale_code: "en",
    },
    LanguageBinding {
        display_name: "French",
        locale_code: "fr",
    },
    LanguageBinding {
        display_name: "German",
        locale_code: "de",
    },
    LanguageBinding {
        display_name: "Hindi",
        locale_code: "hi",
    },
    LanguageBinding {
        display_name: "Italian",
        locale_code: "it",
    },
    LanguageBinding {
        display_name: "Japanese",
        locale_code: "ja",
    },
    LanguageBinding {
        display_name: "Mandarin",
        locale_code: "zh",
    },
    LanguageBinding {
        display_name: "Portuguese",
        locale_code: "pt",
    },
    LanguageBinding {
        display_name: "Russian",
        locale_code: "ru",
    },
    LanguageBinding {
        display_name: "Spanish",
        locale_code: "es",
    },
];

/// German and Japanese curated voices were only tuned at native rate
pub const CURATED_VOICES: &[CuratedVoice] = &[
    CuratedVoice {
        language: "Spanish",
        voice_name: "Paulina",
        rate_override: None,
    },
    CuratedVoice {
        language: "French",
        voice_name: "Thomas",
        rate_override: None,
    },
    CuratedVoice {
        language: "German",
        voice_name: "Google Deutsch",
        rate_override: Some(1.0),
    },
    CuratedVoice {
        language: "Mandarin",
        voice_name: "Tingting",
        rate_override: None,
    },
    CuratedVoice {
        language: "Portuguese",
        voice_name: "Joana",
        rate_override: None,
    },
    CuratedVoice {
        language: "Japanese",
        voice_name: "O-Ren",
        rate_override: Some(1.0),
    },
];

/// Find the binding for a learning language
///
/// Exact (case-insensitive) names win; otherwise the first binding whose
/// display name contains the requested name is used.
pub fn find_binding<'a>(
    bindings: &'a [LanguageBinding],
    language: &str,
) -> Option<&'a LanguageBinding> {
    let wanted = language.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }

    bindings
        .iter()
        .find(|b| b.display_name.to_lowercase() == wanted)
        .or_else(|| {
            bindings
                .iter()
                .find(|b| b.display_name.to_lowercase().contains(&wanted))
        })
}

/// Find the curated voice for a learning language
pub fn find_curated<'a>(curated: &'a [CuratedVoice], language: &str) -> Option<&'a CuratedVoice> {
    let wanted = language.trim();
    curated
        .iter()
        .find(|c| c.language.eq_ignore_ascii_case(wanted))
}

/// Primary locale subtag for a learning language (`Spanish` -> `es`)
pub fn locale_for(language: &str) -> Option<String> {
    find_binding(LANGUAGE_BINDINGS, language).map(|b| primary_subtag(b.locale_code))
}

/// Names of all learning languages
pub fn language_names() -> Vec<&'static str> {
    LANGUAGE_BINDINGS.iter().map(|b| b.display_name).collect()
}
