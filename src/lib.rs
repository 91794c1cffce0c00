//! Ricotta Library
//!
//! Narration controller for the Ricotta flashcard trainer: voice
//! resolution, utterance playback and the progress indicator state.

pub mod catalog;
pub mod config;
pub mod error;
pub mod language;
pub mod playback;
pub mod resolver;
pub mod tts;
pub mod voice;
