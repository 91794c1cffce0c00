#![allow(dead_code)]

pub mod mock_engine;

use mock_engine::MockEngine;
use ricotta::catalog::VoiceCatalog;
use ricotta::playback::{NarrationOptions, PlaybackController, PlaybackEvent};
use ricotta::tts::{EngineEvent, EngineHandle, UtteranceId};
use ricotta::voice::Voice;
use std::sync::Arc;

/// Voices of a typical desktop install
pub fn desktop_voices() -> Vec<Voice> {
    vec![
        Voice::new("Alex", "en-US"),
        Voice::new("Monica", "es-ES"),
        Voice::new("Paulina", "es-MX"),
        Voice::new("Thomas", "fr-FR"),
        Voice::new("Alice", "it_IT"),
    ]
}

pub fn options(language: &str) -> NarrationOptions {
    NarrationOptions {
        language: language.to_string(),
        preferred_voice: None,
        rate: 0.8,
    }
}

/// Test harness around a controller driven by a mock engine
pub struct Harness {
    pub engine: Arc<MockEngine>,
    pub handle: EngineHandle,
    pub catalog: Arc<VoiceCatalog>,
    pub controller: PlaybackController,
}

impl Harness {
    pub async fn new(voices: Vec<Voice>, language: &str) -> Self {
        let engine = Arc::new(MockEngine::new());
        let handle = EngineHandle::new(engine.clone());
        let catalog = Arc::new(VoiceCatalog::with_voices(voices));
        let controller =
            PlaybackController::activate(&handle, catalog.clone(), options(language)).await;
        // Drop the cancel issued by the claim
        engine.clear();
        Self {
            engine,
            handle,
            catalog,
            controller,
        }
    }

    pub fn live(&self) -> UtteranceId {
        self.controller
            .live_utterance()
            .expect("an utterance should be live")
    }

    pub async fn boundary(&mut self, char_index: usize) {
        let utterance = self.live();
        self.controller
            .handle(PlaybackEvent::Engine(EngineEvent::Boundary {
                utterance,
                char_index,
            }))
            .await;
    }

    /// End the live utterance; returns its id
    pub async fn end(&mut self) -> UtteranceId {
        let utterance = self.live();
        self.controller
            .handle(PlaybackEvent::Engine(EngineEvent::Ended { utterance }))
            .await;
        utterance
    }

    pub async fn settle(&mut self, utterance: UtteranceId) {
        self.controller
            .handle(PlaybackEvent::SettleElapsed { utterance })
            .await;
    }
}
