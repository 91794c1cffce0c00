//! Mock TTS Engine for Testing
//!
//! Records every command for verification; events are injected by the
//! tests themselves.

use anyhow::Result;
use async_trait::async_trait;
use ricotta::tts::{SpeechEngine, UtteranceId, UtteranceRequest};
use ricotta::voice::Voice;
use std::sync::{Arc, Mutex};

/// A command the engine received
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Speak(UtteranceRequest),
    Pause,
    Resume,
    CancelAll,
}

/// Mock engine that records commands
#[derive(Debug)]
pub struct MockEngine {
    /// All commands received, in order
    pub calls: Arc<Mutex<Vec<EngineCall>>>,
    /// Voices returned by `list_voices`
    pub voices: Arc<Mutex<Vec<Voice>>>,
    /// Simulate failure on every command
    pub should_fail: Arc<Mutex<bool>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::with_voices(Vec::new())
    }

    pub fn with_voices(voices: Vec<Voice>) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            voices: Arc::new(Mutex::new(voices)),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn fail(&self, fail: bool) {
        *self.should_fail.lock().unwrap() = fail;
    }

    /// Every request handed to `speak`
    pub fn spoken(&self) -> Vec<UtteranceRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                EngineCall::Speak(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn last_utterance(&self) -> Option<UtteranceId> {
        self.spoken().last().map(|r| r.id)
    }

    pub fn count(&self, wanted: &EngineCall) -> usize {
        self.calls().iter().filter(|call| *call == wanted).count()
    }

    fn record(&self, call: EngineCall) -> Result<()> {
        if *self.should_fail.lock().unwrap() {
            return Err(anyhow::anyhow!("Mock engine failure"));
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechEngine for MockEngine {
    async fn speak(&self, request: &UtteranceRequest) -> Result<()> {
        self.record(EngineCall::Speak(request.clone()))
    }

    async fn pause(&self) -> Result<()> {
        self.record(EngineCall::Pause)
    }

    async fn resume(&self) -> Result<()> {
        self.record(EngineCall::Resume)
    }

    async fn cancel_all(&self) -> Result<()> {
        self.record(EngineCall::CancelAll)
    }

    async fn list_voices(&self) -> Result<Vec<Voice>> {
        Ok(self.voices.lock().unwrap().clone())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
