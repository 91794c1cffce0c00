//! TTS (Text-to-Speech) Module
//!
//! Engine boundary for narration: a backend speaks one utterance at a time,
//! can pause/resume/cancel it, lists its voices, and reports progress as
//! [`EngineEvent`]s on a channel handed over at construction.

use crate::config::Settings;
use crate::voice::Voice;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub mod espeak;
pub mod silent;

/// Identifies one utterance for the lifetime of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtteranceId(u64);

impl UtteranceId {
    /// Allocate a fresh, never reused id
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One request to synthesize and play a text
#[derive(Debug, Clone, PartialEq)]
pub struct UtteranceRequest {
    pub id: UtteranceId,
    pub text: String,
    pub voice: Voice,
    /// 1.0 = the voice's native speed
    pub rate: f32,
}

/// Notifications emitted by an engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The engine re-announced its installed voices
    VoicesChanged(Vec<Voice>),
    /// Audio for the utterance started
    Started { utterance: UtteranceId },
    /// Speech reached a character offset (in chars, not bytes)
    Boundary { utterance: UtteranceId, char_index: usize },
    /// The utterance played to the end
    Ended { utterance: UtteranceId },
}

impl EngineEvent {
    /// Utterance this event belongs to, if any
    pub fn utterance(&self) -> Option<UtteranceId> {
        match self {
            EngineEvent::VoicesChanged(_) => None,
            EngineEvent::Started { utterance }
            | EngineEvent::Boundary { utterance, .. }
            | EngineEvent::Ended { utterance } => Some(*utterance),
        }
    }
}

/// Sender half engines report events on
pub type EngineEventSender = mpsc::UnboundedSender<EngineEvent>;

/// Trait for TTS engines
///
/// Commands return as soon as the engine accepted them; their effects show
/// up later as events. At most one utterance is audible at a time.
#[async_trait]
pub trait SpeechEngine: Send + Sync + std::fmt::Debug {
    /// Start speaking, replacing whatever is playing
    async fn speak(&self, request: &UtteranceRequest) -> Result<()>;

    /// Pause the current utterance
    async fn pause(&self) -> Result<()>;

    /// Resume a paused utterance where it stopped
    async fn resume(&self) -> Result<()>;

    /// Stop and drop anything queued or playing
    async fn cancel_all(&self) -> Result<()>;

    /// Installed voices
    async fn list_voices(&self) -> Result<Vec<Voice>>;

    /// Get the engine name
    fn name(&self) -> &str;
}

/// Shared engine handle; only the latest lease may drive it
#[derive(Debug, Clone)]
pub struct EngineHandle {
    engine: Arc<dyn SpeechEngine>,
    owner: Arc<AtomicU64>,
}

impl EngineHandle {
    pub fn new(engine: Arc<dyn SpeechEngine>) -> Self {
        Self {
            engine,
            owner: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Take ownership of the engine
    ///
    /// Whatever the previous owner left playing is cancelled and its lease
    /// stops working.
    pub async fn claim(&self) -> EngineLease {
        let token = self.owner.fetch_add(1, Ordering::SeqCst) + 1;
        if let Err(e) = self.engine.cancel_all().await {
            warn!("⚠️ Failed to silence {} on claim: {}", self.engine.name(), e);
        }
        debug!("Engine {} claimed by lease {}", self.engine.name(), token);
        EngineLease {
            engine: self.engine.clone(),
            owner: self.owner.clone(),
            token,
        }
    }
}

/// Exclusive right to issue commands, until someone claims the engine again
#[derive(Debug)]
pub struct EngineLease {
    engine: Arc<dyn SpeechEngine>,
    owner: Arc<AtomicU64>,
    token: u64,
}

impl EngineLease {
    /// Whether this lease still owns the engine
    pub fn is_current(&self) -> bool {
        self.owner.load(Ordering::SeqCst) == self.token
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    fn ensure_current(&self) -> Result<()> {
        if self.is_current() {
            Ok(())
        } else {
            Err(anyhow::anyhow!(
                "engine {} was claimed by another controller",
                self.engine.name()
            ))
        }
    }

    pub async fn speak(&self, request: &UtteranceRequest) -> Result<()> {
        self.ensure_current()?;
        self.engine.speak(request).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.ensure_current()?;
        self.engine.pause().await
    }

    pub async fn resume(&self) -> Result<()> {
        self.ensure_current()?;
        self.engine.resume().await
    }

    pub async fn cancel_all(&self) -> Result<()> {
        self.ensure_current()?;
        self.engine.cancel_all().await
    }
}

/// Factory to create the configured TTS engine
///
/// Never fails: a missing backend degrades to the silent engine so the
/// narration control stays present but inert.
pub fn create_engine(settings: &Settings, events: EngineEventSender) -> Arc<dyn SpeechEngine> {
    info!("🛠️ Creating TTS engine: {}", settings.tts_engine);
    let engine: Arc<dyn SpeechEngine> = match settings.tts_engine.as_str() {
        "espeak" | "espeak-ng" => match espeak::EspeakEngine::new(&settings.espeak_binary, events) {
            Ok(engine) => {
                info!("  - Using espeak-ng ({})", settings.espeak_binary);
                Arc::new(engine)
            }
            Err(e) => {
                warn!("  - espeak-ng unavailable ({}), narration disabled", e);
                Arc::new(silent::SilentEngine::new())
            }
        },
        "silent" | "none" => Arc::new(silent::SilentEngine::new()),
        other => {
            warn!("  - Unknown engine '{}', narration disabled", other);
            Arc::new(silent::SilentEngine::new())
        }
    };
    info!("✅ TTS engine '{}' initialized", engine.name());
    engine
}
