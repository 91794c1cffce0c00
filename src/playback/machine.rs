//! Playback Controller
//!
//! Public face of narration: resolves the voice, drives the utterance
//! session, and keeps the visual state (icon and progress) in sync with
//! engine events. All input arrives through [`PlaybackController::handle`]
//! or the user-facing [`PlaybackController::toggle`].

use super::projector::{ProgressProjector, READY_FRACTION};
use super::session::{PlayOutcome, SessionEvent, SessionState, UtteranceSession};
use crate::catalog::VoiceCatalog;
use crate::config::Settings;
use crate::resolver::{Resolution, VoiceResolver};
use crate::tts::{EngineEvent, EngineHandle, UtteranceId};
use crate::voice::Voice;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Wait after an utterance ends before showing the play icon again
pub const SETTLE_DELAY: Duration = Duration::from_millis(300);

/// Icon shown by the narration control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    /// Ready to play
    Idle,
    /// Speaking (pause icon)
    Playing,
    /// Paused mid-utterance (play icon)
    Paused,
}

/// What the card UI renders
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackVisualState {
    pub status: PlaybackStatus,
    /// Elapsed fraction in `[0, 1]`
    pub progress: f32,
}

impl PlaybackVisualState {
    pub fn ready() -> Self {
        Self {
            status: PlaybackStatus::Idle,
            progress: READY_FRACTION,
        }
    }

    /// Share of the arc still to be drawn
    pub fn remaining(&self) -> f32 {
        1.0 - self.progress
    }
}

impl Default for PlaybackVisualState {
    fn default() -> Self {
        Self::ready()
    }
}

/// Input to the controller's transition function
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// Something the engine reported
    Engine(EngineEvent),
    /// The voice catalog was (re)populated
    CatalogChanged,
    /// The settle timer of an ended utterance fired
    SettleElapsed { utterance: UtteranceId },
}

impl From<EngineEvent> for PlaybackEvent {
    fn from(event: EngineEvent) -> Self {
        PlaybackEvent::Engine(event)
    }
}

/// Who should speak and how fast
#[derive(Debug, Clone, PartialEq)]
pub struct NarrationOptions {
    pub language: String,
    pub preferred_voice: Option<String>,
    /// Requested rate multiplier (1.0 = native)
    pub rate: f32,
}

impl NarrationOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            language: settings.learning_language.clone(),
            preferred_voice: settings.current_preferred_voice().map(str::to_string),
            rate: settings.rate_multiplier(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingSettle {
    utterance: UtteranceId,
    deadline: Instant,
}

#[derive(Debug)]
pub struct PlaybackController {
    session: UtteranceSession,
    projector: ProgressProjector,
    resolver: VoiceResolver,
    catalog: Arc<VoiceCatalog>,
    options: NarrationOptions,
    resolution: Option<Resolution>,
    visual: PlaybackVisualState,
    /// Set on every new text, cleared by the first start
    autoplay_pending: bool,
    settle: Option<PendingSettle>,
    settle_delay: Duration,
}

impl PlaybackController {
    /// Take over the engine and build a controller for it
    ///
    /// Whatever a previous controller left playing is cancelled; its later
    /// commands become no-ops.
    pub async fn activate(
        engine: &EngineHandle,
        catalog: Arc<VoiceCatalog>,
        options: NarrationOptions,
    ) -> Self {
        let lease = engine.claim().await;
        let mut controller = Self {
            session: UtteranceSession::new(lease),
            projector: ProgressProjector::new(),
            resolver: VoiceResolver::default(),
            catalog,
            options,
            resolution: None,
            visual: PlaybackVisualState::ready(),
            autoplay_pending: false,
            settle: None,
            settle_delay: SETTLE_DELAY,
        };
        controller.refresh_resolution();
        controller
    }

    /// Use a different voice policy (custom tables)
    pub fn with_resolver(mut self, resolver: VoiceResolver) -> Self {
        self.resolver = resolver;
        self.refresh_resolution();
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn visual_state(&self) -> PlaybackVisualState {
        self.visual
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn live_utterance(&self) -> Option<UtteranceId> {
        self.session.live()
    }

    pub fn resolution(&self) -> Option<&Resolution> {
        self.resolution.as_ref()
    }

    /// Voice the next fresh start will use
    pub fn current_voice(&self) -> Option<&Voice> {
        self.session.voice()
    }

    pub fn options(&self) -> &NarrationOptions {
        &self.options
    }

    pub fn catalog(&self) -> Arc<VoiceCatalog> {
        self.catalog.clone()
    }

    /// When the pending settle timer is due, if one is running
    pub fn settle_deadline(&self) -> Option<(UtteranceId, Instant)> {
        self.settle.map(|s| (s.utterance, s.deadline))
    }

    /// Show a new text: cancel the old one, prepare the new one, and
    /// narrate it as soon as a voice is available
    ///
    /// Re-sending the text already shown changes nothing.
    pub async fn set_text(&mut self, text: &str) {
        if text == self.session.text() {
            debug!("Text unchanged, keeping narration as is");
            return;
        }
        self.settle = None;
        self.refresh_resolution();
        let (voice, rate) = self.voice_and_rate();

        if let Err(e) = self.session.configure(text, voice, rate).await {
            warn!("⚠️ Could not stop previous narration: {}", e);
        }
        self.visual = PlaybackVisualState {
            status: PlaybackStatus::Idle,
            progress: self.projector.prepare(text),
        };
        self.autoplay_pending = true;
        self.try_autoplay().await;
    }

    /// Re-resolve after a settings change; a live utterance keeps going
    /// with its old voice until the next fresh start
    pub async fn on_language_or_voice_change(&mut self, language: &str, voice: Option<&str>) {
        self.options.language = language.to_string();
        self.options.preferred_voice = voice.filter(|v| !v.is_empty()).map(str::to_string);
        info!(
            "🌐 Narration language {} (voice: {})",
            self.options.language,
            self.options.preferred_voice.as_deref().unwrap_or("auto")
        );
        self.apply_resolution();
        self.try_autoplay().await;
    }

    /// Change the requested speed; applies from the next fresh start
    pub fn set_rate(&mut self, rate: f32) {
        self.options.rate = rate;
        self.apply_resolution();
    }

    /// The single user control: pause while speaking, otherwise play
    pub async fn toggle(&mut self) {
        if self.session.state() == SessionState::Speaking {
            match self.session.pause().await {
                Ok(true) => self.visual.status = PlaybackStatus::Paused,
                Ok(false) => {}
                Err(e) => warn!("⚠️ Pause failed: {}", e),
            }
        } else {
            self.play().await;
        }
    }

    /// Feed one event through the state machine
    pub async fn handle(&mut self, event: PlaybackEvent) {
        match event {
            PlaybackEvent::Engine(EngineEvent::VoicesChanged(voices)) => {
                self.catalog.replace(voices);
                self.on_catalog_changed().await;
            }
            PlaybackEvent::Engine(event) => self.on_engine_event(&event),
            PlaybackEvent::CatalogChanged => self.on_catalog_changed().await,
            PlaybackEvent::SettleElapsed { utterance } => self.on_settle_elapsed(utterance),
        }
    }

    /// Stop narration for good (the card went away)
    pub async fn unmount(&mut self) {
        self.autoplay_pending = false;
        self.settle = None;
        if let Err(e) = self.session.cancel().await {
            debug!("Cancel on unmount failed: {}", e);
        }
        self.visual = PlaybackVisualState::ready();
    }

    async fn play(&mut self) {
        if self.session.state() == SessionState::Idle && !self.session.has_voice() {
            // The catalog may have filled since the text was set
            self.apply_resolution();
        }

        match self.session.play().await {
            Ok(PlayOutcome::Started(utterance)) => {
                debug!("Started utterance {}", utterance);
                self.autoplay_pending = false;
                self.settle = None;
                self.visual = PlaybackVisualState {
                    status: PlaybackStatus::Playing,
                    progress: self.projector.reset(),
                };
            }
            Ok(PlayOutcome::Resumed) => self.visual.status = PlaybackStatus::Playing,
            Ok(PlayOutcome::Ignored) => {}
            Err(e) => warn!("⚠️ Narration unavailable: {}", e),
        }
    }

    async fn try_autoplay(&mut self) {
        if !self.autoplay_pending || self.session.state() != SessionState::Idle {
            return;
        }
        if !self.session.has_voice() {
            debug!("Autoplay waiting for a voice for {}", self.options.language);
            return;
        }
        // Once per text, even if the start fails
        self.autoplay_pending = false;
        self.play().await;
    }

    async fn on_catalog_changed(&mut self) {
        self.apply_resolution();
        self.try_autoplay().await;
    }

    fn on_engine_event(&mut self, event: &EngineEvent) {
        let Some(event) = self.session.accept(event) else {
            return;
        };

        match event {
            SessionEvent::Started(_) => {
                if self.visual.status != PlaybackStatus::Paused {
                    self.visual.status = PlaybackStatus::Playing;
                }
            }
            SessionEvent::Boundary { char_index, .. } => {
                if self.visual.status != PlaybackStatus::Paused {
                    self.visual.status = PlaybackStatus::Playing;
                }
                self.visual.progress = self.projector.advance(char_index);
            }
            SessionEvent::Ended(utterance) => {
                self.visual.progress = self.projector.finish();
                self.settle = Some(PendingSettle {
                    utterance,
                    deadline: Instant::now() + self.settle_delay,
                });
            }
        }
    }

    fn on_settle_elapsed(&mut self, utterance: UtteranceId) {
        let Some(settle) = self.settle else {
            return;
        };
        if settle.utterance != utterance {
            debug!("Ignoring settle timer of {}", utterance);
            return;
        }
        self.settle = None;

        if self.session.state() == SessionState::Idle {
            self.visual = PlaybackVisualState {
                status: PlaybackStatus::Idle,
                progress: self.projector.reset(),
            };
        }
    }

    fn refresh_resolution(&mut self) {
        self.resolution = self.resolver.resolve(
            &self.catalog.voices(),
            &self.options.language,
            self.options.preferred_voice.as_deref(),
        );
        if self.resolution.is_none() {
            debug!("No voice resolvable for {} yet", self.options.language);
        }
    }

    /// Re-resolve and hand the result to the session for its next start
    fn apply_resolution(&mut self) {
        self.refresh_resolution();
        let (voice, rate) = self.voice_and_rate();
        self.session.retarget(voice, rate);
    }

    fn voice_and_rate(&self) -> (Option<Voice>, f32) {
        match &self.resolution {
            Some(res) => (Some(res.voice.clone()), res.effective_rate(self.options.rate)),
            None => (None, self.options.rate),
        }
    }
}
