//! Utterance Session
//!
//! Owns the single live utterance and translates play/pause/cancel into
//! engine commands. Events from superseded utterances are filtered here.

use crate::tts::{EngineEvent, EngineLease, UtteranceId, UtteranceRequest};
use crate::voice::Voice;
use anyhow::Result;
use tracing::{debug, info};

/// Lifecycle of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Speaking,
    Paused,
}

/// What a call to [`UtteranceSession::play`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// A new utterance was handed to the engine
    Started(UtteranceId),
    /// The paused utterance continues
    Resumed,
    /// Nothing to do (already speaking, no voice or empty text)
    Ignored,
}

/// Engine event that belongs to the live utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Started(UtteranceId),
    Boundary { utterance: UtteranceId, char_index: usize },
    Ended(UtteranceId),
}

#[derive(Debug)]
pub struct UtteranceSession {
    lease: EngineLease,
    text: String,
    voice: Option<Voice>,
    rate: f32,
    state: SessionState,
    live: Option<UtteranceId>,
}

impl UtteranceSession {
    pub fn new(lease: EngineLease) -> Self {
        Self {
            lease,
            text: String::new(),
            voice: None,
            rate: 1.0,
            state: SessionState::Idle,
            live: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn live(&self) -> Option<UtteranceId> {
        self.live
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn voice(&self) -> Option<&Voice> {
        self.voice.as_ref()
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn has_voice(&self) -> bool {
        self.voice.is_some()
    }

    /// Prepare the next utterance; never starts audio
    ///
    /// A live utterance is stopped first. Re-applying the same
    /// configuration while idle changes nothing.
    pub async fn configure(&mut self, text: &str, voice: Option<Voice>, rate: f32) -> Result<()> {
        let unchanged = self.text == text && self.voice == voice && self.rate == rate;
        if unchanged && self.state == SessionState::Idle {
            return Ok(());
        }

        let stopped = self.cancel().await;
        self.text = text.to_string();
        self.voice = voice;
        self.rate = rate;
        stopped
    }

    /// Change voice and rate for the next fresh start without touching
    /// whatever is speaking or paused right now
    pub fn retarget(&mut self, voice: Option<Voice>, rate: f32) {
        self.voice = voice;
        self.rate = rate;
    }

    /// Start from the beginning, or resume if paused
    pub async fn play(&mut self) -> Result<PlayOutcome> {
        match self.state {
            SessionState::Speaking => Ok(PlayOutcome::Ignored),
            SessionState::Paused => {
                self.lease.resume().await?;
                self.state = SessionState::Speaking;
                debug!("Resumed utterance {:?}", self.live);
                Ok(PlayOutcome::Resumed)
            }
            SessionState::Idle => {
                let Some(voice) = self.voice.clone() else {
                    debug!("No voice resolved, not speaking");
                    return Ok(PlayOutcome::Ignored);
                };
                if self.text.trim().is_empty() {
                    return Ok(PlayOutcome::Ignored);
                }

                let request = UtteranceRequest {
                    id: UtteranceId::next(),
                    text: self.text.clone(),
                    voice,
                    rate: self.rate,
                };
                self.lease.speak(&request).await?;

                info!(
                    "🗣️ Speaking {} via {} ({}, rate {:.2})",
                    request.id,
                    self.lease.engine_name(),
                    request.voice.name,
                    request.rate
                );
                self.live = Some(request.id);
                self.state = SessionState::Speaking;
                Ok(PlayOutcome::Started(request.id))
            }
        }
    }

    /// Pause if speaking; returns whether anything changed
    pub async fn pause(&mut self) -> Result<bool> {
        if self.state != SessionState::Speaking {
            return Ok(false);
        }
        self.lease.pause().await?;
        self.state = SessionState::Paused;
        Ok(true)
    }

    /// Stop the live utterance, if any
    pub async fn cancel(&mut self) -> Result<()> {
        let live = self.live.take();
        let was_active = self.state != SessionState::Idle;
        self.state = SessionState::Idle;

        if live.is_some() || was_active {
            debug!("Cancelling utterance {:?}", live);
            self.lease.cancel_all().await?;
        }
        Ok(())
    }

    /// Filter an engine event down to the live utterance
    ///
    /// Returns `None` for events of superseded utterances and for catalog
    /// announcements.
    pub fn accept(&mut self, event: &EngineEvent) -> Option<SessionEvent> {
        let utterance = event.utterance()?;
        if self.live != Some(utterance) {
            debug!("Dropping event for stale utterance {}", utterance);
            return None;
        }

        match event {
            EngineEvent::Started { .. } => Some(SessionEvent::Started(utterance)),
            EngineEvent::Boundary { char_index, .. } => Some(SessionEvent::Boundary {
                utterance,
                char_index: *char_index,
            }),
            EngineEvent::Ended { .. } => {
                self.live = None;
                self.state = SessionState::Idle;
                Some(SessionEvent::Ended(utterance))
            }
            EngineEvent::VoicesChanged(_) => None,
        }
    }
}
