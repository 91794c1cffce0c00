//! Voice Catalog
//!
//! Process-wide snapshot of the voices the engine offers. The engine lists
//! its voices asynchronously, possibly in several batches, so the snapshot
//! may be empty for a while (or forever, on hosts without voices).

use crate::language;
use crate::tts::SpeechEngine;
use crate::voice::Voice;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Handle returned by [`VoiceCatalog::on_changed`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&[Voice]) + Send + Sync>;

/// Installed voices, refreshed in place
#[derive(Default)]
pub struct VoiceCatalog {
    voices: RwLock<Vec<Voice>>,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_listener: AtomicU64,
}

impl std::fmt::Debug for VoiceCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceCatalog")
            .field("voices", &self.voices().len())
            .finish()
    }
}

impl VoiceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog pre-filled with voices (tests, fixed hosts)
    pub fn with_voices(voices: Vec<Voice>) -> Self {
        let catalog = Self::new();
        *catalog.voices.write().unwrap_or_else(|e| e.into_inner()) = voices;
        catalog
    }

    /// Synchronous snapshot, possibly empty
    pub fn voices(&self) -> Vec<Voice> {
        self.voices
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_empty(&self) -> bool {
        self.voices
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty()
    }

    /// Replace the whole list (the engine re-announced its voices)
    pub fn replace(&self, voices: Vec<Voice>) {
        {
            let mut current = self.voices.write().unwrap_or_else(|e| e.into_inner());
            *current = voices;
        }
        self.notify();
    }

    /// Append a batch, skipping names already listed
    pub fn extend(&self, batch: Vec<Voice>) {
        {
            let mut current = self.voices.write().unwrap_or_else(|e| e.into_inner());
            for voice in batch {
                if !current.iter().any(|v| v.name == voice.name) {
                    current.push(voice);
                }
            }
        }
        self.notify();
    }

    /// Register a listener invoked after every (re)population
    pub fn on_changed<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&[Voice]) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, Arc::new(listener)));
        id
    }

    /// Unregister a listener; unknown ids are ignored
    pub fn remove_listener(&self, id: ListenerId) {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|(listener_id, _)| *listener_id != id);
    }

    /// Voices whose locale matches a learning language (settings picker)
    pub fn voices_for_language(&self, learning_language: &str) -> Vec<Voice> {
        let Some(code) = language::locale_for(learning_language) else {
            return Vec::new();
        };
        self.voices()
            .into_iter()
            .filter(|v| v.primary_language() == code)
            .collect()
    }

    fn notify(&self) {
        let snapshot = self.voices();
        debug!("Voice catalog now holds {} voices", snapshot.len());
        // Listeners may (un)register listeners themselves
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(&snapshot);
        }
    }
}

/// Ask the engine for its voices in the background and publish them
pub fn spawn_refresh(engine: Arc<dyn SpeechEngine>, catalog: Arc<VoiceCatalog>) -> JoinHandle<()> {
    tokio::spawn(async move {
        match engine.list_voices().await {
            Ok(voices) => {
                info!("🗣️ {} listed {} voices", engine.name(), voices.len());
                catalog.replace(voices);
            }
            Err(e) => {
                warn!("⚠️ Could not list voices from {}: {}", engine.name(), e);
            }
        }
    })
}
