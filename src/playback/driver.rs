//! Playback Driver
//!
//! Single event loop feeding the controller: engine events, catalog
//! changes, user commands and the settle timer all pass through one
//! `select!`, so the controller never sees two inputs at once.

use super::machine::{PlaybackController, PlaybackEvent, PlaybackVisualState};
use crate::tts::EngineEvent;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep_until;
use tracing::{debug, info};

/// Commands coming from the card UI
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    /// Play/pause button
    Toggle,
    /// A new card side is shown
    SetText(String),
    /// Learning language or picked voice changed
    SetLanguage {
        language: String,
        voice: Option<String>,
    },
    /// Speed slider moved
    SetRate(f32),
    /// The card went away
    Quit,
}

/// Run the controller until the UI quits or drops its command sender
///
/// Every visual change is published on `visual`. Returns the controller,
/// unmounted, so callers can inspect its final state.
pub async fn run(
    mut controller: PlaybackController,
    mut engine_events: mpsc::UnboundedReceiver<EngineEvent>,
    mut commands: mpsc::Receiver<UserCommand>,
    visual: watch::Sender<PlaybackVisualState>,
) -> PlaybackController {
    let catalog = controller.catalog();
    let (catalog_tx, mut catalog_rx) = mpsc::unbounded_channel::<()>();
    let listener = catalog.on_changed(move |_| {
        let _ = catalog_tx.send(());
    });

    info!("▶️ Narration driver started");
    publish(&visual, controller.visual_state());

    loop {
        let settle = controller.settle_deadline();
        let deadline = settle
            .map(|(_, at)| at)
            .unwrap_or_else(tokio::time::Instant::now);

        tokio::select! {
            Some(event) = engine_events.recv() => {
                controller.handle(PlaybackEvent::from(event)).await;
            }
            Some(()) = catalog_rx.recv() => {
                controller.handle(PlaybackEvent::CatalogChanged).await;
            }
            _ = sleep_until(deadline), if settle.is_some() => {
                if let Some((utterance, _)) = settle {
                    controller.handle(PlaybackEvent::SettleElapsed { utterance }).await;
                }
            }
            command = commands.recv() => match command {
                None | Some(UserCommand::Quit) => break,
                Some(command) => apply(&mut controller, command).await,
            },
        }

        publish(&visual, controller.visual_state());
    }

    catalog.remove_listener(listener);
    controller.unmount().await;
    publish(&visual, controller.visual_state());
    info!("⏹️ Narration driver stopped");
    controller
}

async fn apply(controller: &mut PlaybackController, command: UserCommand) {
    debug!("Command: {:?}", command);
    match command {
        UserCommand::Toggle => controller.toggle().await,
        UserCommand::SetText(text) => controller.set_text(&text).await,
        UserCommand::SetLanguage { language, voice } => {
            controller
                .on_language_or_voice_change(&language, voice.as_deref())
                .await
        }
        UserCommand::SetRate(rate) => controller.set_rate(rate),
        UserCommand::Quit => {}
    }
}

fn publish(visual: &watch::Sender<PlaybackVisualState>, state: PlaybackVisualState) {
    visual.send_if_modified(|current| {
        if *current == state {
            false
        } else {
            *current = state;
            true
        }
    });
}
