//! Ricotta - narration for the flashcard trainer
//!
//! Command line host for the narration controller.

use anyhow::Result;
use clap::{Parser, Subcommand};
use ricotta::catalog::{self, VoiceCatalog};
use ricotta::config::Settings;
use ricotta::error::RicottaError;
use ricotta::language::{self, LANGUAGE_BINDINGS};
use ricotta::playback::{
    self, NarrationOptions, PlaybackController, PlaybackStatus, PlaybackVisualState, UserCommand,
};
use ricotta::resolver::VoiceResolver;
use ricotta::tts::{self, EngineHandle};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// How long `speak` waits for a usable voice before giving up
const VOICE_WAIT: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Narrate a word or sentence
    Speak {
        text: String,

        /// Learning language (defaults to the configured one)
        #[arg(short, long)]
        language: Option<String>,

        /// Voice name, overriding the saved pick
        #[arg(long)]
        voice: Option<String>,

        /// Speed in percent of native rate
        #[arg(short, long)]
        speed: Option<u32>,

        /// Keep running; Enter toggles play/pause, `q` quits
        #[arg(short, long)]
        interactive: bool,
    },

    /// List the voices offered for a language
    Voices {
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Save a voice pick for a language
    SetVoice {
        name: String,

        #[arg(short, long)]
        language: Option<String>,
    },

    /// Change the learning language
    SetLanguage { name: String },

    /// Change the narration speed (percent)
    SetSpeed { percent: u32 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = Settings::load()?;

    // Setup logging
    let level = if args.verbose {
        "debug".to_string()
    } else {
        settings.log_level.to_lowercase()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("🧀 Ricotta v{} starting...", env!("CARGO_PKG_VERSION"));

    match args.command {
        Commands::Speak {
            text,
            language,
            voice,
            speed,
            interactive,
        } => {
            let language = canonical_language(
                language.as_deref().unwrap_or(&settings.learning_language),
            )?;
            let mut options = NarrationOptions::from_settings(&settings);
            options.preferred_voice =
                voice.or_else(|| settings.preferred_voice(&language).map(str::to_string));
            options.language = language;
            if let Some(percent) = speed {
                options.rate = percent as f32 / 100.0;
            }
            speak(&settings, text, options, interactive).await?;
        }
        Commands::Voices { language } => {
            let language = canonical_language(
                language.as_deref().unwrap_or(&settings.learning_language),
            )?;
            list_voices(&settings, &language).await?;
        }
        Commands::SetVoice { name, language } => {
            let language = canonical_language(
                language.as_deref().unwrap_or(&settings.learning_language),
            )?;
            let offered = load_catalog(&settings).await?.voices_for_language(&language);
            if !offered.iter().any(|v| v.name == name) {
                return Err(RicottaError::UnknownVoice {
                    voice: name,
                    language,
                }
                .into());
            }
            settings.set_preferred_voice(&language, &name);
            settings.save()?;
            info!("💾 {} voice set to {}", language, name);
        }
        Commands::SetLanguage { name } => {
            settings.learning_language = canonical_language(&name)?;
            settings.save()?;
            info!("💾 Learning language set to {}", settings.learning_language);
        }
        Commands::SetSpeed { percent } => {
            if !(10..=300).contains(&percent) {
                return Err(RicottaError::Config(format!(
                    "speed must be between 10 and 300 percent, got {}",
                    percent
                ))
                .into());
            }
            settings.speed_percent = percent;
            settings.save()?;
            info!("💾 Narration speed set to {}%", percent);
        }
    }

    Ok(())
}

fn canonical_language(name: &str) -> Result<String, RicottaError> {
    language::find_binding(LANGUAGE_BINDINGS, name)
        .map(|b| b.display_name.to_string())
        .ok_or_else(|| {
            warn!("Known languages: {}", language::language_names().join(", "));
            RicottaError::UnknownLanguage(name.to_string())
        })
}

async fn load_catalog(settings: &Settings) -> Result<VoiceCatalog> {
    let (tx, _rx) = mpsc::unbounded_channel();
    let engine = tts::create_engine(settings, tx);
    let voices = engine.list_voices().await?;
    Ok(VoiceCatalog::with_voices(voices))
}

async fn list_voices(settings: &Settings, language: &str) -> Result<()> {
    let catalog = load_catalog(settings).await?;
    let offered = catalog.voices_for_language(language);
    if offered.is_empty() {
        println!("No {} voices installed.", language);
        return Ok(());
    }

    let picked = VoiceResolver::default()
        .resolve(&catalog.voices(), language, settings.preferred_voice(language))
        .map(|r| r.voice.name);
    for voice in &offered {
        let marker = if picked.as_deref() == Some(voice.name.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{} {:<32} {:<10} {}",
            marker,
            voice.display_label(&offered),
            voice.language_tag,
            voice.name
        );
    }
    Ok(())
}

async fn speak(
    settings: &Settings,
    text: String,
    options: NarrationOptions,
    interactive: bool,
) -> Result<()> {
    let language = options.language.clone();
    let (engine_tx, engine_rx) = mpsc::unbounded_channel();
    let engine = tts::create_engine(settings, engine_tx);
    let catalog = Arc::new(VoiceCatalog::new());
    let handle = EngineHandle::new(engine.clone());

    let controller = PlaybackController::activate(&handle, catalog.clone(), options).await;
    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let (visual_tx, mut visual_rx) = watch::channel(PlaybackVisualState::ready());
    let driver = tokio::spawn(playback::run(controller, engine_rx, cmd_rx, visual_tx));

    catalog::spawn_refresh(engine, catalog);
    cmd_tx.send(UserCommand::SetText(text)).await?;

    if interactive {
        let stdin_tx = cmd_tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let command = match line.trim() {
                    "q" | "quit" => UserCommand::Quit,
                    _ => UserCommand::Toggle,
                };
                let quit = command == UserCommand::Quit;
                if stdin_tx.send(command).await.is_err() || quit {
                    return;
                }
            }
            let _ = stdin_tx.send(UserCommand::Quit).await;
        });
    }

    let mut started = false;
    loop {
        let changed = if started || interactive {
            visual_rx.changed().await.is_ok()
        } else {
            match tokio::time::timeout(VOICE_WAIT, visual_rx.changed()).await {
                Ok(result) => result.is_ok(),
                Err(_) => {
                    warn!("🔇 No voice available for {}", language);
                    false
                }
            }
        };
        if !changed {
            break;
        }

        let state = *visual_rx.borrow_and_update();
        render(&state);
        if state.status != PlaybackStatus::Idle {
            started = true;
        } else if started && !interactive {
            break;
        }
    }

    let _ = cmd_tx.send(UserCommand::Quit).await;
    driver.await?;
    eprintln!();
    Ok(())
}

fn render(state: &PlaybackVisualState) {
    let icon = match state.status {
        PlaybackStatus::Idle => "▶",
        PlaybackStatus::Playing => "⏸",
        PlaybackStatus::Paused => "▶",
    };
    eprint!("\r{} {:>3}%", icon, (state.progress * 100.0).round() as u32);
    let _ = std::io::stderr().flush();
}
