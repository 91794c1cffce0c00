//! espeak-ng backend
//!
//! Synthesis runs the local `espeak-ng` binary into a WAV buffer; playback
//! happens on a dedicated audio thread that owns rodio's non-Send output
//! stream. The thread paces boundary events over the clip duration, one per
//! word start, since espeak-ng does not report word offsets on the CLI.

use super::{EngineEvent, EngineEventSender, SpeechEngine, UtteranceId, UtteranceRequest};
use crate::voice::Voice;
use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use std::io::Cursor;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

/// espeak-ng speed at rate 1.0, in words per minute
pub const NATIVE_WPM: f32 = 175.0;

const MIN_WPM: u32 = 80;
const MAX_WPM: u32 = 450;

/// How often the audio thread checks progress
const TICK: Duration = Duration::from_millis(20);

/// Commands sent to the audio thread
enum AudioCommand {
    Play {
        utterance: UtteranceId,
        wav: Vec<u8>,
        text: String,
        wpm: u32,
    },
    Pause,
    Resume,
    Stop,
}

/// Playback bookkeeping for the utterance on the sink
struct ActiveClip {
    utterance: UtteranceId,
    /// (offset into the clip, char index) per word start
    marks: Vec<(Duration, usize)>,
    next_mark: usize,
    played: Duration,
    resumed_at: Option<Instant>,
}

impl ActiveClip {
    fn elapsed(&self) -> Duration {
        self.played + self.resumed_at.map(|t| t.elapsed()).unwrap_or_default()
    }
}

pub struct EspeakEngine {
    binary: String,
    sender: mpsc::Sender<AudioCommand>,
    events: EngineEventSender,
    /// Latest utterance asked for; 0 after a cancel
    latest: Arc<AtomicU64>,
}

impl std::fmt::Debug for EspeakEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EspeakEngine")
            .field("binary", &self.binary)
            .finish()
    }
}

impl EspeakEngine {
    pub fn new(binary: &str, events: EngineEventSender) -> Result<Self> {
        // Probe the binary up front so a missing install degrades cleanly
        let probe = std::process::Command::new(binary)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| anyhow::anyhow!("Failed to run {}: {}", binary, e))?;
        if !probe.status.success() {
            anyhow::bail!("{} --version failed with status {}", binary, probe.status);
        }
        info!(
            "🔊 Found {}",
            String::from_utf8_lossy(&probe.stdout).lines().next().unwrap_or(binary)
        );

        let (sender, receiver) = mpsc::channel::<AudioCommand>();
        let latest = Arc::new(AtomicU64::new(0));
        let thread_events = events.clone();
        let thread_latest = latest.clone();
        thread::spawn(move || {
            Self::audio_thread(receiver, thread_events, thread_latest);
        });

        Ok(Self {
            binary: binary.to_string(),
            sender,
            events,
            latest,
        })
    }

    fn send(&self, cmd: AudioCommand) -> Result<()> {
        send_audio(&self.sender, cmd)
    }

    /// Synthesize in the background and hand the clip to the audio thread,
    /// unless a newer request or a cancel arrived meanwhile
    async fn render(
        binary: String,
        request: UtteranceRequest,
        wpm: u32,
        sender: mpsc::Sender<AudioCommand>,
        events: EngineEventSender,
        latest: Arc<AtomicU64>,
    ) {
        let is_latest = || latest.load(Ordering::SeqCst) == request.id.get();

        match synthesize(&binary, &request, wpm).await {
            Ok(_) if !is_latest() => {
                debug!("Utterance {} superseded during synthesis", request.id);
            }
            Ok(wav) => {
                let play = AudioCommand::Play {
                    utterance: request.id,
                    wav,
                    text: request.text,
                    wpm,
                };
                if let Err(e) = send_audio(&sender, play) {
                    error!("❌ {}", e);
                    let _ = events.send(EngineEvent::Ended {
                        utterance: request.id,
                    });
                }
            }
            Err(e) => {
                error!("❌ Synthesis of {} failed: {}", request.id, e);
                if is_latest() {
                    let _ = events.send(EngineEvent::Ended {
                        utterance: request.id,
                    });
                }
            }
        }
    }

    fn audio_thread(
        receiver: mpsc::Receiver<AudioCommand>,
        events: EngineEventSender,
        latest: Arc<AtomicU64>,
    ) {
        use rodio::{OutputStream, Sink};

        let (stream, stream_handle) = match OutputStream::try_default() {
            Ok(s) => s,
            Err(e) => {
                warn!("🔇 Failed to initialize audio output: {}", e);
                return;
            }
        };

        // Keep stream alive
        let _stream = stream;
        let mut sink = match Sink::try_new(&stream_handle) {
            Ok(s) => s,
            Err(e) => {
                error!("❌ Failed to create audio sink: {}", e);
                return;
            }
        };
        let mut active: Option<ActiveClip> = None;

        info!("🔊 Audio thread started");

        loop {
            match receiver.recv_timeout(TICK) {
                Ok(AudioCommand::Play { utterance, .. })
                    if latest.load(Ordering::SeqCst) != utterance.get() =>
                {
                    debug!("Dropping clip of superseded utterance {}", utterance);
                }
                Ok(AudioCommand::Play {
                    utterance,
                    wav,
                    text,
                    wpm,
                }) => {
                    sink.stop();
                    if let Ok(new_sink) = Sink::try_new(&stream_handle) {
                        sink = new_sink;
                    }
                    active = None;

                    match Self::queue_clip(&sink, wav) {
                        Ok(duration) => {
                            let duration =
                                duration.unwrap_or_else(|| estimate_duration(&text, wpm));
                            debug!("Playing utterance {} ({:?})", utterance, duration);
                            let _ = events.send(EngineEvent::Started { utterance });
                            active = Some(ActiveClip {
                                utterance,
                                marks: boundary_marks(&text, duration),
                                next_mark: 0,
                                played: Duration::ZERO,
                                resumed_at: Some(Instant::now()),
                            });
                        }
                        Err(e) => {
                            error!("❌ Could not decode speech for {}: {}", utterance, e);
                            let _ = events.send(EngineEvent::Ended { utterance });
                        }
                    }
                }
                Ok(AudioCommand::Pause) => {
                    sink.pause();
                    if let Some(clip) = active.as_mut() {
                        if let Some(since) = clip.resumed_at.take() {
                            clip.played += since.elapsed();
                        }
                    }
                }
                Ok(AudioCommand::Resume) => {
                    sink.play();
                    if let Some(clip) = active.as_mut() {
                        if clip.resumed_at.is_none() {
                            clip.resumed_at = Some(Instant::now());
                        }
                    }
                }
                Ok(AudioCommand::Stop) => {
                    if active.take().is_some() {
                        debug!("🛑 Stopping speech");
                    }
                    sink.stop();
                    // Re-create sink after stop as it becomes unusable if we want to play again
                    if let Ok(new_sink) = Sink::try_new(&stream_handle) {
                        sink = new_sink;
                    }
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }

            let finished = match active.as_mut() {
                Some(clip) => {
                    let elapsed = clip.elapsed();
                    while let Some(&(at, char_index)) = clip.marks.get(clip.next_mark) {
                        if at > elapsed {
                            break;
                        }
                        let _ = events.send(EngineEvent::Boundary {
                            utterance: clip.utterance,
                            char_index,
                        });
                        clip.next_mark += 1;
                    }
                    sink.empty()
                }
                None => false,
            };

            if finished {
                if let Some(clip) = active.take() {
                    let _ = events.send(EngineEvent::Ended {
                        utterance: clip.utterance,
                    });
                }
            }
        }

        info!("🔇 Audio thread stopped");
    }

    fn queue_clip(sink: &rodio::Sink, wav: Vec<u8>) -> Result<Option<Duration>> {
        use rodio::{Decoder, Source};

        let source = Decoder::new(Cursor::new(wav))?;
        let duration = source.total_duration();
        sink.append(source);
        sink.play();
        Ok(duration)
    }
}

#[async_trait]
impl SpeechEngine for EspeakEngine {
    async fn speak(&self, request: &UtteranceRequest) -> Result<()> {
        info!("📢 espeak-ng speaking {} with {}", request.id, request.voice.name);

        // Anything still audible belongs to a superseded utterance
        self.latest.store(request.id.get(), Ordering::SeqCst);
        self.send(AudioCommand::Stop)?;

        tokio::spawn(Self::render(
            self.binary.clone(),
            request.clone(),
            rate_to_wpm(request.rate),
            self.sender.clone(),
            self.events.clone(),
            self.latest.clone(),
        ));
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.send(AudioCommand::Pause)
    }

    async fn resume(&self) -> Result<()> {
        self.send(AudioCommand::Resume)
    }

    async fn cancel_all(&self) -> Result<()> {
        self.latest.store(0, Ordering::SeqCst);
        self.send(AudioCommand::Stop)
    }

    async fn list_voices(&self) -> Result<Vec<Voice>> {
        let output = tokio::process::Command::new(&self.binary)
            .arg("--voices")
            .stderr(Stdio::null())
            .output()
            .await?;
        if !output.status.success() {
            anyhow::bail!("{} --voices failed with status {}", self.binary, output.status);
        }
        Ok(parse_voice_list(&String::from_utf8_lossy(&output.stdout)))
    }

    fn name(&self) -> &str {
        "espeak-ng"
    }
}

fn send_audio(sender: &mpsc::Sender<AudioCommand>, cmd: AudioCommand) -> Result<()> {
    sender
        .send(cmd)
        .map_err(|e| anyhow::anyhow!("Audio thread disconnected: {}", e))
}

/// Run espeak-ng on the request's text and collect the WAV it prints
async fn synthesize(binary: &str, request: &UtteranceRequest, wpm: u32) -> Result<Vec<u8>> {
    let mut child = tokio::process::Command::new(binary)
        .arg("-v")
        .arg(&request.voice.identifier)
        .arg("-s")
        .arg(wpm.to_string())
        .arg("--stdout")
        .arg("--stdin")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            error!("❌ Failed to spawn {}: {}", binary, e);
            anyhow::anyhow!("Failed to spawn {}: {}", binary, e)
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(request.text.as_bytes()).await?;
        stdin.flush().await?;
    }

    let output = child.wait_with_output().await?;
    if !output.status.success() {
        anyhow::bail!(
            "{} failed with status {}: {}",
            binary,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    if output.stdout.is_empty() {
        anyhow::bail!("{} produced no audio", binary);
    }
    Ok(output.stdout)
}

/// Map a rate multiplier to espeak-ng words per minute
pub fn rate_to_wpm(rate: f32) -> u32 {
    let rate = if rate.is_finite() && rate > 0.0 { rate } else { 1.0 };
    ((NATIVE_WPM * rate).round() as u32).clamp(MIN_WPM, MAX_WPM)
}

/// Parse the table printed by `espeak-ng --voices`
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File                 Other Languages
///  5  es              --/M      Spanish_(Spain)    roa/es
/// ```
pub fn parse_voice_list(output: &str) -> Vec<Voice> {
    static ROW: OnceLock<Regex> = OnceLock::new();
    let row = ROW.get_or_init(|| {
        Regex::new(r"^\s*\d+\s+(\S+)\s+\S+\s+(\S+)\s+\S+").expect("valid regex")
    });

    output
        .lines()
        .filter_map(|line| row.captures(line))
        .map(|caps| {
            let language = &caps[1];
            let raw_name = &caps[2];
            Voice::new(raw_name.replace('_', " "), language).with_identifier(raw_name)
        })
        .collect()
}

/// Char offsets where words start
pub fn word_starts(text: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut in_word = false;
    for (index, ch) in text.chars().enumerate() {
        if ch.is_whitespace() {
            in_word = false;
        } else if !in_word {
            starts.push(index);
            in_word = true;
        }
    }
    starts
}

/// Spread word starts over the clip proportionally to their char offset
fn boundary_marks(text: &str, duration: Duration) -> Vec<(Duration, usize)> {
    let total = text.chars().count().max(1) as f64;
    word_starts(text)
        .into_iter()
        .map(|index| (duration.mul_f64(index as f64 / total), index))
        .collect()
}

fn estimate_duration(text: &str, wpm: u32) -> Duration {
    let words = text.split_whitespace().count().max(1) as f64;
    Duration::from_secs_f64(words * 60.0 / wpm.max(1) as f64)
}
