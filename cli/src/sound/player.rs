use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rodio::source::{SineWave, Source};
use rodio::{OutputStream, Sink};
use thiserror::Error;
use tracing::warn;

use crate::sound::SoundAsset;

/// How often a sounding pulse checks for a stop request.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("audio device not available: {0}")]
    DeviceNotAvailable(String),
    #[error("playback failed: {0}")]
    Failed(String),
}

/// Plays one alarm pulse and returns when it has finished sounding.
///
/// `None` means no custom sound is installed and the built-in tone should
/// be used.
#[async_trait]
pub trait PulsePlayer: Send + Sync {
    async fn play(&self, asset: Option<&SoundAsset>) -> Result<(), PlaybackError>;

    /// Silences any pulse still sounding. Pulses started afterwards play
    /// in full.
    fn stop(&self);
}

/// Pulse player backed by the default rodio output device.
///
/// `stop` bumps a generation counter; a sounding pulse polls it and cuts
/// itself short when its generation has passed.
pub struct RodioPlayer {
    generation: Arc<AtomicU64>,
}

impl RodioPlayer {
    pub fn new() -> Self {
        Self {
            generation: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl Default for RodioPlayer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PulsePlayer for RodioPlayer {
    async fn play(&self, asset: Option<&SoundAsset>) -> Result<(), PlaybackError> {
        let payload = asset.map(|a| (a.bytes(), a.path().display().to_string()));
        let generation = Arc::clone(&self.generation);
        let started = generation.load(Ordering::SeqCst);

        // Audio output blocks for the length of the pulse, so hand it to a
        // blocking thread.
        tokio::task::spawn_blocking(move || play_pulse_sync(payload, &generation, started))
            .await
            .map_err(|e| PlaybackError::Failed(format!("task join error: {}", e)))?
    }

    fn stop(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

fn play_pulse_sync(
    payload: Option<(Arc<[u8]>, String)>,
    generation: &AtomicU64,
    started: u64,
) -> Result<(), PlaybackError> {
    let (_stream, stream_handle) = OutputStream::try_default()
        .map_err(|e| PlaybackError::DeviceNotAvailable(e.to_string()))?;

    let sink = Sink::try_new(&stream_handle).map_err(|e| PlaybackError::Failed(e.to_string()))?;

    match payload {
        Some((bytes, path)) => match rodio::Decoder::new(Cursor::new(bytes)) {
            Ok(decoded) => sink.append(decoded),
            Err(e) => {
                warn!(error = %e, path = %path, "custom sound did not decode, using built-in tone");
                append_builtin_tone(&sink);
            }
        },
        None => append_builtin_tone(&sink),
    }

    // Drain in slices instead of sleeping to the end, so a stop request
    // lands mid-pulse.
    while !sink.empty() {
        if generation.load(Ordering::SeqCst) != started {
            sink.stop();
            break;
        }
        std::thread::sleep(STOP_POLL_INTERVAL);
    }

    Ok(())
}

/// Two-note descending chirp used when no custom sound is installed.
fn append_builtin_tone(sink: &Sink) {
    sink.append(tone(880.0, 180));
    sink.append(tone(660.0, 220));
}

fn tone(freq: f32, duration_ms: u64) -> impl Source<Item = f32> + Send {
    let fade_ms = (duration_ms / 5).min(30);
    SineWave::new(freq)
        .take_duration(Duration::from_millis(duration_ms))
        .fade_in(Duration::from_millis(fade_ms))
        .amplify(0.6)
}
