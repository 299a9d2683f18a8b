use anyhow::{Context, Result};
use std::io::Cursor;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::backend::{CaptureBackend, CaptureConfig};

/// Content type of finalized voice payloads.
pub const AUDIO_CONTENT_TYPE: &str = "audio/wav";

/// A finalized voice recording, ready for upload.
#[derive(Debug, Clone)]
pub struct AudioPayload {
    /// Encoded WAV bytes.
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    /// Number of PCM samples captured (zero-sample captures are valid and
    /// still produce a payload).
    pub sample_count: usize,
}

/// Recording lifecycle state machine: Idle → Capturing → Finalizing → Idle.
///
/// One controller manages at most one capture at a time. Start while already
/// capturing is an idempotent no-op that leaves the accumulated buffer
/// untouched; stop while idle is a no-op. The controller never performs the
/// upload itself; the finalized payload is handed back to the caller.
pub struct RecordingController {
    config: CaptureConfig,
    state: CaptureState,
}

enum CaptureState {
    Idle,
    Capturing {
        backend: Box<dyn CaptureBackend>,
        samples: Arc<Mutex<Vec<i16>>>,
        drain_task: JoinHandle<()>,
    },
}

impl RecordingController {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            state: CaptureState::Idle,
        }
    }

    /// Start capturing on the given backend.
    ///
    /// Returns `Ok(false)` when a capture is already in progress (the second
    /// start does not open another stream and does not reset the buffer).
    /// On failure the controller stays Idle.
    pub async fn start(&mut self, mut backend: Box<dyn CaptureBackend>) -> Result<bool> {
        if matches!(self.state, CaptureState::Capturing { .. }) {
            warn!("capture already in progress, ignoring start");
            return Ok(false);
        }

        let mut chunk_rx = backend
            .start()
            .await
            .context("failed to acquire capture device")?;

        let samples = Arc::new(Mutex::new(Vec::new()));
        let accumulated = Arc::clone(&samples);

        // Append-only accumulation; empty chunks are discarded. The task
        // ends when the backend closes the chunk channel.
        let drain_task = tokio::spawn(async move {
            while let Some(chunk) = chunk_rx.recv().await {
                if chunk.samples.is_empty() {
                    continue;
                }
                accumulated.lock().await.extend_from_slice(&chunk.samples);
            }
        });

        info!("capture started ({})", backend.name());

        self.state = CaptureState::Capturing {
            backend,
            samples,
            drain_task,
        };

        Ok(true)
    }

    /// Stop capturing and finalize the accumulated audio.
    ///
    /// The device is released before the payload is encoded, so a slow or
    /// failed upload afterwards never holds the microphone open. Returns
    /// `Ok(None)` when no capture was in progress.
    pub async fn stop(&mut self) -> Result<Option<AudioPayload>> {
        let state = std::mem::replace(&mut self.state, CaptureState::Idle);
        let CaptureState::Capturing {
            mut backend,
            samples,
            drain_task,
        } = state
        else {
            return Ok(None);
        };

        backend
            .stop()
            .await
            .context("failed to stop capture backend")?;

        if let Err(e) = drain_task.await {
            error!("capture accumulator task panicked: {e}");
        }

        let samples = {
            let mut guard = samples.lock().await;
            std::mem::take(&mut *guard)
        };
        let sample_count = samples.len();

        let bytes = encode_wav(&samples, self.config.sample_rate, self.config.channels)?;

        info!(
            "capture finalized: {} samples ({:.1}s)",
            sample_count,
            sample_count as f64 / f64::from(self.config.sample_rate)
        );

        Ok(Some(AudioPayload {
            bytes,
            content_type: AUDIO_CONTENT_TYPE,
            sample_count,
        }))
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, CaptureState::Capturing { .. })
    }
}

/// Encode PCM samples as an in-memory WAV file.
fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).context("failed to create WAV writer")?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .context("failed to write sample")?;
        }
        writer.finalize().context("failed to finalize WAV data")?;
    }

    Ok(cursor.into_inner())
}
