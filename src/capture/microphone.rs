use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::error;

use super::backend::{AudioChunk, CaptureBackend, CaptureBackendFactory, CaptureConfig};

/// Microphone capture over cpal.
///
/// `cpal::Stream` is not `Send`, so the stream lives on a dedicated thread
/// that owns it for the duration of the capture and forwards converted chunks
/// into a tokio channel. Stopping sets a flag and joins the thread, which
/// drops the stream and releases the device before `stop` returns.
pub struct MicrophoneBackend {
    config: CaptureConfig,
    worker: Option<CaptureWorker>,
}

struct CaptureWorker {
    stop: Arc<AtomicBool>,
    thread: std::thread::JoinHandle<()>,
}

impl MicrophoneBackend {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            worker: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>> {
        if self.worker.is_some() {
            anyhow::bail!("microphone capture already running");
        }

        let (chunk_tx, chunk_rx) = mpsc::channel(64);
        let (ready_tx, ready_rx) = oneshot::channel();
        let stop = Arc::new(AtomicBool::new(false));

        let stop_flag = Arc::clone(&stop);
        let target_rate = self.config.sample_rate;
        let thread = std::thread::spawn(move || {
            run_capture_thread(target_rate, chunk_tx, ready_tx, stop_flag);
        });

        // The thread reports back once the stream is playing (or failed).
        ready_rx
            .await
            .context("capture thread exited before reporting readiness")??;

        self.worker = Some(CaptureWorker { stop, thread });
        Ok(chunk_rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(worker) = self.worker.take() {
            worker.stop.store(true, Ordering::SeqCst);
            tokio::task::spawn_blocking(move || worker.thread.join())
                .await
                .context("failed to join capture thread")?
                .map_err(|_| anyhow::anyhow!("capture thread panicked"))?;
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.worker.is_some()
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

/// Factory producing one `MicrophoneBackend` per recording.
pub struct MicrophoneFactory {
    config: CaptureConfig,
}

impl MicrophoneFactory {
    pub fn new(config: CaptureConfig) -> Self {
        Self { config }
    }
}

impl CaptureBackendFactory for MicrophoneFactory {
    fn create(&self) -> Result<Box<dyn CaptureBackend>> {
        Ok(Box::new(MicrophoneBackend::new(self.config.clone())))
    }
}

fn run_capture_thread(
    target_rate: u32,
    chunk_tx: mpsc::Sender<AudioChunk>,
    ready_tx: oneshot::Sender<Result<()>>,
    stop: Arc<AtomicBool>,
) {
    let stream = match open_input_stream(target_rate, chunk_tx) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(anyhow::anyhow!("failed to start audio stream: {e}")));
        return;
    }

    let _ = ready_tx.send(Ok(()));

    while !stop.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(20));
    }

    // Dropping the stream stops capture and releases the device; the chunk
    // sender goes with it, closing the channel on the accumulator side.
    drop(stream);
}

fn open_input_stream(target_rate: u32, chunk_tx: mpsc::Sender<AudioChunk>) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .context("no default input device available")?;

    let supported = device
        .default_input_config()
        .context("failed to read input device config")?;

    let in_rate = supported.sample_rate();
    let in_channels = supported.channels() as usize;
    let stream_config: cpal::StreamConfig = supported.clone().into();

    let stream = match supported.sample_format() {
        cpal::SampleFormat::F32 => device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let samples = convert_samples(data, in_rate, in_channels, target_rate);
                    // If the accumulator is behind, drop the chunk rather
                    // than block the audio callback.
                    let _ = chunk_tx.try_send(AudioChunk { samples });
                },
                |err| error!("audio stream error: {err}"),
                None,
            )
            .context("failed to build input stream")?,
        cpal::SampleFormat::I16 => device
            .build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let float_data: Vec<f32> = data
                        .iter()
                        .map(|&s| f32::from(s) / f32::from(i16::MAX))
                        .collect();
                    let samples = convert_samples(&float_data, in_rate, in_channels, target_rate);
                    let _ = chunk_tx.try_send(AudioChunk { samples });
                },
                |err| error!("audio stream error: {err}"),
                None,
            )
            .context("failed to build input stream")?,
        format => anyhow::bail!("unsupported sample format: {format:?}"),
    };

    Ok(stream)
}

/// Convert a device buffer to mono i16 PCM at the target rate.
///
/// Mono by averaging channels, nearest-neighbor resampling. Quality is fine
/// for speech; the service's ASR runs on the uploaded payload as-is.
fn convert_samples(data: &[f32], in_rate: u32, in_channels: usize, target_rate: u32) -> Vec<i16> {
    let mono: Vec<f32> = data
        .chunks(in_channels.max(1))
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();

    let resampled: Vec<f32> = if in_rate == target_rate {
        mono
    } else {
        let ratio = f64::from(target_rate) / f64::from(in_rate);
        let out_len = (mono.len() as f64 * ratio) as usize;
        (0..out_len)
            .filter_map(|i| {
                let src = (i as f64 / ratio) as usize;
                mono.get(src).copied()
            })
            .collect()
    };

    resampled
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16)
        .collect()
}
