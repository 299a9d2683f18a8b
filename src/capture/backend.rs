use anyhow::Result;
use tokio::sync::mpsc;

/// A slice of captured audio (i16 PCM, interleaved).
///
/// Chunk boundaries carry no meaning; they are whatever granularity the
/// capture device delivers. Empty chunks may be emitted and are discarded by
/// the accumulator.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub samples: Vec<i16>,
}

/// Configuration for audio capture.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target sample rate (input is resampled if needed).
    pub sample_rate: u32,
    /// Target channel count (1 = mono).
    pub channels: u16,
    /// Capture buffer granularity in milliseconds (advisory; device-driven
    /// backends may deliver their own buffer sizes).
    pub buffer_duration_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            buffer_duration_ms: 100,
        }
    }
}

/// Audio capture backend trait.
///
/// A backend owns exactly one hardware (or scripted) capture stream.
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Start capturing.
    ///
    /// Returns a channel receiver that will receive audio chunks. Failing to
    /// acquire the device must leave the backend stopped.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>>;

    /// Stop capturing and release the device.
    ///
    /// Implementations must drop their sender so the chunk channel closes;
    /// the accumulator relies on this to know the stream has ended.
    async fn stop(&mut self) -> Result<()>;

    /// Check if the backend is currently capturing.
    fn is_capturing(&self) -> bool;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Creates a fresh backend for each recording.
///
/// The orchestrator holds one factory for the life of the session; tests
/// inject scripted backends through it.
pub trait CaptureBackendFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn CaptureBackend>>;
}
