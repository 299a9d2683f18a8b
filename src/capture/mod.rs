//! Audio capture for voice messages.
//!
//! This module provides:
//! - `CaptureBackend`: the async capture abstraction (chunked PCM over a
//!   channel) plus a factory trait so tests can inject scripted capture
//! - `MicrophoneBackend`: cpal-based microphone capture
//! - `RecordingController`: the Idle → Capturing → Finalizing state machine
//!   that accumulates chunks and finalizes them into a single WAV payload

pub mod backend;
pub mod microphone;
pub mod recorder;

pub use backend::{AudioChunk, CaptureBackend, CaptureBackendFactory, CaptureConfig};
pub use microphone::{MicrophoneBackend, MicrophoneFactory};
pub use recorder::{AudioPayload, RecordingController, AUDIO_CONTENT_TYPE};
