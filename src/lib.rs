pub mod capture;
pub mod config;
pub mod error;
pub mod gateway;
pub mod model;
pub mod session;
pub mod store;

pub use capture::{
    AudioChunk, AudioPayload, CaptureBackend, CaptureBackendFactory, CaptureConfig,
    MicrophoneBackend, MicrophoneFactory, RecordingController, AUDIO_CONTENT_TYPE,
};
pub use config::Config;
pub use error::BridgeError;
pub use gateway::{ConversationGateway, HttpGateway};
pub use model::{Conversation, Message, SenderRole, SummaryResponse, SUPPORTED_LANGUAGES};
pub use session::{BridgeSession, SessionSettings};
pub use store::{SessionStore, ViewGeneration};
