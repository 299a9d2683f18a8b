//! Outbound network façade for the remote bridge service.
//!
//! The gateway translates orchestrator verbs into HTTP requests and
//! normalizes results and errors into typed outcomes. It is deliberately
//! fire-and-forget: no retries, no caching, no deduplication. Retry policy
//! belongs to the caller.

mod http;

pub use http::HttpGateway;

use crate::capture::AudioPayload;
use crate::error::BridgeError;
use crate::model::{Conversation, Message, SenderRole, SummaryResponse};

/// The five remote operations the client exercises.
///
/// `search` and `summarize` are read-only and idempotent; the send operations
/// are not and must only be re-issued by a fresh user action.
#[async_trait::async_trait]
pub trait ConversationGateway: Send + Sync {
    /// POST /conversations. Opens a new bridge session.
    async fn create_conversation(
        &self,
        doctor_language: &str,
        patient_language: &str,
    ) -> Result<Conversation, BridgeError>;

    /// POST /messages/text. Submits a text message.
    async fn send_text(
        &self,
        conversation_id: &str,
        sender_role: SenderRole,
        text: &str,
    ) -> Result<Message, BridgeError>;

    /// POST /messages/audio (multipart). Submits a voice message.
    async fn send_audio(
        &self,
        conversation_id: &str,
        sender_role: SenderRole,
        payload: AudioPayload,
    ) -> Result<Message, BridgeError>;

    /// GET /search. Keyword search across message history.
    async fn search(&self, query: &str) -> Result<Vec<Message>, BridgeError>;

    /// POST /summary/{conversation_id}. Requests an AI summary.
    async fn summarize(&self, conversation_id: &str) -> Result<SummaryResponse, BridgeError>;
}
