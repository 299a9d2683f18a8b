use thiserror::Error;

/// Failure taxonomy for the bridge client.
///
/// Every variant is recoverable: verbs that fail leave the session state
/// exactly as it was before the attempt, and retry is always a fresh
/// user-initiated action.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Microphone permission denied or no input device present.
    #[error("microphone unavailable: {0}")]
    DeviceUnavailable(anyhow::Error),

    /// The remote service could not be reached while creating a conversation.
    #[error("bridge service unreachable: {0}")]
    ServiceUnreachable(anyhow::Error),

    /// A text or voice message failed to send.
    #[error("message send failed: {0}")]
    SendFailed(anyhow::Error),

    /// Keyword search against the message history failed.
    #[error("search failed: {0}")]
    SearchFailed(anyhow::Error),

    /// AI summary generation failed.
    #[error("summary generation failed: {0}")]
    SummaryFailed(anyhow::Error),
}
