use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::settings::SessionSettings;
use crate::capture::{CaptureBackendFactory, CaptureConfig, RecordingController};
use crate::error::BridgeError;
use crate::gateway::ConversationGateway;
use crate::model::{Conversation, Message, SenderRole};
use crate::store::SessionStore;

/// The session orchestrator.
///
/// Composes the state store, the recording controller and the gateway behind
/// a small set of verbs, and guarantees the store is updated consistently
/// regardless of how operations interleave. Guard violations (empty input,
/// no active conversation, duplicate recording or summary requests) are
/// silent no-ops returning `Ok(None)` / `Ok(false)`, not errors: the UI is
/// expected to disable those actions rather than surface validation failures.
pub struct BridgeSession {
    gateway: Arc<dyn ConversationGateway>,
    capture_factory: Arc<dyn CaptureBackendFactory>,
    store: Mutex<SessionStore>,
    recorder: Mutex<RecordingController>,
    settings: Mutex<SessionSettings>,
    summarizing: AtomicBool,
}

impl BridgeSession {
    pub fn new(
        gateway: Arc<dyn ConversationGateway>,
        capture_factory: Arc<dyn CaptureBackendFactory>,
        capture_config: CaptureConfig,
        settings: SessionSettings,
    ) -> Self {
        Self {
            gateway,
            capture_factory,
            store: Mutex::new(SessionStore::new()),
            recorder: Mutex::new(RecordingController::new(capture_config)),
            settings: Mutex::new(settings),
            summarizing: AtomicBool::new(false),
        }
    }

    /// Open a new conversation with the current language pair.
    ///
    /// On success the conversation identity is replaced and the message log
    /// and summary are cleared. On failure nothing changes; a partial
    /// session is never exposed.
    pub async fn start_session(&self) -> Result<Conversation, BridgeError> {
        let (doctor_language, patient_language) = {
            let settings = self.settings.lock().await;
            (
                settings.doctor_language.clone(),
                settings.patient_language.clone(),
            )
        };

        info!("starting bridge session ({doctor_language} / {patient_language})");

        let conversation = self
            .gateway
            .create_conversation(&doctor_language, &patient_language)
            .await?;

        let mut store = self.store.lock().await;
        store.begin_conversation(conversation.clone());

        info!("bridge session ready: {}", conversation.id);
        Ok(conversation)
    }

    /// Send the current input buffer as a text message.
    ///
    /// No-op unless the trimmed input is non-empty and a conversation is
    /// active. The input buffer is only cleared after the service confirms
    /// the send, so a failure never loses what the user typed. A response
    /// arriving after the view has moved on is discarded.
    pub async fn send_message(&self) -> Result<Option<Message>, BridgeError> {
        let (conversation_id, text, generation) = {
            let store = self.store.lock().await;
            let text = store.input().trim().to_string();
            if text.is_empty() {
                return Ok(None);
            }
            let Some(id) = store.conversation_id() else {
                return Ok(None);
            };
            (id.to_string(), text, store.generation())
        };

        let role = self.settings.lock().await.role;

        let message = self
            .gateway
            .send_text(&conversation_id, role, &text)
            .await?;

        let mut store = self.store.lock().await;
        if !store.is_current(generation) {
            warn!("discarding stale send result for conversation {conversation_id}");
            return Ok(None);
        }

        store.append_message(message.clone());
        store.clear_input();
        Ok(Some(message))
    }

    /// Begin a voice recording.
    ///
    /// Returns `Ok(false)` when a capture is already open (no second stream,
    /// accumulated audio untouched). A capture failure surfaces
    /// `DeviceUnavailable` and leaves the controller idle.
    pub async fn start_recording(&self) -> Result<bool, BridgeError> {
        let mut recorder = self.recorder.lock().await;
        if recorder.is_recording() {
            return Ok(false);
        }

        let backend = self
            .capture_factory
            .create()
            .map_err(BridgeError::DeviceUnavailable)?;

        recorder
            .start(backend)
            .await
            .map_err(BridgeError::DeviceUnavailable)
    }

    /// Stop the voice recording and upload the finalized payload.
    ///
    /// The microphone is released as part of stopping, before any network
    /// work, so a failed upload never leaves the device held. Stop without a
    /// capture in progress is a no-op. Zero-length captures are uploaded
    /// as-is; suppressing them is the service's call, not the client's.
    pub async fn stop_recording(&self) -> Result<Option<Message>, BridgeError> {
        let payload = {
            let mut recorder = self.recorder.lock().await;
            recorder.stop().await.map_err(BridgeError::SendFailed)?
        };

        let Some(payload) = payload else {
            return Ok(None);
        };

        let (conversation_id, generation) = {
            let store = self.store.lock().await;
            match store.conversation_id() {
                Some(id) => (id.to_string(), store.generation()),
                // Capture is already released; there is just nothing to send.
                None => return Ok(None),
            }
        };

        let role = self.settings.lock().await.role;

        let message = self
            .gateway
            .send_audio(&conversation_id, role, payload)
            .await?;

        let mut store = self.store.lock().await;
        if !store.is_current(generation) {
            warn!("discarding stale voice message for conversation {conversation_id}");
            return Ok(None);
        }

        store.append_message(message.clone());
        Ok(Some(message))
    }

    /// Keyword search across message history.
    ///
    /// On success the message log is replaced with the result set and the
    /// active conversation is cleared: browsing history and participating in
    /// a live bridge are mutually exclusive views. Returns the number of
    /// matches, or `Ok(None)` for a blank query.
    pub async fn search(&self, query: &str) -> Result<Option<usize>, BridgeError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(None);
        }

        let generation = self.store.lock().await.generation();

        let results = self.gateway.search(query).await?;

        let mut store = self.store.lock().await;
        if !store.is_current(generation) {
            warn!("discarding stale search results for query {query:?}");
            return Ok(None);
        }

        let count = results.len();
        info!("search {query:?} matched {count} messages");
        store.enter_search_view(results);
        Ok(Some(count))
    }

    /// Request an AI summary of the active conversation.
    ///
    /// At most one summary request is in flight at a time; a concurrent call
    /// is a no-op. The pending flag is cleared on every outcome, so the UI
    /// can never get stuck "processing".
    pub async fn summarize(&self) -> Result<Option<String>, BridgeError> {
        let (conversation_id, generation) = {
            let store = self.store.lock().await;
            match store.conversation_id() {
                Some(id) => (id.to_string(), store.generation()),
                None => return Ok(None),
            }
        };

        if self
            .summarizing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(None);
        }

        let result = self.gateway.summarize(&conversation_id).await;
        self.summarizing.store(false, Ordering::SeqCst);

        let response = result?;

        let mut store = self.store.lock().await;
        if !store.is_current(generation) {
            warn!("discarding stale summary for conversation {conversation_id}");
            return Ok(None);
        }

        store.set_summary(response.summary.clone());
        Ok(Some(response.summary))
    }

    /// Explicitly dismiss the current summary.
    pub async fn dismiss_summary(&self) {
        self.store.lock().await.clear_summary();
    }

    pub async fn set_input(&self, text: impl Into<String>) {
        self.store.lock().await.set_input(text.into());
    }

    pub async fn set_role(&self, role: SenderRole) {
        self.settings.lock().await.role = role;
    }

    pub async fn set_languages(&self, doctor_language: String, patient_language: String) {
        let mut settings = self.settings.lock().await;
        settings.doctor_language = doctor_language;
        settings.patient_language = patient_language;
    }

    pub async fn conversation(&self) -> Option<Conversation> {
        self.store.lock().await.conversation().cloned()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.store.lock().await.messages().to_vec()
    }

    pub async fn summary(&self) -> Option<String> {
        self.store.lock().await.summary().map(str::to_string)
    }

    pub async fn input(&self) -> String {
        self.store.lock().await.input().to_string()
    }

    pub async fn is_recording(&self) -> bool {
        self.recorder.lock().await.is_recording()
    }

    pub fn is_summarizing(&self) -> bool {
        self.summarizing.load(Ordering::SeqCst)
    }
}
