// Orchestrator tests.
//
// A mock gateway stands in for the remote service and a scripted capture
// factory for the microphone, so every interleaving here is deterministic.
// These tests pin the verb contracts: guards are silent no-ops, failures
// leave state untouched, and late responses are discarded.

use anyhow::Result;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Semaphore};

use medbridge::capture::{
    AudioChunk, AudioPayload, CaptureBackend, CaptureBackendFactory, CaptureConfig,
};
use medbridge::error::BridgeError;
use medbridge::gateway::ConversationGateway;
use medbridge::model::{Conversation, Message, SenderRole, SummaryResponse};
use medbridge::session::{BridgeSession, SessionSettings};

// ============================================================================
// Mock gateway
// ============================================================================

#[derive(Default)]
struct MockGateway {
    fail_create: AtomicBool,
    fail_text: AtomicBool,
    fail_summary: AtomicBool,

    /// When set, send_text blocks on the semaphore before responding.
    text_gate: Mutex<Option<Arc<Semaphore>>>,
    /// When set, summarize blocks on the semaphore before responding.
    summary_gate: Mutex<Option<Arc<Semaphore>>>,

    conversations_created: AtomicUsize,
    texts_entered: AtomicUsize,
    summaries_entered: AtomicUsize,
    texts: Mutex<Vec<(String, String)>>,
    audio_payloads: Mutex<Vec<(String, usize)>>,
    search_results: Mutex<Vec<Message>>,
    search_calls: AtomicUsize,
}

impl MockGateway {
    fn text_message(conversation_id: &str, role: SenderRole, text: &str) -> Message {
        Message {
            id: uuid::Uuid::new_v4().to_string(),
            sender_role: role,
            original_text: Some(text.to_string()),
            translated_text: Some(format!("{text} [translated]")),
            audio_url: None,
            created_at: Utc::now(),
        }
    }
}

#[async_trait::async_trait]
impl ConversationGateway for MockGateway {
    async fn create_conversation(
        &self,
        doctor_language: &str,
        patient_language: &str,
    ) -> Result<Conversation, BridgeError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(BridgeError::ServiceUnreachable(anyhow::anyhow!("offline")));
        }
        let n = self.conversations_created.fetch_add(1, Ordering::SeqCst);
        Ok(Conversation {
            id: format!("conv-{n}"),
            doctor_language: doctor_language.to_string(),
            patient_language: patient_language.to_string(),
            created_at: Utc::now(),
        })
    }

    async fn send_text(
        &self,
        conversation_id: &str,
        sender_role: SenderRole,
        text: &str,
    ) -> Result<Message, BridgeError> {
        self.texts_entered.fetch_add(1, Ordering::SeqCst);
        let gate = self.text_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await.unwrap();
        }
        if self.fail_text.load(Ordering::SeqCst) {
            return Err(BridgeError::SendFailed(anyhow::anyhow!("send failed")));
        }
        self.texts
            .lock()
            .unwrap()
            .push((conversation_id.to_string(), text.to_string()));
        Ok(Self::text_message(conversation_id, sender_role, text))
    }

    async fn send_audio(
        &self,
        conversation_id: &str,
        sender_role: SenderRole,
        payload: AudioPayload,
    ) -> Result<Message, BridgeError> {
        self.audio_payloads
            .lock()
            .unwrap()
            .push((conversation_id.to_string(), payload.sample_count));
        Ok(Message {
            id: uuid::Uuid::new_v4().to_string(),
            sender_role,
            // The service leaves voice messages without text until
            // transcription runs.
            original_text: None,
            translated_text: None,
            audio_url: Some("https://storage.example/message.wav".to_string()),
            created_at: Utc::now(),
        })
    }

    async fn search(&self, _query: &str) -> Result<Vec<Message>, BridgeError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.search_results.lock().unwrap().clone())
    }

    async fn summarize(&self, _conversation_id: &str) -> Result<SummaryResponse, BridgeError> {
        self.summaries_entered.fetch_add(1, Ordering::SeqCst);
        let gate = self.summary_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await.unwrap();
        }
        if self.fail_summary.load(Ordering::SeqCst) {
            return Err(BridgeError::SummaryFailed(anyhow::anyhow!("model error")));
        }
        Ok(SummaryResponse {
            summary: "Patient reports mild chest pain; advised rest.".to_string(),
        })
    }
}

// ============================================================================
// Scripted capture
// ============================================================================

struct ScriptedBackend {
    chunks: Vec<AudioChunk>,
    tx: Option<mpsc::Sender<AudioChunk>>,
}

#[async_trait::async_trait]
impl CaptureBackend for ScriptedBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>> {
        let (tx, rx) = mpsc::channel(64);
        for chunk in self.chunks.clone() {
            tx.send(chunk).await?;
        }
        self.tx = Some(tx);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.tx = None;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.tx.is_some()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct ScriptedFactory {
    chunks: Vec<AudioChunk>,
    fail: bool,
}

impl CaptureBackendFactory for ScriptedFactory {
    fn create(&self) -> Result<Box<dyn CaptureBackend>> {
        if self.fail {
            anyhow::bail!("microphone permission denied");
        }
        Ok(Box::new(ScriptedBackend {
            chunks: self.chunks.clone(),
            tx: None,
        }))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn new_session(gateway: Arc<MockGateway>) -> BridgeSession {
    new_session_with_capture(
        gateway,
        ScriptedFactory {
            chunks: vec![AudioChunk {
                samples: vec![1, 2, 3],
            }],
            fail: false,
        },
    )
}

fn new_session_with_capture(gateway: Arc<MockGateway>, factory: ScriptedFactory) -> BridgeSession {
    BridgeSession::new(
        gateway,
        Arc::new(factory),
        CaptureConfig::default(),
        SessionSettings::default(),
    )
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

// ============================================================================
// Session lifecycle
// ============================================================================

#[tokio::test]
async fn start_session_yields_empty_log_and_no_summary() -> Result<()> {
    let gateway = Arc::new(MockGateway::default());
    let session = new_session(Arc::clone(&gateway));

    let conversation = session.start_session().await?;
    assert_eq!(conversation.doctor_language, "English");
    assert_eq!(conversation.patient_language, "Hindi");
    assert!(session.messages().await.is_empty());
    assert!(session.summary().await.is_none());

    Ok(())
}

#[tokio::test]
async fn failed_session_start_leaves_previous_session_intact() -> Result<()> {
    let gateway = Arc::new(MockGateway::default());
    let session = new_session(Arc::clone(&gateway));

    let first = session.start_session().await?;
    session.set_input("hello").await;
    session.send_message().await?;

    gateway.fail_create.store(true, Ordering::SeqCst);
    let result = session.start_session().await;
    assert!(matches!(result, Err(BridgeError::ServiceUnreachable(_))));

    // Old conversation and log still stand.
    assert_eq!(session.conversation().await.unwrap().id, first.id);
    assert_eq!(session.messages().await.len(), 1);

    Ok(())
}

#[tokio::test]
async fn new_session_resets_log_and_summary() -> Result<()> {
    let gateway = Arc::new(MockGateway::default());
    let session = new_session(Arc::clone(&gateway));

    session.start_session().await?;
    session.set_input("How are you feeling?").await;
    session.send_message().await?;
    session.summarize().await?;
    assert!(session.summary().await.is_some());

    session.start_session().await?;

    assert!(session.messages().await.is_empty());
    assert!(session.summary().await.is_none());

    Ok(())
}

// ============================================================================
// Text messages
// ============================================================================

#[tokio::test]
async fn blank_input_never_issues_a_network_call() -> Result<()> {
    let gateway = Arc::new(MockGateway::default());
    let session = new_session(Arc::clone(&gateway));
    session.start_session().await?;

    session.set_input("   \t ").await;
    assert!(session.send_message().await?.is_none());

    assert_eq!(gateway.texts_entered.load(Ordering::SeqCst), 0);
    assert!(session.messages().await.is_empty());

    Ok(())
}

#[tokio::test]
async fn send_without_active_conversation_is_a_noop() -> Result<()> {
    let gateway = Arc::new(MockGateway::default());
    let session = new_session(Arc::clone(&gateway));

    session.set_input("hello?").await;
    assert!(session.send_message().await?.is_none());
    assert_eq!(gateway.texts_entered.load(Ordering::SeqCst), 0);

    Ok(())
}

#[tokio::test]
async fn successful_sends_preserve_order() -> Result<()> {
    let gateway = Arc::new(MockGateway::default());
    let session = new_session(Arc::clone(&gateway));
    session.start_session().await?;

    for text in ["first", "second", "third"] {
        session.set_input(text).await;
        session.send_message().await?;
    }

    let log = session.messages().await;
    assert_eq!(log.len(), 3);
    let texts: Vec<&str> = log
        .iter()
        .map(|m| m.original_text.as_deref().unwrap())
        .collect();
    assert_eq!(texts, vec!["first", "second", "third"]);

    // All sends went to the same conversation, in order.
    let sent = gateway.texts.lock().unwrap();
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|(id, _)| id == "conv-0"));

    Ok(())
}

#[tokio::test]
async fn failed_send_preserves_input_buffer() -> Result<()> {
    let gateway = Arc::new(MockGateway::default());
    let session = new_session(Arc::clone(&gateway));
    session.start_session().await?;

    gateway.fail_text.store(true, Ordering::SeqCst);
    session.set_input("important note").await;
    let result = session.send_message().await;
    assert!(matches!(result, Err(BridgeError::SendFailed(_))));
    assert_eq!(session.input().await, "important note");
    assert!(session.messages().await.is_empty());

    // Retry after recovery succeeds and clears the buffer.
    gateway.fail_text.store(false, Ordering::SeqCst);
    assert!(session.send_message().await?.is_some());
    assert_eq!(session.input().await, "");
    assert_eq!(session.messages().await.len(), 1);

    Ok(())
}

#[tokio::test]
async fn late_send_response_is_discarded_after_new_session() -> Result<()> {
    let gateway = Arc::new(MockGateway::default());
    let gate = Arc::new(Semaphore::new(0));
    *gateway.text_gate.lock().unwrap() = Some(Arc::clone(&gate));

    let session = Arc::new(new_session(Arc::clone(&gateway)));
    session.start_session().await?;
    session.set_input("slow message").await;

    let sender = Arc::clone(&session);
    let send_task = tokio::spawn(async move { sender.send_message().await });

    // Wait until the send is parked inside the gateway, then replace the
    // session underneath it.
    let entered = Arc::clone(&gateway);
    wait_until(move || entered.texts_entered.load(Ordering::SeqCst) == 1).await;
    *gateway.text_gate.lock().unwrap() = None;
    session.start_session().await?;

    gate.add_permits(1);
    let result = send_task.await??;

    assert!(result.is_none(), "stale response must be discarded");
    assert!(
        session.messages().await.is_empty(),
        "stale message must not corrupt the new session"
    );

    Ok(())
}

#[tokio::test]
async fn role_is_read_at_send_time() -> Result<()> {
    let gateway = Arc::new(MockGateway::default());
    let session = new_session(Arc::clone(&gateway));
    session.start_session().await?;

    session.set_input("doctor speaking").await;
    session.send_message().await?;

    session.set_role(SenderRole::Patient).await;
    session.set_input("patient speaking").await;
    session.send_message().await?;

    let log = session.messages().await;
    assert_eq!(log[0].sender_role, SenderRole::Doctor);
    assert_eq!(log[1].sender_role, SenderRole::Patient);

    Ok(())
}

// ============================================================================
// Voice messages
// ============================================================================

#[tokio::test]
async fn stop_without_start_does_not_upload() -> Result<()> {
    let gateway = Arc::new(MockGateway::default());
    let session = new_session(Arc::clone(&gateway));
    session.start_session().await?;

    assert!(session.stop_recording().await?.is_none());
    assert!(gateway.audio_payloads.lock().unwrap().is_empty());

    Ok(())
}

#[tokio::test]
async fn record_and_stop_appends_voice_message() -> Result<()> {
    let gateway = Arc::new(MockGateway::default());
    let session = new_session(Arc::clone(&gateway));
    session.start_session().await?;

    assert!(session.start_recording().await?);
    assert!(session.is_recording().await);

    let message = session.stop_recording().await?.expect("voice message");
    assert!(!session.is_recording().await);
    assert!(message.audio_url.is_some());

    let log = session.messages().await;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].id, message.id);

    let uploads = gateway.audio_payloads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].1, 3, "scripted samples all uploaded");

    Ok(())
}

#[tokio::test]
async fn second_start_recording_is_a_noop() -> Result<()> {
    let gateway = Arc::new(MockGateway::default());
    let session = new_session(Arc::clone(&gateway));
    session.start_session().await?;

    assert!(session.start_recording().await?);
    assert!(!session.start_recording().await?);

    // Only one capture ran: one payload with the scripted chunk, not two.
    session.stop_recording().await?;
    assert_eq!(gateway.audio_payloads.lock().unwrap().len(), 1);

    Ok(())
}

#[tokio::test]
async fn device_failure_surfaces_and_leaves_state_clean() -> Result<()> {
    let gateway = Arc::new(MockGateway::default());
    let session = new_session_with_capture(
        Arc::clone(&gateway),
        ScriptedFactory {
            chunks: Vec::new(),
            fail: true,
        },
    );
    session.start_session().await?;

    let result = session.start_recording().await;
    assert!(matches!(result, Err(BridgeError::DeviceUnavailable(_))));
    assert!(!session.is_recording().await);

    Ok(())
}

#[tokio::test]
async fn zero_length_capture_is_still_uploaded() -> Result<()> {
    let gateway = Arc::new(MockGateway::default());
    let session = new_session_with_capture(
        Arc::clone(&gateway),
        ScriptedFactory {
            chunks: Vec::new(),
            fail: false,
        },
    );
    session.start_session().await?;

    session.start_recording().await?;
    let message = session.stop_recording().await?;
    assert!(message.is_some());

    let uploads = gateway.audio_payloads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].1, 0, "empty capture uploaded as-is");

    Ok(())
}

#[tokio::test]
async fn stop_recording_without_conversation_releases_mic_quietly() -> Result<()> {
    let gateway = Arc::new(MockGateway::default());
    let session = new_session(Arc::clone(&gateway));

    session.start_recording().await?;
    assert!(session.stop_recording().await?.is_none());

    assert!(!session.is_recording().await, "device must be released");
    assert!(gateway.audio_payloads.lock().unwrap().is_empty());

    Ok(())
}

// ============================================================================
// Search
// ============================================================================

#[tokio::test]
async fn search_replaces_log_and_leaves_live_session() -> Result<()> {
    let gateway = Arc::new(MockGateway::default());
    *gateway.search_results.lock().unwrap() = vec![
        MockGateway::text_message("old-conv", SenderRole::Patient, "back pain"),
        MockGateway::text_message("old-conv", SenderRole::Doctor, "pain medication"),
    ];

    let session = new_session(Arc::clone(&gateway));
    session.start_session().await?;
    session.set_input("live message").await;
    session.send_message().await?;

    let count = session.search("pain").await?;
    assert_eq!(count, Some(2));

    assert!(
        session.conversation().await.is_none(),
        "search leaves the live session"
    );
    let log = session.messages().await;
    assert_eq!(log.len(), 2, "log replaced, not appended to");
    assert_eq!(log[0].original_text.as_deref(), Some("back pain"));
    assert_eq!(log[1].original_text.as_deref(), Some("pain medication"));

    Ok(())
}

#[tokio::test]
async fn blank_search_query_is_a_noop() -> Result<()> {
    let gateway = Arc::new(MockGateway::default());
    let session = new_session(Arc::clone(&gateway));
    session.start_session().await?;

    assert!(session.search("  ").await?.is_none());
    assert_eq!(gateway.search_calls.load(Ordering::SeqCst), 0);
    assert!(session.conversation().await.is_some());

    Ok(())
}

// ============================================================================
// Summaries
// ============================================================================

#[tokio::test]
async fn summarize_without_conversation_is_a_noop() -> Result<()> {
    let gateway = Arc::new(MockGateway::default());
    let session = new_session(Arc::clone(&gateway));

    assert!(session.summarize().await?.is_none());
    assert_eq!(gateway.summaries_entered.load(Ordering::SeqCst), 0);

    Ok(())
}

#[tokio::test]
async fn summarize_populates_summary() -> Result<()> {
    let gateway = Arc::new(MockGateway::default());
    let session = new_session(Arc::clone(&gateway));
    session.start_session().await?;

    let summary = session.summarize().await?.expect("summary");
    assert!(summary.contains("chest pain"));
    assert_eq!(session.summary().await, Some(summary));
    assert!(!session.is_summarizing());

    Ok(())
}

#[tokio::test]
async fn summarize_failure_clears_pending_flag() -> Result<()> {
    let gateway = Arc::new(MockGateway::default());
    gateway.fail_summary.store(true, Ordering::SeqCst);
    let session = new_session(Arc::clone(&gateway));
    session.start_session().await?;

    let result = session.summarize().await;
    assert!(matches!(result, Err(BridgeError::SummaryFailed(_))));
    assert!(!session.is_summarizing(), "flag must clear on failure too");
    assert!(session.summary().await.is_none());

    Ok(())
}

#[tokio::test]
async fn concurrent_summarize_requests_collapse_to_one() -> Result<()> {
    let gateway = Arc::new(MockGateway::default());
    let gate = Arc::new(Semaphore::new(0));
    *gateway.summary_gate.lock().unwrap() = Some(Arc::clone(&gate));

    let session = Arc::new(new_session(Arc::clone(&gateway)));
    session.start_session().await?;

    let first = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.summarize().await })
    };

    let entered = Arc::clone(&gateway);
    wait_until(move || entered.summaries_entered.load(Ordering::SeqCst) == 1).await;
    assert!(session.is_summarizing());

    // Second call while the first is parked: silent no-op, no second request.
    assert!(session.summarize().await?.is_none());
    assert_eq!(gateway.summaries_entered.load(Ordering::SeqCst), 1);

    gate.add_permits(1);
    let summary = first.await??;
    assert!(summary.is_some());
    assert!(!session.is_summarizing());

    Ok(())
}

#[tokio::test]
async fn dismiss_summary_clears_it() -> Result<()> {
    let gateway = Arc::new(MockGateway::default());
    let session = new_session(Arc::clone(&gateway));
    session.start_session().await?;

    session.summarize().await?;
    assert!(session.summary().await.is_some());

    session.dismiss_summary().await;
    assert!(session.summary().await.is_none());

    Ok(())
}

// ============================================================================
// Spec walkthrough
// ============================================================================

#[tokio::test]
async fn doctor_patient_walkthrough() -> Result<()> {
    let gateway = Arc::new(MockGateway::default());
    let session = new_session(Arc::clone(&gateway));

    session
        .set_languages("English".to_string(), "Hindi".to_string())
        .await;
    session.start_session().await?;

    session.set_input("How are you feeling?").await;
    session.send_message().await?;

    let log = session.messages().await;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].sender_role, SenderRole::Doctor);
    assert_eq!(log[0].original_text.as_deref(), Some("How are you feeling?"));

    session.start_session().await?;
    assert!(session.messages().await.is_empty());

    Ok(())
}
