//! Session state container.
//!
//! Holds the active conversation identity, the ordered message log, the draft
//! input buffer, and derived view state (summary). The store is a pure state
//! container: it never talks to the network and has no failure modes. The
//! orchestrator wraps it in a `tokio::sync::Mutex` and is responsible for
//! applying mutations consistently.

use crate::model::{Conversation, Message};

/// Opaque view-generation handle.
///
/// Every mutation that replaces the visible message log (starting a
/// conversation, entering the search view) bumps the generation. Callers
/// snapshot the generation before issuing a request and must discard the
/// response if the generation has moved on, so a late-arriving result can
/// never leak into a view it was not issued against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewGeneration(u64);

#[derive(Debug, Default)]
pub struct SessionStore {
    conversation: Option<Conversation>,
    messages: Vec<Message>,
    input: String,
    summary: Option<String>,
    generation: u64,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the active conversation: clears the log and any summary.
    /// Messages from a previous session never leak into the new one.
    pub fn begin_conversation(&mut self, conversation: Conversation) {
        self.conversation = Some(conversation);
        self.messages.clear();
        self.summary = None;
        self.generation += 1;
    }

    /// Append a message to the log. Appends are monotonic: existing entries
    /// are never removed or reordered within a view.
    pub fn append_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Switch to the search view: the log is replaced wholesale with the
    /// result set and the conversation identity is cleared. Browsing history
    /// and participating in a live bridge are mutually exclusive views. A
    /// displayed summary stays up until dismissed or a new conversation
    /// starts.
    pub fn enter_search_view(&mut self, results: Vec<Message>) {
        self.conversation = None;
        self.messages = results;
        self.generation += 1;
    }

    pub fn set_summary(&mut self, summary: String) {
        self.summary = Some(summary);
    }

    pub fn clear_summary(&mut self) {
        self.summary = None;
    }

    pub fn set_input(&mut self, text: String) {
        self.input = text;
    }

    pub fn clear_input(&mut self) {
        self.input.clear();
    }

    pub fn generation(&self) -> ViewGeneration {
        ViewGeneration(self.generation)
    }

    pub fn is_current(&self, generation: ViewGeneration) -> bool {
        self.generation == generation.0
    }

    pub fn conversation(&self) -> Option<&Conversation> {
        self.conversation.as_ref()
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation.as_ref().map(|c| c.id.as_str())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }
}
