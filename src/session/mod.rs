//! Bridge session orchestration
//!
//! This module provides the `BridgeSession` abstraction that composes:
//! - The session state store (conversation identity, message log, summary)
//! - The recording controller (microphone capture lifecycle)
//! - The conversation gateway (remote service operations)
//!
//! and exposes the user-facing verbs: start session, send message,
//! start/stop recording, search, summarize. All verbs take `&self` and are
//! safe to interleave; late-arriving responses are reconciled through the
//! store's view generation and silently discarded when stale.

mod session;
mod settings;

pub use session::BridgeSession;
pub use settings::SessionSettings;
