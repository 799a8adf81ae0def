use crate::backend::ConversationSummary;
use crate::events::ChatMessage;

/// Lifecycle of the active chat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Loading,
    Ready,
}

/// Everything the presentation layer draws from.
///
/// Only the controller mutates it, and only with values returned by the
/// conversation store.
#[derive(Debug, Clone)]
pub struct AppState {
    pub phase: Phase,
    pub conversations: Vec<ConversationSummary>,
    pub current_chat_id: Option<String>,
    pub messages: Vec<ChatMessage>,
    /// Conversation id of the query currently awaiting a reply
    pub pending_query: Option<String>,
    /// One-line notice shown in the status bar
    pub status: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            phase: Phase::Uninitialized,
            conversations: Vec::new(),
            current_chat_id: None,
            messages: Vec::new(),
            pending_query: None,
            status: None,
        }
    }
}

impl AppState {
    pub fn is_known(&self, id: &str) -> bool {
        self.conversations.iter().any(|c| c.conversation_id == id)
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.current_chat_id.as_deref() == Some(id)
    }

    /// Whether a reply is pending for the conversation on screen
    pub fn is_waiting(&self) -> bool {
        match (&self.pending_query, &self.current_chat_id) {
            (Some(pending), Some(current)) => pending == current,
            _ => false,
        }
    }

    pub fn remove_conversation(&mut self, id: &str) {
        self.conversations.retain(|c| c.conversation_id != id);
    }
}
