use chrono::{DateTime, Local};

/// Who a displayed message belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationRole {
    User,
    Assistant,
    /// Client-side notices (help text, status); never sent to the backend
    System,
}

/// A message as shown in the conversation view
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: ConversationRole,
    pub content: String,
    pub timestamp: Option<DateTime<Local>>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>, timestamp: Option<DateTime<Local>>) -> Self {
        Self {
            role: ConversationRole::User,
            content: content.into(),
            timestamp,
        }
    }

    pub fn assistant(content: impl Into<String>, timestamp: Option<DateTime<Local>>) -> Self {
        Self {
            role: ConversationRole::Assistant,
            content: content.into(),
            timestamp,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ConversationRole::System,
            content: content.into(),
            timestamp: Some(Local::now()),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == ConversationRole::User
    }
}

/// Outcome of a query, always displayable
#[derive(Debug, Clone, PartialEq)]
pub struct QueryReply {
    pub answer: String,
    pub timestamp: Option<DateTime<Local>>,
    /// The answer is the fixed apology rather than backend output
    pub failed: bool,
}

/// Internal application events delivered to the controller
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A background query finished for the given conversation
    QueryAnswered {
        conversation_id: String,
        reply: QueryReply,
    },
}
