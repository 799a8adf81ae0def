//! Conversation store adapter: backend calls with the client's fallback policy.
//!
//! Every operation here degrades instead of failing. Failures are logged and
//! replaced by an empty list, the greeting, an unchanged state or the apology.

use anyhow::Result;
use chrono::Local;
use log::{debug, error, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::backend::{BackendClient, BackendResult, ConversationSummary, HealthReport, QueryRequest};
use crate::config::Config;
use crate::events::{ChatMessage, QueryReply};
use crate::prompts::{APOLOGY, GREETING};
use crate::storage::{ActiveChatState, LocalStore};

/// A conversation that exists only on the client until its first query
#[derive(Debug, Clone, PartialEq)]
pub struct NewConversation {
    pub conversation_id: String,
    pub greeting: ChatMessage,
}

/// Result of deleting a conversation
#[derive(Debug, Clone, PartialEq)]
pub enum Deletion {
    Failed,
    Deleted,
    /// The active chat was deleted and this one took its place
    Replaced(NewConversation),
}

impl Deletion {
    pub fn succeeded(&self) -> bool {
        !matches!(self, Deletion::Failed)
    }
}

#[derive(Clone)]
pub struct ConversationStore {
    client: BackendClient,
    local: Arc<LocalStore>,
    max_tokens: u32,
    temperature: f32,
    history_limit: u32,
    last_issued: Arc<AtomicI64>,
}

impl ConversationStore {
    pub fn new(config: &Config) -> Result<Self> {
        let client = BackendClient::new(config)?;
        Ok(Self::with_parts(client, LocalStore::new(config.state_path()), config))
    }

    pub fn with_parts(client: BackendClient, local: LocalStore, config: &Config) -> Self {
        Self {
            client,
            local: Arc::new(local),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            history_limit: config.history_limit,
            last_issued: Arc::new(AtomicI64::new(0)),
        }
    }

    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    /// All conversation summaries, empty when the backend is unreachable
    pub async fn list_conversations(&self) -> Vec<ConversationSummary> {
        match self.client.list_conversations().await {
            Ok(conversations) => {
                debug!("Loaded {} conversations", conversations.len());
                conversations
            }
            Err(e) => {
                warn!("Failed to load conversations from backend: {e}");
                Vec::new()
            }
        }
    }

    /// Start a conversation locally and make it the active chat.
    ///
    /// The backend learns about it implicitly on the first query.
    pub fn create_conversation(&self) -> NewConversation {
        let conversation_id = self.next_conversation_id();
        self.persist_active(&conversation_id);
        debug!("Created conversation {conversation_id}");

        NewConversation {
            conversation_id,
            greeting: greeting(),
        }
    }

    /// Message history of one conversation as user/assistant pairs
    pub async fn get_conversation(&self, id: &str) -> Vec<ChatMessage> {
        match self.client.get_conversation(id, self.history_limit).await {
            Ok(detail) if !detail.history.is_empty() => detail
                .history
                .into_iter()
                .flat_map(|entry| {
                    [
                        ChatMessage::user(entry.query, entry.timestamp),
                        ChatMessage::assistant(entry.response, entry.timestamp),
                    ]
                })
                .collect(),
            Ok(_) => vec![greeting()],
            Err(e) => {
                error!("Failed to load conversation history for {id}: {e}");
                vec![greeting()]
            }
        }
    }

    /// Ask the backend to delete a conversation.
    ///
    /// Deleting the persisted active chat starts and persists a replacement.
    /// A failure leaves everything as it was.
    pub async fn delete_conversation(&self, id: &str) -> Deletion {
        if let Err(e) = self.client.delete_conversation(id).await {
            error!("Failed to delete conversation {id}: {e}");
            return Deletion::Failed;
        }

        if self.persisted_chat_id().as_deref() == Some(id) {
            debug!("Deleted active conversation {id}, starting a new one");
            Deletion::Replaced(self.create_conversation())
        } else {
            Deletion::Deleted
        }
    }

    /// Send a query; failures come back as the apology reply
    pub async fn send_query(&self, conversation_id: &str, text: &str) -> QueryReply {
        let request = QueryRequest {
            query: text,
            conversation_id,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        match self.client.send_query(&request).await {
            Ok(response) => QueryReply {
                answer: response.answer,
                timestamp: response.timestamp.or_else(|| Some(Local::now())),
                failed: false,
            },
            Err(e) => {
                error!("Query for {conversation_id} failed: {e}");
                QueryReply {
                    answer: APOLOGY.to_string(),
                    timestamp: Some(Local::now()),
                    failed: true,
                }
            }
        }
    }

    pub async fn health(&self) -> BackendResult<HealthReport> {
        self.client.health().await
    }

    /// Active chat id remembered from a previous run
    pub fn persisted_chat_id(&self) -> Option<String> {
        match ActiveChatState::load(&self.local) {
            Ok(state) => state.current_chat_id,
            Err(e) => {
                warn!("Failed to read active chat from {}: {e:#}", self.local.path().display());
                None
            }
        }
    }

    pub fn persist_active(&self, id: &str) {
        let state = ActiveChatState {
            current_chat_id: Some(id.to_string()),
        };
        if let Err(e) = state.save(&self.local) {
            warn!("Failed to persist active chat {id}: {e:#}");
        }
    }

    /// `conv_<unix millis>`, strictly increasing within this process
    fn next_conversation_id(&self) -> String {
        let now = Local::now().timestamp_millis();
        let previous = self
            .last_issued
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last + 1)))
            .unwrap_or(now);
        format!("conv_{}", now.max(previous + 1))
    }
}

fn greeting() -> ChatMessage {
    ChatMessage::assistant(GREETING, Some(Local::now()))
}
