//! Chat controller: owns the application state and applies the values the
//! conversation store returns.

use chrono::Local;
use log::{debug, info};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::events::{AppEvent, ChatMessage};
use crate::session::{AppState, Phase};
use crate::store::{ConversationStore, Deletion, NewConversation};
use crate::ui::conversation::get_help_text;

/// A query task and the request id its reply will carry
struct InFlight {
    request_id: u64,
    handle: JoinHandle<()>,
}

pub struct App {
    state: AppState,
    store: ConversationStore,
    events_tx: mpsc::UnboundedSender<(u64, AppEvent)>,
    events_rx: mpsc::UnboundedReceiver<(u64, AppEvent)>,
    in_flight: Option<InFlight>,
    next_request_id: u64,
}

impl App {
    pub fn new(store: ConversationStore) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            state: AppState::default(),
            store,
            events_tx,
            events_rx,
            in_flight: None,
            next_request_id: 0,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Load the chat list and restore or create the active chat
    pub async fn initialize(&mut self) {
        self.state.phase = Phase::Loading;
        self.refresh_conversations().await;

        let persisted = self.store.persisted_chat_id();
        match persisted {
            Some(id) if self.state.is_known(&id) => {
                info!("Resuming conversation {id}");
                self.open_chat(&id).await;
            }
            Some(id) => {
                info!("Stored conversation {id} is not on the backend, starting a new one");
                self.new_chat().await;
            }
            None => self.new_chat().await,
        }

        self.state.phase = Phase::Ready;
    }

    pub async fn refresh_conversations(&mut self) {
        self.state.conversations = self.store.list_conversations().await;
    }

    /// Start a fresh conversation seeded with the greeting
    pub async fn new_chat(&mut self) {
        let created = self.store.create_conversation();
        self.show_new_chat(created).await;
    }

    async fn show_new_chat(&mut self, created: NewConversation) {
        self.cancel_pending();
        self.state.current_chat_id = Some(created.conversation_id);
        self.state.messages = vec![created.greeting];
        self.state.status = None;
        self.refresh_conversations().await;
    }

    /// Switch to an existing conversation and load its history.
    ///
    /// Reopening the active chat while its reply is pending keeps the view as is.
    pub async fn open_chat(&mut self, id: &str) {
        if self.state.is_active(id) && self.in_flight.is_some() {
            debug!("Conversation {id} is already open and awaiting a reply");
            return;
        }
        self.cancel_pending();
        self.state.current_chat_id = Some(id.to_string());
        self.store.persist_active(id);
        self.state.messages = self.store.get_conversation(id).await;
        self.state.status = None;
    }

    /// Delete a conversation; deleting the active one starts a new chat
    pub async fn delete_chat(&mut self, id: &str) -> bool {
        let deletion = self.store.delete_conversation(id).await;
        if !deletion.succeeded() {
            self.state.status = Some("Could not delete the conversation".to_string());
            return false;
        }

        self.state.remove_conversation(id);
        match deletion {
            Deletion::Replaced(created) => self.show_new_chat(created).await,
            _ if self.state.is_active(id) => self.new_chat().await,
            _ => {}
        }
        true
    }

    /// Send a query for the active chat in the background.
    ///
    /// Returns `false` when nothing was sent: empty input, no active chat, or a
    /// reply still pending.
    pub fn submit_query(&mut self, text: &str) -> bool {
        let query = text.trim();
        if query.is_empty() {
            return false;
        }
        if self.in_flight.is_some() {
            self.state.status = Some("Still waiting for the previous reply".to_string());
            return false;
        }
        let Some(conversation_id) = self.state.current_chat_id.clone() else {
            return false;
        };

        self.state.messages.push(ChatMessage::user(query, Some(Local::now())));
        self.state.pending_query = Some(conversation_id.clone());
        self.state.status = None;

        self.next_request_id += 1;
        let request_id = self.next_request_id;
        let store = self.store.clone();
        let tx = self.events_tx.clone();
        let query = query.to_string();

        let handle = tokio::spawn(async move {
            let reply = store.send_query(&conversation_id, &query).await;
            let _ = tx.send((request_id, AppEvent::QueryAnswered { conversation_id, reply }));
        });
        self.in_flight = Some(InFlight { request_id, handle });

        true
    }

    /// Apply replies that have already arrived
    pub async fn process_events(&mut self) {
        while let Ok((request_id, event)) = self.events_rx.try_recv() {
            self.handle_event(request_id, event).await;
        }
    }

    /// Wait until the in-flight query, if any, has been answered and applied
    pub async fn wait_for_reply(&mut self) {
        while self.in_flight.is_some() {
            match self.events_rx.recv().await {
                Some((request_id, event)) => self.handle_event(request_id, event).await,
                None => break,
            }
        }
    }

    pub fn show_help(&mut self) {
        self.state.messages.push(ChatMessage::system(get_help_text()));
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.state.status = Some(status.into());
    }

    async fn handle_event(&mut self, request_id: u64, event: AppEvent) {
        match event {
            AppEvent::QueryAnswered { conversation_id, reply } => {
                let current = self.in_flight.as_ref().map(|in_flight| in_flight.request_id);
                if current != Some(request_id) {
                    debug!("Dropping stale reply {request_id} for {conversation_id}");
                    return;
                }
                self.in_flight = None;
                self.state.pending_query = None;

                if !self.state.is_active(&conversation_id) {
                    debug!("Dropping reply for inactive conversation {conversation_id}");
                    return;
                }

                self.state.messages.push(ChatMessage::assistant(reply.answer, reply.timestamp));
                if reply.failed {
                    self.state.status = Some("The backend could not answer".to_string());
                } else {
                    self.refresh_conversations().await;
                }
            }
        }
    }

    /// Abort the in-flight query so its reply never reaches another chat
    fn cancel_pending(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            debug!("Cancelling query {}", in_flight.request_id);
            in_flight.handle.abort();
        }
        self.state.pending_query = None;
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
