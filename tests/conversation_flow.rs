use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;

use storyline::app::App;
use storyline::config::Config;
use storyline::events::{ChatMessage, ConversationRole};
use storyline::prompts::{APOLOGY, GREETING};
use storyline::session::Phase;
use storyline::storage::{LocalStore, CURRENT_CHAT_KEY};
use storyline::store::ConversationStore;

fn temp_home(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time should be monotonic")
        .as_nanos();
    std::env::temp_dir().join(format!(
        "storyline_flow_{prefix}_{}_{}",
        std::process::id(),
        nanos
    ))
}

fn config_for(server: &ServerGuard, prefix: &str) -> Config {
    let mut config = Config {
        storyline_home: temp_home(prefix),
        ..Config::default()
    };
    config.set_backend_url(server.url());
    config
}

fn store_for(config: &Config) -> ConversationStore {
    ConversationStore::new(config).expect("store should build")
}

fn persisted_id(config: &Config) -> Option<String> {
    LocalStore::new(config.state_path())
        .get(CURRENT_CHAT_KEY)
        .expect("state should be readable")
}

fn seed_active(config: &Config, id: &str) {
    LocalStore::new(config.state_path())
        .set(CURRENT_CHAT_KEY, id)
        .expect("state should be writable");
}

fn contents(messages: &[ChatMessage]) -> Vec<(ConversationRole, &str)> {
    messages
        .iter()
        .map(|message| (message.role, message.content.as_str()))
        .collect()
}

const TWO_CONVERSATIONS: &str = r#"[
    {"conversation_id": "conv_1", "last_message": "my first bike", "last_updated": "2024-06-20T10:00:00", "message_count": 2},
    {"conversation_id": "conv_2", "last_message": "grandma's kitchen", "last_updated": "2024-06-18T09:00:00", "message_count": 1}
]"#;

async fn mock_list(server: &mut ServerGuard, body: &str) -> mockito::Mock {
    server
        .mock("GET", "/chat/conversations")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await
}

#[tokio::test]
async fn listing_failure_yields_empty_list() {
    let mut server = Server::new_async().await;
    let _list = server
        .mock("GET", "/chat/conversations")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;
    let config = config_for(&server, "list_failure");

    assert!(store_for(&config).list_conversations().await.is_empty());
}

#[tokio::test]
async fn history_is_returned_as_message_pairs() {
    let mut server = Server::new_async().await;
    let detail = server
        .mock("GET", "/chat/conversation/conv_1")
        .match_query(Matcher::UrlEncoded("limit".into(), "50".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "conversation_id": "conv_1",
                "history": [
                    {"query": "hi", "response": "**hello**", "timestamp": "2024-06-20 10:00:00"},
                    {"query": "story?", "response": "sure", "timestamp": "2024-06-20 10:01:00"}
                ],
                "total_messages": 2
            })
            .to_string(),
        )
        .create_async()
        .await;
    let config = config_for(&server, "history_pairs");

    let messages = store_for(&config).get_conversation("conv_1").await;
    detail.assert_async().await;
    assert_eq!(
        contents(&messages),
        vec![
            (ConversationRole::User, "hi"),
            (ConversationRole::Assistant, "**hello**"),
            (ConversationRole::User, "story?"),
            (ConversationRole::Assistant, "sure"),
        ]
    );
    assert!(messages.iter().all(|message| message.timestamp.is_some()));
}

#[tokio::test]
async fn history_failure_or_empty_history_falls_back_to_greeting() {
    let mut server = Server::new_async().await;
    let _broken = server
        .mock("GET", "/chat/conversation/conv_broken")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;
    let _empty = server
        .mock("GET", "/chat/conversation/conv_empty")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"conversation_id": "conv_empty", "history": [], "total_messages": 0}"#)
        .create_async()
        .await;
    let config = config_for(&server, "history_fallback");
    let store = store_for(&config);

    for id in ["conv_broken", "conv_empty"] {
        let messages = store.get_conversation(id).await;
        assert_eq!(contents(&messages), vec![(ConversationRole::Assistant, GREETING)]);
    }
}

#[tokio::test]
async fn query_sends_generation_parameters() {
    let mut server = Server::new_async().await;
    let query = server
        .mock("POST", "/chat/query")
        .match_body(Matcher::PartialJson(json!({
            "query": "tell me a story",
            "conversation_id": "conv_7",
            "max_tokens": 512,
            "temperature": 0.1
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"query": "tell me a story", "answer": "Once upon a time", "conversation_id": "conv_7", "timestamp": "2024-06-20T10:00:00"}"#)
        .create_async()
        .await;
    let config = config_for(&server, "query_params");

    let reply = store_for(&config).send_query("conv_7", "tell me a story").await;
    query.assert_async().await;
    assert_eq!(reply.answer, "Once upon a time");
    assert!(!reply.failed);
}

#[tokio::test]
async fn query_error_status_becomes_apology() {
    let mut server = Server::new_async().await;
    let _query = server
        .mock("POST", "/chat/query")
        .with_status(502)
        .with_body("upstream down")
        .create_async()
        .await;
    let config = config_for(&server, "query_apology");

    let reply = store_for(&config).send_query("conv_7", "hello").await;
    assert_eq!(reply.answer, APOLOGY);
    assert!(reply.failed);
}

#[tokio::test]
async fn created_conversations_are_persisted_and_distinct() {
    let server = Server::new_async().await;
    let config = config_for(&server, "create");
    let store = store_for(&config);

    let first = store.create_conversation();
    let second = store.create_conversation();

    assert!(first.conversation_id.starts_with("conv_"));
    assert_ne!(first.conversation_id, second.conversation_id);
    assert_eq!(first.greeting.content, GREETING);
    assert_eq!(persisted_id(&config), Some(second.conversation_id));
}

#[tokio::test]
async fn initialize_resumes_known_conversation() {
    let mut server = Server::new_async().await;
    let _list = mock_list(&mut server, TWO_CONVERSATIONS).await;
    let _detail = server
        .mock("GET", "/chat/conversation/conv_2")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"history": [{"query": "the kitchen", "response": "tell me more", "timestamp": "2024-06-18T09:00:00"}]}"#)
        .create_async()
        .await;
    let config = config_for(&server, "resume");
    seed_active(&config, "conv_2");

    let mut app = App::new(store_for(&config));
    app.initialize().await;

    let state = app.state();
    assert_eq!(state.phase, Phase::Ready);
    assert_eq!(state.current_chat_id.as_deref(), Some("conv_2"));
    assert_eq!(state.conversations.len(), 2);
    assert_eq!(
        contents(&state.messages),
        vec![
            (ConversationRole::User, "the kitchen"),
            (ConversationRole::Assistant, "tell me more"),
        ]
    );
}

#[tokio::test]
async fn initialize_with_unknown_id_creates_new_conversation() {
    let mut server = Server::new_async().await;
    let _list = mock_list(&mut server, TWO_CONVERSATIONS).await;
    let config = config_for(&server, "unknown_id");
    seed_active(&config, "conv_gone");

    let mut app = App::new(store_for(&config));
    app.initialize().await;

    let state = app.state();
    let current = state.current_chat_id.clone().expect("a chat should be active");
    assert_ne!(current, "conv_gone");
    assert_eq!(persisted_id(&config), Some(current));
    assert_eq!(contents(&state.messages), vec![(ConversationRole::Assistant, GREETING)]);
    assert_eq!(state.phase, Phase::Ready);
}

#[tokio::test]
async fn initialize_with_unreachable_backend_still_becomes_ready() {
    let mut server = Server::new_async().await;
    let _list = server
        .mock("GET", "/chat/conversations")
        .with_status(503)
        .create_async()
        .await;
    let config = config_for(&server, "unreachable");
    seed_active(&config, "conv_1");

    let mut app = App::new(store_for(&config));
    app.initialize().await;

    let state = app.state();
    assert_eq!(state.phase, Phase::Ready);
    assert!(state.conversations.is_empty());
    assert_ne!(state.current_chat_id.as_deref(), Some("conv_1"));
    assert_eq!(contents(&state.messages), vec![(ConversationRole::Assistant, GREETING)]);
}

#[tokio::test]
async fn deleting_active_conversation_creates_a_new_one() {
    let mut server = Server::new_async().await;
    let _list = mock_list(&mut server, TWO_CONVERSATIONS).await;
    let _detail = server
        .mock("GET", "/chat/conversation/conv_1")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"history": []}"#)
        .create_async()
        .await;
    let delete = server
        .mock("DELETE", "/chat/conversation/conv_1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"message": "Conversation conv_1 deleted successfully", "deleted_messages": 2}"#)
        .create_async()
        .await;
    let config = config_for(&server, "delete_active");
    seed_active(&config, "conv_1");

    let mut app = App::new(store_for(&config));
    app.initialize().await;
    assert_eq!(app.state().current_chat_id.as_deref(), Some("conv_1"));

    assert!(app.delete_chat("conv_1").await);
    delete.assert_async().await;

    let current = app
        .state()
        .current_chat_id
        .clone()
        .expect("a chat should be active");
    assert_ne!(current, "conv_1");
    assert!(current.starts_with("conv_"));
    assert_eq!(persisted_id(&config), Some(current));
}

#[tokio::test]
async fn deleting_inactive_conversation_keeps_active_chat() {
    let mut server = Server::new_async().await;
    let _list = mock_list(&mut server, "[]").await;
    let _delete = server
        .mock("DELETE", "/chat/conversation/conv_2")
        .with_status(200)
        .create_async()
        .await;
    let config = config_for(&server, "delete_inactive");

    let mut app = App::new(store_for(&config));
    app.initialize().await;
    let before = app.state().current_chat_id.clone();

    assert!(app.delete_chat("conv_2").await);
    assert_eq!(app.state().current_chat_id, before);
}

#[tokio::test]
async fn failed_delete_leaves_state_unchanged() {
    let mut server = Server::new_async().await;
    let _list = mock_list(&mut server, TWO_CONVERSATIONS).await;
    let _detail = server
        .mock("GET", "/chat/conversation/conv_1")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"history": []}"#)
        .create_async()
        .await;
    let _delete = server
        .mock("DELETE", "/chat/conversation/conv_1")
        .with_status(500)
        .create_async()
        .await;
    let config = config_for(&server, "delete_failure");
    seed_active(&config, "conv_1");

    let mut app = App::new(store_for(&config));
    app.initialize().await;

    assert!(!app.delete_chat("conv_1").await);
    let state = app.state();
    assert_eq!(state.current_chat_id.as_deref(), Some("conv_1"));
    assert_eq!(state.conversations.len(), 2);
    assert_eq!(persisted_id(&config).as_deref(), Some("conv_1"));
}

#[tokio::test]
async fn failed_query_shows_apology() {
    let mut server = Server::new_async().await;
    let _list = mock_list(&mut server, "[]").await;
    let _query = server
        .mock("POST", "/chat/query")
        .with_status(500)
        .with_body("no model")
        .create_async()
        .await;
    let config = config_for(&server, "apology");

    let mut app = App::new(store_for(&config));
    app.initialize().await;

    assert!(app.submit_query("  remember the lake?  "));
    assert!(app.state().is_waiting());
    app.wait_for_reply().await;

    let state = app.state();
    assert!(!state.is_waiting());
    assert_eq!(
        contents(&state.messages),
        vec![
            (ConversationRole::Assistant, GREETING),
            (ConversationRole::User, "remember the lake?"),
            (ConversationRole::Assistant, APOLOGY),
        ]
    );
}

#[tokio::test]
async fn answered_query_refreshes_conversation_list() {
    let mut server = Server::new_async().await;
    let _list = mock_list(&mut server, TWO_CONVERSATIONS).await;
    let _query = server
        .mock("POST", "/chat/query")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"answer": "What colour was it?", "timestamp": "2024-06-20T10:05:00"}"#)
        .create_async()
        .await;
    let config = config_for(&server, "answered");

    let mut app = App::new(store_for(&config));
    app.initialize().await;

    assert!(app.submit_query("I had a bike"));
    assert!(!app.submit_query("and a kite"), "a second query must wait for the first");
    app.wait_for_reply().await;

    let state = app.state();
    let last = state.messages.last().expect("reply should be shown");
    assert_eq!(last.content, "What colour was it?");
    assert_eq!(state.conversations.len(), 2);
    assert_eq!(
        state
            .messages
            .iter()
            .filter(|message| message.is_user())
            .count(),
        1
    );
}

#[tokio::test]
async fn switching_chat_drops_pending_reply() {
    let mut server = Server::new_async().await;
    let _list = mock_list(&mut server, "[]").await;
    let _query = server
        .mock("POST", "/chat/query")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"answer": "late answer", "timestamp": "2024-06-20T10:05:00"}"#)
        .create_async()
        .await;
    let config = config_for(&server, "switch");

    let mut app = App::new(store_for(&config));
    app.initialize().await;

    assert!(app.submit_query("first chat question"));
    app.new_chat().await;
    assert!(!app.state().is_waiting());

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    app.process_events().await;

    assert_eq!(
        contents(&app.state().messages),
        vec![(ConversationRole::Assistant, GREETING)]
    );
}

#[tokio::test]
async fn cli_delete_of_active_conversation_persists_a_replacement() {
    let mut server = Server::new_async().await;
    let delete = server
        .mock("DELETE", "/chat/conversation/conv_1")
        .with_status(200)
        .create_async()
        .await;
    let config = config_for(&server, "cli_delete_active");
    seed_active(&config, "conv_1");

    storyline::commands::delete_conversation(&store_for(&config), "conv_1")
        .await
        .expect("delete should succeed");
    delete.assert_async().await;

    let persisted = persisted_id(&config).expect("an active chat should be persisted");
    assert_ne!(persisted, "conv_1");
    assert!(persisted.starts_with("conv_"));
}

#[tokio::test]
async fn cli_delete_of_other_conversation_keeps_active_chat() {
    let mut server = Server::new_async().await;
    let _delete = server
        .mock("DELETE", "/chat/conversation/conv_2")
        .with_status(200)
        .create_async()
        .await;
    let config = config_for(&server, "cli_delete_other");
    seed_active(&config, "conv_1");

    storyline::commands::delete_conversation(&store_for(&config), "conv_2")
        .await
        .expect("delete should succeed");

    assert_eq!(persisted_id(&config).as_deref(), Some("conv_1"));
}

#[tokio::test]
async fn cli_delete_failure_is_an_error() {
    let mut server = Server::new_async().await;
    let _delete = server
        .mock("DELETE", "/chat/conversation/conv_1")
        .with_status(500)
        .create_async()
        .await;
    let config = config_for(&server, "cli_delete_failure");
    seed_active(&config, "conv_1");

    let result = storyline::commands::delete_conversation(&store_for(&config), "conv_1").await;
    assert!(result.is_err());
    assert_eq!(persisted_id(&config).as_deref(), Some("conv_1"));
}

#[tokio::test]
async fn reopening_active_chat_while_waiting_keeps_the_question() {
    let mut server = Server::new_async().await;
    let _list = mock_list(&mut server, TWO_CONVERSATIONS).await;
    let _detail = server
        .mock("GET", "/chat/conversation/conv_1")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"history": [{"query": "old q", "response": "old a", "timestamp": "2024-06-20T10:00:00"}]}"#)
        .create_async()
        .await;
    let _query = server
        .mock("POST", "/chat/query")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"answer": "new answer", "timestamp": "2024-06-20T10:05:00"}"#)
        .create_async()
        .await;
    let config = config_for(&server, "reopen_waiting");
    seed_active(&config, "conv_1");

    let mut app = App::new(store_for(&config));
    app.initialize().await;

    assert!(app.submit_query("new question"));
    app.open_chat("conv_1").await;
    app.wait_for_reply().await;

    assert_eq!(
        contents(&app.state().messages),
        vec![
            (ConversationRole::User, "old q"),
            (ConversationRole::Assistant, "old a"),
            (ConversationRole::User, "new question"),
            (ConversationRole::Assistant, "new answer"),
        ]
    );
}
