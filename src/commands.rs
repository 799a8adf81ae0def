use anyhow::{bail, Context, Result};
use chrono::Local;

use crate::events::{ChatMessage, ConversationRole};
use crate::history::{group_conversations, EMPTY_HISTORY};
use crate::markdown::{escape_html, format_markdown};
use crate::store::{ConversationStore, Deletion};
use crate::timefmt::format_time;

pub async fn list_conversations(store: &ConversationStore) -> Result<()> {
    let conversations = store.list_conversations().await;
    let groups = group_conversations(&conversations, Local::now());

    if groups.is_empty() {
        println!("📭 {EMPTY_HISTORY}");
        return Ok(());
    }

    let active = store.persisted_chat_id();
    for group in groups {
        println!("{}", group.bucket.label());
        for conversation in group.conversations {
            let marker = if active.as_deref() == Some(conversation.conversation_id.as_str()) {
                "▶"
            } else {
                "💬"
            };
            println!(
                "  {} {}  {}  ({} messages)",
                marker,
                conversation.conversation_id,
                conversation.last_message.lines().next().unwrap_or_default(),
                conversation.message_count
            );
        }
        println!();
    }

    Ok(())
}

pub async fn show_conversation(store: &ConversationStore, id: &str, html: bool) -> Result<()> {
    let messages = store.get_conversation(id).await;
    if html {
        println!("{}", transcript_html(&messages));
    } else {
        for message in &messages {
            let who = if message.is_user() { "👤 You" } else { "🤖 Storyline" };
            println!("{} {}", who, format_time(message.timestamp));
            for line in message.content.lines() {
                println!("  {line}");
            }
            println!();
        }
    }
    Ok(())
}

pub async fn delete_conversation(store: &ConversationStore, id: &str) -> Result<()> {
    match store.delete_conversation(id).await {
        Deletion::Failed => bail!("Could not delete conversation {id}"),
        Deletion::Deleted => println!("🗑️  Deleted conversation {id}"),
        Deletion::Replaced(created) => {
            println!("🗑️  Deleted conversation {id}");
            println!("✨ Started {} as the active conversation", created.conversation_id);
        }
    }
    Ok(())
}

pub async fn show_status(store: &ConversationStore) -> Result<()> {
    let report = store
        .health()
        .await
        .with_context(|| format!("Backend at {} is not reachable", store.client().base_url()))?;

    let icon = if report.status == "healthy" { "✅" } else { "⚠️" };
    println!("{} Backend {}: {}", icon, store.client().base_url(), report.status);
    println!("   Database connected: {}", report.database_connected);
    if let Some(stats) = report.stats {
        println!("   Conversations: {}", stats.total_conversations);
        println!("   Messages: {}", stats.total_messages);
        if let Some(last) = stats.last_activity {
            println!("   Last activity: {last}");
        }
    }
    if let Some(error) = report.error {
        println!("   Error: {error}");
    }
    Ok(())
}

/// Render messages as an HTML fragment, one block per message
pub fn transcript_html(messages: &[ChatMessage]) -> String {
    let mut html = String::new();
    for message in messages {
        let (class, body) = match message.role {
            ConversationRole::User => ("user-message", escape_html(&message.content)),
            ConversationRole::Assistant => ("ai-message", format_markdown(&message.content)),
            ConversationRole::System => ("system-message", escape_html(&message.content)),
        };
        html.push_str(&format!(
            "<div class=\"message {}\">{}<div class=\"timestamp\">{}</div></div>\n",
            class,
            body,
            format_time(message.timestamp)
        ));
    }
    html
}
