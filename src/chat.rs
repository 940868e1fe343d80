//! `lens chat` subcommands.

use anyhow::Result;

use lessonlens_core::chat;
use lessonlens_core::models::{ChatRole, NewChatMessage, Scope};

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

pub async fn run_post(
    config: &Config,
    caller: &str,
    conversation_id: &str,
    role: &str,
    content: &str,
    scope: Option<String>,
) -> Result<()> {
    let input = NewChatMessage {
        conversation_id: conversation_id.to_string(),
        role: role.parse::<ChatRole>()?,
        content: content.to_string(),
        scope: Scope::from(scope),
    };

    let store = SqliteStore::open(config).await?;
    let result = chat::post_message(&store, Some(caller), input).await;
    store.close().await;

    let message = result?;
    println!("posted: {}", message.id);
    Ok(())
}

pub async fn run_history(
    config: &Config,
    caller: &str,
    conversation_id: &str,
    scope: Option<String>,
) -> Result<()> {
    let scope = Scope::from(scope);
    let store = SqliteStore::open(config).await?;
    let history = chat::list_messages(&store, Some(caller), &scope, conversation_id).await;
    store.close().await;

    let messages = history.into_items();
    if messages.is_empty() {
        println!("No messages.");
        return Ok(());
    }
    for message in &messages {
        println!("[{}] {}: {}", message.role.as_str(), message.author_id, message.content);
    }
    Ok(())
}
