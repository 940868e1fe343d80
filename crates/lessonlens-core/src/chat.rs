//! Chat history: messages grouped by conversation.
//!
//! A conversation is just an id chosen by the client. Messages carry the
//! scope they were posted under, so a shared conversation is readable by
//! every accepted member of the space while a personal one stays with its
//! author.

use crate::access;
use crate::audit;
use crate::error::{Result, ServiceError};
use crate::models::{new_id, now_millis, AuditAction, ChatMessage, NewChatMessage, Scope};
use crate::outcome::QueryOutcome;
use crate::store::Store;

/// Append a message to a conversation and return the stored message.
pub async fn post_message<S: Store + ?Sized>(
    store: &S,
    caller: Option<&str>,
    input: NewChatMessage,
) -> Result<ChatMessage> {
    let caller = caller.ok_or(ServiceError::AuthenticationRequired)?;
    let conversation_id = input.conversation_id.trim();
    if conversation_id.is_empty() {
        return Err(ServiceError::invalid("conversationId must not be empty"));
    }
    if input.content.trim().is_empty() {
        return Err(ServiceError::invalid("message content must not be empty"));
    }
    if let Scope::Shared(space_id) = &input.scope {
        if store.get_space(space_id).await?.is_none() {
            return Err(ServiceError::not_found("space", space_id.as_str()));
        }
    }
    let author = access::authorize(store, Some(caller), &input.scope, None).await?;

    let message = ChatMessage {
        id: new_id(),
        author_id: author.to_string(),
        conversation_id: conversation_id.to_string(),
        role: input.role,
        content: input.content,
        scope: input.scope,
        created_at: now_millis(),
    };
    let entry = audit::entry(
        author,
        AuditAction::ChatPost,
        &message.id,
        &message.scope,
        &message.conversation_id,
    );
    store.insert_chat_message(&message, &entry).await?;

    tracing::debug!(
        message_id = %message.id,
        conversation_id = %message.conversation_id,
        role = message.role.as_str(),
        "posted chat message"
    );
    Ok(message)
}

/// Messages of one conversation visible to the caller, oldest first.
pub async fn list_messages<S: Store + ?Sized>(
    store: &S,
    caller: Option<&str>,
    scope: &Scope,
    conversation_id: &str,
) -> QueryOutcome<ChatMessage> {
    let visibility = match access::resolve_visibility(store, caller, scope).await {
        Ok(v) => v,
        Err(reason) => return QueryOutcome::Degraded(reason),
    };

    match store.list_chat_messages(visibility, conversation_id).await {
        Ok(messages) => QueryOutcome::Items(messages),
        Err(e) => {
            tracing::warn!(error = %e, %scope, conversation_id, "failed to load chat history");
            QueryOutcome::failed(e)
        }
    }
}
