//! Stored documents: lesson plans, handouts, and notes written by educators.
//!
//! Documents follow the same scope rules as scraped websites. They are not
//! chunked and do not take part in keyword search.

use crate::access;
use crate::audit;
use crate::error::{Result, ServiceError};
use crate::models::{new_id, now_millis, AuditAction, Document, NewDocument, Scope};
use crate::outcome::QueryOutcome;
use crate::store::Store;

/// Persist a new document owned by the caller and return its id.
pub async fn create_document<S: Store + ?Sized>(
    store: &S,
    caller: Option<&str>,
    input: NewDocument,
) -> Result<String> {
    let caller = caller.ok_or(ServiceError::AuthenticationRequired)?;
    let title = input.title.trim();
    if title.is_empty() {
        return Err(ServiceError::invalid("document title must not be empty"));
    }
    if let Scope::Shared(space_id) = &input.scope {
        if store.get_space(space_id).await?.is_none() {
            return Err(ServiceError::not_found("space", space_id.as_str()));
        }
    }
    let owner = access::authorize(store, Some(caller), &input.scope, None).await?;

    let document = Document {
        id: new_id(),
        owner_id: owner.to_string(),
        title: title.to_string(),
        content: input.content,
        scope: input.scope,
        created_at: now_millis(),
    };
    let entry = audit::entry(
        owner,
        AuditAction::DocumentCreate,
        &document.id,
        &document.scope,
        &document.title,
    );
    store.insert_document(&document, &entry).await?;

    tracing::info!(document_id = %document.id, owner, scope = %document.scope, "created document");
    Ok(document.id)
}

/// Documents visible to the caller under `scope`, newest first.
pub async fn list_documents<S: Store + ?Sized>(
    store: &S,
    caller: Option<&str>,
    scope: &Scope,
) -> QueryOutcome<Document> {
    let visibility = match access::resolve_visibility(store, caller, scope).await {
        Ok(v) => v,
        Err(reason) => return QueryOutcome::Degraded(reason),
    };

    match store.list_documents(visibility).await {
        Ok(documents) => QueryOutcome::Items(documents),
        Err(e) => {
            tracing::warn!(error = %e, %scope, "failed to list documents");
            QueryOutcome::failed(e)
        }
    }
}

/// Fetch one document the caller may read.
///
/// `None` covers a missing id, a document the caller cannot see, and a
/// backend failure alike.
pub async fn get_document<S: Store + ?Sized>(
    store: &S,
    caller: Option<&str>,
    id: &str,
) -> Option<Document> {
    let document = match store.get_document(id).await {
        Ok(found) => found?,
        Err(e) => {
            tracing::warn!(error = %e, document_id = id, "failed to load document");
            return None;
        }
    };
    match access::authorize(store, caller, &document.scope, Some(&document.owner_id)).await {
        Ok(_) => Some(document),
        Err(e) => {
            tracing::debug!(document_id = id, error = %e, "document hidden from caller");
            None
        }
    }
}

/// Hard-delete a document. Same rules as deleting a website.
pub async fn delete_document<S: Store + ?Sized>(
    store: &S,
    caller: Option<&str>,
    id: &str,
) -> Result<()> {
    let document = store
        .get_document(id)
        .await?
        .ok_or_else(|| ServiceError::not_found("document", id))?;

    let caller = access::authorize(store, caller, &document.scope, Some(&document.owner_id))
        .await
        .inspect_err(|e| tracing::info!(document_id = id, error = %e, "delete rejected"))?;

    let entry = audit::entry(
        caller,
        AuditAction::DocumentDelete,
        id,
        &document.scope,
        &document.title,
    );
    if !store.delete_document(id, &entry).await? {
        return Err(ServiceError::not_found("document", id));
    }

    tracing::info!(document_id = id, caller, scope = %document.scope, "deleted document");
    Ok(())
}
