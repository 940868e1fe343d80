//! Scraped-website operations: ingest, enumerate, delete.
//!
//! Pages arrive already scraped and chunked. Ingest performs no URL or chunk
//! validation beyond the payload's shape; an empty `chunks` list is stored
//! as-is and simply never matches a search. There is no update operation:
//! editing a page means deleting and re-ingesting it.

use crate::access;
use crate::audit;
use crate::error::{Result, ServiceError};
use crate::models::{new_id, now_millis, AuditAction, NewWebsite, ScrapedWebsite, Scope};
use crate::outcome::QueryOutcome;
use crate::store::Store;

/// Persist a new website owned by the caller and return its id.
///
/// Fails with `AuthenticationRequired` without a caller, `NotFound` if the
/// target space does not exist, and `AccessDenied` if the caller is not an
/// accepted member of it.
pub async fn ingest_website<S: Store + ?Sized>(
    store: &S,
    caller: Option<&str>,
    input: NewWebsite,
) -> Result<String> {
    let caller = caller.ok_or(ServiceError::AuthenticationRequired)?;

    if let Scope::Shared(space_id) = &input.scope {
        if store.get_space(space_id).await?.is_none() {
            return Err(ServiceError::not_found("space", space_id.as_str()));
        }
    }
    let owner = access::authorize(store, Some(caller), &input.scope, None)
        .await
        .inspect_err(|e| tracing::info!(caller, scope = %input.scope, error = %e, "ingest rejected"))?;

    let website = ScrapedWebsite {
        id: new_id(),
        owner_id: owner.to_string(),
        url: input.url,
        title: input.title,
        content: input.content,
        chunks: input.chunks,
        metadata: input.metadata,
        scope: input.scope,
        created_at: now_millis(),
    };
    let entry = audit::entry(
        owner,
        AuditAction::WebsiteIngest,
        &website.id,
        &website.scope,
        &website.url,
    );
    store.insert_website(&website, &entry).await?;

    tracing::info!(
        website_id = %website.id,
        owner,
        scope = %website.scope,
        chunks = website.chunks.len(),
        "ingested website"
    );
    Ok(website.id)
}

/// Websites visible to the caller under `scope`, newest first.
///
/// Degrades to an empty list without a caller, without an accepted
/// membership in the requested space, or on a backend failure.
pub async fn list_websites<S: Store + ?Sized>(
    store: &S,
    caller: Option<&str>,
    scope: &Scope,
) -> QueryOutcome<ScrapedWebsite> {
    let visibility = match access::resolve_visibility(store, caller, scope).await {
        Ok(v) => v,
        Err(reason) => return QueryOutcome::Degraded(reason),
    };

    match store.list_websites(visibility).await {
        Ok(websites) => QueryOutcome::Items(websites),
        Err(e) => {
            tracing::warn!(error = %e, %scope, "failed to list websites");
            QueryOutcome::failed(e)
        }
    }
}

/// Hard-delete a website.
///
/// Existence is checked before identity, so an unknown id is `NotFound`
/// for every caller.
pub async fn delete_website<S: Store + ?Sized>(
    store: &S,
    caller: Option<&str>,
    id: &str,
) -> Result<()> {
    let website = store
        .get_website(id)
        .await?
        .ok_or_else(|| ServiceError::not_found("website", id))?;

    let caller = access::authorize(store, caller, &website.scope, Some(&website.owner_id))
        .await
        .inspect_err(|e| tracing::info!(website_id = id, error = %e, "delete rejected"))?;

    let entry = audit::entry(
        caller,
        AuditAction::WebsiteDelete,
        id,
        &website.scope,
        &website.url,
    );
    if !store.delete_website(id, &entry).await? {
        // Removed by a concurrent request after the lookup above.
        return Err(ServiceError::not_found("website", id));
    }

    tracing::info!(website_id = id, caller, scope = %website.scope, "deleted website");
    Ok(())
}
