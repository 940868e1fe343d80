//! Audit log of mutations.
//!
//! Every successful ingest, delete, post, and space change appends one
//! [`AuditEntry`]. The entry is built before the mutation and handed to the
//! store together with it, so a record never exists without its audit trail.
//! Entries inherit the scope of the record they describe, so the same
//! visibility rules apply when reading them back.

use crate::access;
use crate::models::{new_id, now_millis, AuditAction, AuditEntry, Scope};
use crate::outcome::QueryOutcome;
use crate::store::Store;

/// Build the entry for a mutation about to be applied.
pub fn entry(
    actor_id: &str,
    action: AuditAction,
    target_id: &str,
    scope: &Scope,
    detail: impl Into<String>,
) -> AuditEntry {
    AuditEntry {
        id: new_id(),
        actor_id: actor_id.to_string(),
        action,
        target_id: target_id.to_string(),
        scope: scope.clone(),
        detail: detail.into(),
        created_at: now_millis(),
    }
}

/// Audit entries visible to `caller` under `scope`, newest first.
///
/// Personal scope yields the caller's own personal-scope entries; a shared
/// scope yields every entry of the space for accepted members.
pub async fn list_audit_logs<S: Store + ?Sized>(
    store: &S,
    caller: Option<&str>,
    scope: &Scope,
) -> QueryOutcome<AuditEntry> {
    let visibility = match access::resolve_visibility(store, caller, scope).await {
        Ok(v) => v,
        Err(reason) => return QueryOutcome::Degraded(reason),
    };

    match store.list_audit(visibility).await {
        Ok(entries) => QueryOutcome::Items(entries),
        Err(e) => {
            tracing::warn!(error = %e, %scope, "failed to load audit log");
            QueryOutcome::failed(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MembershipStatus, NewWebsite, WebsiteMetadata};
    use crate::store::memory::InMemoryStore;
    use crate::websites;

    fn page(scope: Scope) -> NewWebsite {
        NewWebsite {
            url: "https://example.org/fractions".to_string(),
            title: "Fractions".to_string(),
            content: "halves and quarters".to_string(),
            chunks: vec!["halves and quarters".to_string()],
            metadata: WebsiteMetadata::default(),
            scope,
        }
    }

    #[tokio::test]
    async fn test_personal_audit_is_actor_only() {
        let store = InMemoryStore::new();
        websites::ingest_website(&store, Some("alice"), page(Scope::Personal))
            .await
            .unwrap();

        let mine = list_audit_logs(&store, Some("alice"), &Scope::Personal).await;
        let entries = mine.into_items();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::WebsiteIngest);
        assert_eq!(entries[0].actor_id, "alice");

        let theirs = list_audit_logs(&store, Some("bob"), &Scope::Personal).await;
        assert!(theirs.into_items().is_empty());
    }

    #[tokio::test]
    async fn test_shared_audit_requires_accepted_member() {
        let store = InMemoryStore::with_space(&[
            ("alice", MembershipStatus::Accepted),
            ("bob", MembershipStatus::Pending),
        ]);
        let scope = Scope::shared("s1");
        websites::ingest_website(&store, Some("alice"), page(scope.clone()))
            .await
            .unwrap();

        assert_eq!(list_audit_logs(&store, Some("alice"), &scope).await.into_items().len(), 1);
        let pending = list_audit_logs(&store, Some("bob"), &scope).await;
        assert!(pending.is_degraded());
    }
}
