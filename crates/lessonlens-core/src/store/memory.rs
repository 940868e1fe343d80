//! In-memory [`Store`] implementation for tests and embedding.
//!
//! All tables live in one struct behind a single `std::sync::RwLock`, so a
//! mutation and its audit entry are applied under the same write guard.
//! Insertion order doubles as creation order; newest-first listings are the
//! reversed vectors.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::models::{
    AuditEntry, ChatMessage, Document, Membership, MembershipStatus, ScrapedWebsite, Scope, Space,
};

use super::{Store, Visibility};

#[derive(Default)]
struct Tables {
    websites: Vec<ScrapedWebsite>,
    documents: Vec<Document>,
    chat_messages: Vec<ChatMessage>,
    spaces: Vec<Space>,
    memberships: Vec<Membership>,
    audit: Vec<AuditEntry>,
}

/// In-memory store for tests.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    #[cfg(test)]
    faults: faults::Faults,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    /// Validate an audit entry before any table is touched.
    fn check_audit(&self, tables: &Tables, entry: &AuditEntry) -> Result<()> {
        #[cfg(test)]
        self.faults.check_audit()?;
        if tables.audit.iter().any(|e| e.id == entry.id) {
            bail!("duplicate audit id: {}", entry.id);
        }
        Ok(())
    }

    fn check_listing(&self) -> Result<()> {
        #[cfg(test)]
        self.faults.check_listing()?;
        Ok(())
    }
}

fn scope_visible(scope: &Scope, principal: &str, visibility: Visibility<'_>) -> bool {
    match (visibility, scope) {
        (Visibility::Personal { principal: viewer }, Scope::Personal) => principal == viewer,
        (Visibility::Shared { space_id }, Scope::Shared(id)) => id == space_id,
        _ => false,
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_website(&self, website: &ScrapedWebsite, audit: &AuditEntry) -> Result<()> {
        let mut tables = self.write()?;
        if tables.websites.iter().any(|w| w.id == website.id) {
            bail!("duplicate website id: {}", website.id);
        }
        self.check_audit(&tables, audit)?;
        tables.websites.push(website.clone());
        tables.audit.push(audit.clone());
        Ok(())
    }

    async fn get_website(&self, id: &str) -> Result<Option<ScrapedWebsite>> {
        Ok(self.read()?.websites.iter().find(|w| w.id == id).cloned())
    }

    async fn list_websites(&self, visibility: Visibility<'_>) -> Result<Vec<ScrapedWebsite>> {
        self.check_listing()?;
        Ok(self
            .read()?
            .websites
            .iter()
            .rev()
            .filter(|w| scope_visible(&w.scope, &w.owner_id, visibility))
            .cloned()
            .collect())
    }

    async fn delete_website(&self, id: &str, audit: &AuditEntry) -> Result<bool> {
        let mut tables = self.write()?;
        let Some(pos) = tables.websites.iter().position(|w| w.id == id) else {
            return Ok(false);
        };
        self.check_audit(&tables, audit)?;
        tables.websites.remove(pos);
        tables.audit.push(audit.clone());
        Ok(true)
    }

    async fn insert_document(&self, document: &Document, audit: &AuditEntry) -> Result<()> {
        let mut tables = self.write()?;
        if tables.documents.iter().any(|d| d.id == document.id) {
            bail!("duplicate document id: {}", document.id);
        }
        self.check_audit(&tables, audit)?;
        tables.documents.push(document.clone());
        tables.audit.push(audit.clone());
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.read()?.documents.iter().find(|d| d.id == id).cloned())
    }

    async fn list_documents(&self, visibility: Visibility<'_>) -> Result<Vec<Document>> {
        self.check_listing()?;
        Ok(self
            .read()?
            .documents
            .iter()
            .rev()
            .filter(|d| scope_visible(&d.scope, &d.owner_id, visibility))
            .cloned()
            .collect())
    }

    async fn delete_document(&self, id: &str, audit: &AuditEntry) -> Result<bool> {
        let mut tables = self.write()?;
        let Some(pos) = tables.documents.iter().position(|d| d.id == id) else {
            return Ok(false);
        };
        self.check_audit(&tables, audit)?;
        tables.documents.remove(pos);
        tables.audit.push(audit.clone());
        Ok(true)
    }

    async fn insert_chat_message(&self, message: &ChatMessage, audit: &AuditEntry) -> Result<()> {
        let mut tables = self.write()?;
        if tables.chat_messages.iter().any(|m| m.id == message.id) {
            bail!("duplicate chat message id: {}", message.id);
        }
        self.check_audit(&tables, audit)?;
        tables.chat_messages.push(message.clone());
        tables.audit.push(audit.clone());
        Ok(())
    }

    async fn list_chat_messages(
        &self,
        visibility: Visibility<'_>,
        conversation_id: &str,
    ) -> Result<Vec<ChatMessage>> {
        self.check_listing()?;
        Ok(self
            .read()?
            .chat_messages
            .iter()
            .filter(|m| {
                m.conversation_id == conversation_id
                    && scope_visible(&m.scope, &m.author_id, visibility)
            })
            .cloned()
            .collect())
    }

    async fn create_space(&self, space: &Space, owner: &Membership, audit: &AuditEntry) -> Result<()> {
        let mut tables = self.write()?;
        if tables.spaces.iter().any(|s| s.id == space.id) {
            bail!("duplicate space id: {}", space.id);
        }
        self.check_audit(&tables, audit)?;
        tables.spaces.push(space.clone());
        tables.memberships.push(owner.clone());
        tables.audit.push(audit.clone());
        Ok(())
    }

    async fn get_space(&self, id: &str) -> Result<Option<Space>> {
        Ok(self.read()?.spaces.iter().find(|s| s.id == id).cloned())
    }

    async fn list_spaces_for_member(&self, user_id: &str) -> Result<Vec<Space>> {
        let tables = self.read()?;
        Ok(tables
            .spaces
            .iter()
            .filter(|s| {
                tables.memberships.iter().any(|m| {
                    m.space_id == s.id
                        && m.user_id == user_id
                        && m.status == MembershipStatus::Accepted
                })
            })
            .cloned()
            .collect())
    }

    async fn get_membership(&self, space_id: &str, user_id: &str) -> Result<Option<Membership>> {
        Ok(self
            .read()?
            .memberships
            .iter()
            .find(|m| m.space_id == space_id && m.user_id == user_id)
            .cloned())
    }

    async fn upsert_membership(&self, membership: &Membership, audit: &AuditEntry) -> Result<()> {
        let mut tables = self.write()?;
        self.check_audit(&tables, audit)?;
        match tables
            .memberships
            .iter_mut()
            .find(|m| m.space_id == membership.space_id && m.user_id == membership.user_id)
        {
            Some(existing) => *existing = membership.clone(),
            None => tables.memberships.push(membership.clone()),
        }
        tables.audit.push(audit.clone());
        Ok(())
    }

    async fn delete_membership(&self, space_id: &str, user_id: &str, audit: &AuditEntry) -> Result<bool> {
        let mut tables = self.write()?;
        let Some(pos) = tables
            .memberships
            .iter()
            .position(|m| m.space_id == space_id && m.user_id == user_id)
        else {
            return Ok(false);
        };
        self.check_audit(&tables, audit)?;
        tables.memberships.remove(pos);
        tables.audit.push(audit.clone());
        Ok(true)
    }

    async fn list_memberships(&self, space_id: &str) -> Result<Vec<Membership>> {
        Ok(self
            .read()?
            .memberships
            .iter()
            .filter(|m| m.space_id == space_id)
            .cloned()
            .collect())
    }

    async fn list_audit(&self, visibility: Visibility<'_>) -> Result<Vec<AuditEntry>> {
        self.check_listing()?;
        Ok(self
            .read()?
            .audit
            .iter()
            .rev()
            .filter(|e| scope_visible(&e.scope, &e.actor_id, visibility))
            .cloned()
            .collect())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit;
    use crate::models::{AuditAction, WebsiteMetadata};

    fn website(id: &str, owner: &str, scope: Scope) -> ScrapedWebsite {
        ScrapedWebsite {
            id: id.to_string(),
            owner_id: owner.to_string(),
            url: format!("https://example.org/{}", id),
            title: id.to_string(),
            content: String::new(),
            chunks: Vec::new(),
            metadata: WebsiteMetadata::default(),
            scope,
            created_at: 0,
        }
    }

    fn entry(actor: &str, target: &str, scope: &Scope) -> AuditEntry {
        audit::entry(actor, AuditAction::WebsiteIngest, target, scope, "")
    }

    async fn insert(store: &InMemoryStore, site: ScrapedWebsite) {
        let audit = entry(&site.owner_id, &site.id, &site.scope);
        store.insert_website(&site, &audit).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_scoped() {
        let store = InMemoryStore::new();
        insert(&store, website("a", "alice", Scope::Personal)).await;
        insert(&store, website("b", "bob", Scope::Personal)).await;
        insert(&store, website("c", "alice", Scope::shared("s1"))).await;
        insert(&store, website("d", "alice", Scope::Personal)).await;

        let personal = store
            .list_websites(Visibility::Personal { principal: "alice" })
            .await
            .unwrap();
        let ids: Vec<&str> = personal.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "a"]);

        let shared = store
            .list_websites(Visibility::Shared { space_id: "s1" })
            .await
            .unwrap();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].id, "c");
    }

    #[tokio::test]
    async fn test_delete_reports_presence() {
        let store = InMemoryStore::new();
        insert(&store, website("a", "alice", Scope::Personal)).await;
        let del = entry("alice", "a", &Scope::Personal);
        assert!(store.delete_website("a", &del).await.unwrap());
        let again = entry("alice", "a", &Scope::Personal);
        assert!(!store.delete_website("a", &again).await.unwrap());
        assert!(store.get_website("a").await.unwrap().is_none());

        // The miss recorded nothing.
        let audit = store
            .list_audit(Visibility::Personal { principal: "alice" })
            .await
            .unwrap();
        assert_eq!(audit.len(), 2);
    }

    #[tokio::test]
    async fn test_rejected_audit_entry_leaves_tables_untouched() {
        let store = InMemoryStore::new();
        let first = entry("alice", "a", &Scope::Personal);
        store
            .insert_website(&website("a", "alice", Scope::Personal), &first)
            .await
            .unwrap();

        // Reusing an audit id is rejected before the website is stored.
        assert!(store
            .insert_website(&website("b", "alice", Scope::Personal), &first)
            .await
            .is_err());
        assert!(store.get_website("b").await.unwrap().is_none());

        store.fail_audit_writes();
        let del = entry("alice", "a", &Scope::Personal);
        assert!(store.delete_website("a", &del).await.is_err());
        assert!(store.get_website("a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_upsert_membership_replaces() {
        let store = InMemoryStore::new();
        let mut m = Membership {
            space_id: "s1".to_string(),
            user_id: "bob".to_string(),
            status: MembershipStatus::Pending,
            invited_by: "alice".to_string(),
            created_at: 0,
        };
        let scope = Scope::shared("s1");
        store.upsert_membership(&m, &entry("alice", "bob", &scope)).await.unwrap();
        m.status = MembershipStatus::Accepted;
        store.upsert_membership(&m, &entry("bob", "bob", &scope)).await.unwrap();

        let all = store.list_memberships("s1").await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].is_accepted());
    }
}
