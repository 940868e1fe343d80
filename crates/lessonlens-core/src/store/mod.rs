//! Storage abstraction for LessonLens.
//!
//! The [`Store`] trait defines every persistence operation needed by the
//! website, document, chat, space, and audit operations, so that backends
//! (SQLite in the server, in-memory for tests) are interchangeable.
//! Authorization is not the store's concern: callers resolve a
//! [`Visibility`] through [`crate::access`] before asking the store for
//! records.
//!
//! Every mutating method takes the [`AuditEntry`] describing it. The record
//! writes and the audit append are one unit: either all of them are applied
//! or none is.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{AuditEntry, ChatMessage, Document, Membership, ScrapedWebsite, Space};

/// The set of records a query is allowed to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility<'a> {
    /// Personal-scope records belonging to this user: the owner of a
    /// website or document, the author of a chat message, the actor of an
    /// audit entry.
    Personal { principal: &'a str },
    /// All records of this space, regardless of creator.
    Shared { space_id: &'a str },
}

/// Abstract storage backend for LessonLens.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`insert_website`](Store::insert_website) | Persist a new scraped website with its chunks |
/// | [`get_website`](Store::get_website) | Fetch one website by id |
/// | [`list_websites`](Store::list_websites) | Websites of a visibility set, newest first |
/// | [`delete_website`](Store::delete_website) | Hard-delete a website and its chunks |
/// | [`insert_document`](Store::insert_document) | Persist a new document |
/// | [`get_document`](Store::get_document) | Fetch one document by id |
/// | [`list_documents`](Store::list_documents) | Documents of a visibility set, newest first |
/// | [`delete_document`](Store::delete_document) | Hard-delete a document |
/// | [`insert_chat_message`](Store::insert_chat_message) | Append a chat message |
/// | [`list_chat_messages`](Store::list_chat_messages) | One conversation, oldest first |
/// | [`create_space`](Store::create_space) | Persist a space with its owner's membership |
/// | [`get_space`](Store::get_space) | Fetch one space by id |
/// | [`list_spaces_for_member`](Store::list_spaces_for_member) | Spaces with an accepted membership |
/// | [`get_membership`](Store::get_membership) | Membership of (space, user) |
/// | [`upsert_membership`](Store::upsert_membership) | Create or update a membership |
/// | [`delete_membership`](Store::delete_membership) | Remove a membership |
/// | [`list_memberships`](Store::list_memberships) | All memberships of a space |
/// | [`list_audit`](Store::list_audit) | Audit entries of a visibility set, newest first |
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_website(&self, website: &ScrapedWebsite, audit: &AuditEntry) -> Result<()>;

    async fn get_website(&self, id: &str) -> Result<Option<ScrapedWebsite>>;

    /// Websites visible under `visibility`, newest first by creation order.
    async fn list_websites(&self, visibility: Visibility<'_>) -> Result<Vec<ScrapedWebsite>>;

    /// Returns `false` (and records nothing) if no website had this id.
    async fn delete_website(&self, id: &str, audit: &AuditEntry) -> Result<bool>;

    async fn insert_document(&self, document: &Document, audit: &AuditEntry) -> Result<()>;

    async fn get_document(&self, id: &str) -> Result<Option<Document>>;

    async fn list_documents(&self, visibility: Visibility<'_>) -> Result<Vec<Document>>;

    /// Returns `false` (and records nothing) if no document had this id.
    async fn delete_document(&self, id: &str, audit: &AuditEntry) -> Result<bool>;

    async fn insert_chat_message(&self, message: &ChatMessage, audit: &AuditEntry) -> Result<()>;

    /// Messages of `conversation_id` visible under `visibility`, oldest first.
    async fn list_chat_messages(
        &self,
        visibility: Visibility<'_>,
        conversation_id: &str,
    ) -> Result<Vec<ChatMessage>>;

    /// Insert `space` and its owner's accepted membership.
    async fn create_space(&self, space: &Space, owner: &Membership, audit: &AuditEntry) -> Result<()>;

    async fn get_space(&self, id: &str) -> Result<Option<Space>>;

    /// Spaces in which `user_id` holds an accepted membership, oldest first.
    async fn list_spaces_for_member(&self, user_id: &str) -> Result<Vec<Space>>;

    async fn get_membership(&self, space_id: &str, user_id: &str) -> Result<Option<Membership>>;

    async fn upsert_membership(&self, membership: &Membership, audit: &AuditEntry) -> Result<()>;

    /// Returns `false` (and records nothing) if there was no such membership.
    async fn delete_membership(&self, space_id: &str, user_id: &str, audit: &AuditEntry) -> Result<bool>;

    /// Memberships of a space in invitation order.
    async fn list_memberships(&self, space_id: &str) -> Result<Vec<Membership>>;

    /// Audit entries visible under `visibility`, newest first. For
    /// [`Visibility::Personal`] these are the actor's own personal-scope entries.
    async fn list_audit(&self, visibility: Visibility<'_>) -> Result<Vec<AuditEntry>>;
}
