//! SQLite-backed [`Store`] implementation.
//!
//! Maps each [`Store`] operation onto the schema created by
//! [`crate::migrate`]: `websites` + `website_chunks`, `documents`,
//! `chat_messages`, `spaces`, `memberships`, and `audit_logs`. Every
//! mutation runs in one transaction together with its `audit_logs` row.
//! Creation order is `created_at` with `rowid` as the tie-breaker, so
//! "newest first" is stable even when two rows share a millisecond.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

use lessonlens_core::models::{
    AuditEntry, ChatMessage, Document, Membership, ScrapedWebsite, Scope, Space, WebsiteMetadata,
};
use lessonlens_core::store::{Store, Visibility};

use crate::config::Config;
use crate::{db, migrate};

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the configured database, creating the schema if needed.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

/// WHERE fragment for a visibility set and its single bind value.
///
/// `principal_column` is the column holding the owning user of a personal
/// record; `space_column` holds the space id (NULL for personal records).
fn scope_filter<'a>(
    visibility: Visibility<'a>,
    principal_column: &str,
    space_column: &str,
) -> (String, &'a str) {
    match visibility {
        Visibility::Personal { principal } => (
            format!("{} = ? AND {} IS NULL", principal_column, space_column),
            principal,
        ),
        Visibility::Shared { space_id } => (format!("{} = ?", space_column), space_id),
    }
}

async fn insert_audit(conn: &mut SqliteConnection, entry: &AuditEntry) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, actor_id, action, target_id, space_id, detail, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.actor_id)
    .bind(entry.action.as_str())
    .bind(&entry.target_id)
    .bind(entry.scope.space_id())
    .bind(&entry.detail)
    .bind(entry.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

fn website_from_row(row: &SqliteRow, chunks: Vec<String>) -> ScrapedWebsite {
    let space_id: Option<String> = row.get("space_id");
    ScrapedWebsite {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        url: row.get("url"),
        title: row.get("title"),
        content: row.get("content"),
        chunks,
        metadata: WebsiteMetadata {
            description: row.get("description"),
            og_image: row.get("og_image"),
            source_url: row.get("source_url"),
        },
        scope: Scope::from(space_id),
        created_at: row.get("created_at"),
    }
}

fn document_from_row(row: &SqliteRow) -> Document {
    let space_id: Option<String> = row.get("space_id");
    Document {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        title: row.get("title"),
        content: row.get("content"),
        scope: Scope::from(space_id),
        created_at: row.get("created_at"),
    }
}

fn chat_message_from_row(row: &SqliteRow) -> Result<ChatMessage> {
    let role: String = row.get("role");
    let space_id: Option<String> = row.get("space_id");
    Ok(ChatMessage {
        id: row.get("id"),
        author_id: row.get("author_id"),
        conversation_id: row.get("conversation_id"),
        role: role.parse()?,
        content: row.get("content"),
        scope: Scope::from(space_id),
        created_at: row.get("created_at"),
    })
}

fn space_from_row(row: &SqliteRow) -> Space {
    Space {
        id: row.get("id"),
        name: row.get("name"),
        owner_id: row.get("owner_id"),
        created_at: row.get("created_at"),
    }
}

fn membership_from_row(row: &SqliteRow) -> Result<Membership> {
    let status: String = row.get("status");
    Ok(Membership {
        space_id: row.get("space_id"),
        user_id: row.get("user_id"),
        status: status.parse()?,
        invited_by: row.get("invited_by"),
        created_at: row.get("created_at"),
    })
}

fn audit_from_row(row: &SqliteRow) -> Result<AuditEntry> {
    let action: String = row.get("action");
    let space_id: Option<String> = row.get("space_id");
    Ok(AuditEntry {
        id: row.get("id"),
        actor_id: row.get("actor_id"),
        action: action.parse()?,
        target_id: row.get("target_id"),
        scope: Scope::from(space_id),
        detail: row.get("detail"),
        created_at: row.get("created_at"),
    })
}

const WEBSITE_COLUMNS: &str = "w.id, w.owner_id, w.url, w.title, w.content, w.description, \
                               w.og_image, w.source_url, w.space_id, w.created_at";

const DOCUMENT_COLUMNS: &str = "id, owner_id, title, content, space_id, created_at";

const CHAT_COLUMNS: &str = "id, author_id, conversation_id, role, content, space_id, created_at";

async fn upsert_membership_row(conn: &mut SqliteConnection, membership: &Membership) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO memberships (space_id, user_id, status, invited_by, created_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(space_id, user_id) DO UPDATE SET
            status = excluded.status,
            invited_by = excluded.invited_by
        "#,
    )
    .bind(&membership.space_id)
    .bind(&membership.user_id)
    .bind(membership.status.as_str())
    .bind(&membership.invited_by)
    .bind(membership.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_website(&self, website: &ScrapedWebsite, audit: &AuditEntry) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO websites (id, owner_id, url, title, content, description,
                                  og_image, source_url, space_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&website.id)
        .bind(&website.owner_id)
        .bind(&website.url)
        .bind(&website.title)
        .bind(&website.content)
        .bind(&website.metadata.description)
        .bind(&website.metadata.og_image)
        .bind(&website.metadata.source_url)
        .bind(website.scope.space_id())
        .bind(website.created_at)
        .execute(&mut *tx)
        .await?;

        for (i, text) in website.chunks.iter().enumerate() {
            sqlx::query("INSERT INTO website_chunks (website_id, chunk_index, text) VALUES (?, ?, ?)")
                .bind(&website.id)
                .bind(i as i64)
                .bind(text)
                .execute(&mut *tx)
                .await?;
        }

        insert_audit(&mut *tx, audit).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_website(&self, id: &str) -> Result<Option<ScrapedWebsite>> {
        let row = sqlx::query(&format!("SELECT {} FROM websites w WHERE w.id = ?", WEBSITE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let chunks: Vec<String> = sqlx::query_scalar(
            "SELECT text FROM website_chunks WHERE website_id = ? ORDER BY chunk_index ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(website_from_row(&row, chunks)))
    }

    async fn list_websites(&self, visibility: Visibility<'_>) -> Result<Vec<ScrapedWebsite>> {
        let (clause, value) = scope_filter(visibility, "w.owner_id", "w.space_id");

        let rows = sqlx::query(&format!(
            "SELECT {} FROM websites w WHERE {} ORDER BY w.created_at DESC, w.rowid DESC",
            WEBSITE_COLUMNS, clause
        ))
        .bind(value)
        .fetch_all(&self.pool)
        .await?;

        // One pass over all chunks of the visible set instead of a query per website.
        let chunk_rows = sqlx::query(&format!(
            r#"
            SELECT c.website_id, c.text
            FROM website_chunks c
            JOIN websites w ON w.id = c.website_id
            WHERE {}
            ORDER BY c.website_id, c.chunk_index ASC
            "#,
            clause
        ))
        .bind(value)
        .fetch_all(&self.pool)
        .await?;

        let mut chunks_by_site: HashMap<String, Vec<String>> = HashMap::new();
        for row in &chunk_rows {
            chunks_by_site
                .entry(row.get("website_id"))
                .or_default()
                .push(row.get("text"));
        }

        Ok(rows
            .iter()
            .map(|row| {
                let id: String = row.get("id");
                let chunks = chunks_by_site.remove(&id).unwrap_or_default();
                website_from_row(row, chunks)
            })
            .collect())
    }

    async fn delete_website(&self, id: &str, audit: &AuditEntry) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM website_chunks WHERE website_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM websites WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        insert_audit(&mut *tx, audit).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn insert_document(&self, document: &Document, audit: &AuditEntry) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO documents (id, owner_id, title, content, space_id, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&document.id)
        .bind(&document.owner_id)
        .bind(&document.title)
        .bind(&document.content)
        .bind(document.scope.space_id())
        .bind(document.created_at)
        .execute(&mut *tx)
        .await?;

        insert_audit(&mut *tx, audit).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query(&format!("SELECT {} FROM documents WHERE id = ?", DOCUMENT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(document_from_row))
    }

    async fn list_documents(&self, visibility: Visibility<'_>) -> Result<Vec<Document>> {
        let (clause, value) = scope_filter(visibility, "owner_id", "space_id");
        let rows = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE {} ORDER BY created_at DESC, rowid DESC",
            DOCUMENT_COLUMNS, clause
        ))
        .bind(value)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(document_from_row).collect())
    }

    async fn delete_document(&self, id: &str, audit: &AuditEntry) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        insert_audit(&mut *tx, audit).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn insert_chat_message(&self, message: &ChatMessage, audit: &AuditEntry) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO chat_messages (id, author_id, conversation_id, role, content, space_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&message.id)
        .bind(&message.author_id)
        .bind(&message.conversation_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.scope.space_id())
        .bind(message.created_at)
        .execute(&mut *tx)
        .await?;

        insert_audit(&mut *tx, audit).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list_chat_messages(
        &self,
        visibility: Visibility<'_>,
        conversation_id: &str,
    ) -> Result<Vec<ChatMessage>> {
        let (clause, value) = scope_filter(visibility, "author_id", "space_id");
        let rows = sqlx::query(&format!(
            "SELECT {} FROM chat_messages WHERE {} AND conversation_id = ? ORDER BY created_at ASC, rowid ASC",
            CHAT_COLUMNS, clause
        ))
        .bind(value)
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(chat_message_from_row).collect()
    }

    async fn create_space(&self, space: &Space, owner: &Membership, audit: &AuditEntry) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO spaces (id, name, owner_id, created_at) VALUES (?, ?, ?, ?)")
            .bind(&space.id)
            .bind(&space.name)
            .bind(&space.owner_id)
            .bind(space.created_at)
            .execute(&mut *tx)
            .await?;
        upsert_membership_row(&mut *tx, owner).await?;

        insert_audit(&mut *tx, audit).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_space(&self, id: &str) -> Result<Option<Space>> {
        let row = sqlx::query("SELECT id, name, owner_id, created_at FROM spaces WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(space_from_row))
    }

    async fn list_spaces_for_member(&self, user_id: &str) -> Result<Vec<Space>> {
        let rows = sqlx::query(
            r#"
            SELECT s.id, s.name, s.owner_id, s.created_at
            FROM spaces s
            JOIN memberships m ON m.space_id = s.id
            WHERE m.user_id = ? AND m.status = 'accepted'
            ORDER BY s.created_at ASC, s.rowid ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(space_from_row).collect())
    }

    async fn get_membership(&self, space_id: &str, user_id: &str) -> Result<Option<Membership>> {
        let row = sqlx::query(
            "SELECT space_id, user_id, status, invited_by, created_at FROM memberships WHERE space_id = ? AND user_id = ?",
        )
        .bind(space_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(membership_from_row).transpose()
    }

    async fn upsert_membership(&self, membership: &Membership, audit: &AuditEntry) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        upsert_membership_row(&mut *tx, membership).await?;
        insert_audit(&mut *tx, audit).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_membership(&self, space_id: &str, user_id: &str, audit: &AuditEntry) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM memberships WHERE space_id = ? AND user_id = ?")
            .bind(space_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        insert_audit(&mut *tx, audit).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn list_memberships(&self, space_id: &str) -> Result<Vec<Membership>> {
        let rows = sqlx::query(
            r#"
            SELECT space_id, user_id, status, invited_by, created_at
            FROM memberships
            WHERE space_id = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(space_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(membership_from_row).collect()
    }

    async fn list_audit(&self, visibility: Visibility<'_>) -> Result<Vec<AuditEntry>> {
        let (clause, value) = scope_filter(visibility, "actor_id", "space_id");
        let rows = sqlx::query(&format!(
            r#"
            SELECT id, actor_id, action, target_id, space_id, detail, created_at
            FROM audit_logs
            WHERE {}
            ORDER BY created_at DESC, rowid DESC
            "#,
            clause
        ))
        .bind(value)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(audit_from_row).collect()
    }
}
