//! Core data models used throughout LessonLens.
//!
//! These types represent the scraped websites, documents, chat messages,
//! visibility scopes, spaces, memberships, and audit entries that flow between the HTTP surface, the
//! operations in this crate, and the store backends. Field names serialize
//! in camelCase to match the JSON contract used by the web client.

use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Visibility boundary of a record.
///
/// On the wire a scope is an optional `scopeId`: absent means the caller's
/// personal area, present names a shared space.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Owned solely by the record's creator.
    #[default]
    Personal,
    /// Visible to every accepted member of the named space.
    Shared(String),
}

impl Scope {
    pub fn shared(space_id: impl Into<String>) -> Self {
        Scope::Shared(space_id.into())
    }

    pub fn space_id(&self) -> Option<&str> {
        match self {
            Scope::Personal => None,
            Scope::Shared(id) => Some(id),
        }
    }

    pub fn is_personal(&self) -> bool {
        matches!(self, Scope::Personal)
    }
}

impl From<Option<String>> for Scope {
    fn from(scope_id: Option<String>) -> Self {
        match scope_id {
            Some(id) => Scope::Shared(id),
            None => Scope::Personal,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Personal => write!(f, "personal"),
            Scope::Shared(id) => write!(f, "space:{}", id),
        }
    }
}

impl Serialize for Scope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Scope::Personal => serializer.serialize_none(),
            Scope::Shared(id) => serializer.serialize_some(id),
        }
    }
}

impl<'de> Deserialize<'de> for Scope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<String>::deserialize(deserializer).map(Scope::from)
    }
}

/// Fixed-shape page metadata captured at scrape time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteMetadata {
    pub description: String,
    pub og_image: String,
    #[serde(rename = "sourceURL")]
    pub source_url: String,
}

/// Ingest payload: a page already scraped and chunked by an external process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWebsite {
    pub url: String,
    pub title: String,
    pub content: String,
    pub chunks: Vec<String>,
    pub metadata: WebsiteMetadata,
    #[serde(rename = "scopeId", default, skip_serializing_if = "Scope::is_personal")]
    pub scope: Scope,
}

/// A stored scraped page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedWebsite {
    pub id: String,
    pub owner_id: String,
    pub url: String,
    pub title: String,
    pub content: String,
    pub chunks: Vec<String>,
    pub metadata: WebsiteMetadata,
    #[serde(rename = "scopeId", default, skip_serializing_if = "Scope::is_personal")]
    pub scope: Scope,
    /// Creation time in Unix milliseconds.
    pub created_at: i64,
}

/// Create payload for a stored document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocument {
    pub title: String,
    pub content: String,
    #[serde(rename = "scopeId", default, skip_serializing_if = "Scope::is_personal")]
    pub scope: Scope,
}

/// A stored document (lesson plan, handout, notes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub content: String,
    #[serde(rename = "scopeId", default, skip_serializing_if = "Scope::is_personal")]
    pub scope: Scope,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

impl FromStr for ChatRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "user" => Ok(ChatRole::User),
            "assistant" => Ok(ChatRole::Assistant),
            other => bail!("unknown chat role: '{}'", other),
        }
    }
}

/// Post payload for a chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChatMessage {
    pub conversation_id: String,
    pub role: ChatRole,
    pub content: String,
    #[serde(rename = "scopeId", default, skip_serializing_if = "Scope::is_personal")]
    pub scope: Scope,
}

/// One message of a conversation. `author_id` plays the owner role for
/// personal-scope visibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub author_id: String,
    pub conversation_id: String,
    pub role: ChatRole,
    pub content: String,
    #[serde(rename = "scopeId", default, skip_serializing_if = "Scope::is_personal")]
    pub scope: Scope,
    pub created_at: i64,
}

/// A shared workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Space {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    Pending,
    Accepted,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Pending => "pending",
            MembershipStatus::Accepted => "accepted",
        }
    }
}

impl FromStr for MembershipStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "pending" => Ok(MembershipStatus::Pending),
            "accepted" => Ok(MembershipStatus::Accepted),
            other => bail!("unknown membership status: '{}'", other),
        }
    }
}

/// A (user, space) pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub space_id: String,
    pub user_id: String,
    pub status: MembershipStatus,
    pub invited_by: String,
    pub created_at: i64,
}

impl Membership {
    pub fn is_accepted(&self) -> bool {
        self.status == MembershipStatus::Accepted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    #[serde(rename = "website.ingest")]
    WebsiteIngest,
    #[serde(rename = "website.delete")]
    WebsiteDelete,
    #[serde(rename = "document.create")]
    DocumentCreate,
    #[serde(rename = "document.delete")]
    DocumentDelete,
    #[serde(rename = "chat.post")]
    ChatPost,
    #[serde(rename = "space.create")]
    SpaceCreate,
    #[serde(rename = "space.invite")]
    SpaceInvite,
    #[serde(rename = "space.accept")]
    SpaceAccept,
    #[serde(rename = "space.remove_member")]
    SpaceRemoveMember,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::WebsiteIngest => "website.ingest",
            AuditAction::WebsiteDelete => "website.delete",
            AuditAction::DocumentCreate => "document.create",
            AuditAction::DocumentDelete => "document.delete",
            AuditAction::ChatPost => "chat.post",
            AuditAction::SpaceCreate => "space.create",
            AuditAction::SpaceInvite => "space.invite",
            AuditAction::SpaceAccept => "space.accept",
            AuditAction::SpaceRemoveMember => "space.remove_member",
        }
    }
}

impl FromStr for AuditAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        Ok(match s {
            "website.ingest" => AuditAction::WebsiteIngest,
            "website.delete" => AuditAction::WebsiteDelete,
            "document.create" => AuditAction::DocumentCreate,
            "document.delete" => AuditAction::DocumentDelete,
            "chat.post" => AuditAction::ChatPost,
            "space.create" => AuditAction::SpaceCreate,
            "space.invite" => AuditAction::SpaceInvite,
            "space.accept" => AuditAction::SpaceAccept,
            "space.remove_member" => AuditAction::SpaceRemoveMember,
            other => bail!("unknown audit action: '{}'", other),
        })
    }
}

/// One recorded mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: String,
    pub actor_id: String,
    pub action: AuditAction,
    pub target_id: String,
    #[serde(rename = "scopeId", default, skip_serializing_if = "Scope::is_personal")]
    pub scope: Scope,
    pub detail: String,
    pub created_at: i64,
}

/// A ranked search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub website_id: String,
    pub title: String,
    pub url: String,
    /// Leading characters of the best-matching chunk, followed by `"..."`.
    pub content: String,
    pub relevance_score: u64,
}

/// Generate a fresh opaque identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current time in Unix milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
