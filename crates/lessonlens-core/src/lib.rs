//! # LessonLens Core
//!
//! Shared, runtime-agnostic logic for LessonLens: data models, the error
//! taxonomy, the store abstraction, access control, and the operations
//! exposed to callers (website ingest/list/delete/search, documents, chat
//! history, spaces, audit log).
//!
//! This crate contains no tokio, sqlx, or filesystem I/O. Persistence is
//! reached only through the [`store::Store`] trait, so the same operations
//! run against SQLite in the server and against
//! [`store::memory::InMemoryStore`] in tests.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Websites, documents, chat messages, scopes, spaces, memberships, audit entries |
//! | [`error`] | `ServiceError` taxonomy for mutations |
//! | [`outcome`] | Soft-fail wrapper for query operations |
//! | [`store`] | `Store` trait and in-memory backend |
//! | [`access`] | Owner / accepted-membership authorization |
//! | [`websites`] | Ingest, enumerate, delete scraped websites |
//! | [`documents`] | Create, read, enumerate, delete documents |
//! | [`chat`] | Conversation messages and history |
//! | [`search`] | Keyword tokenization, scoring, and ranking |
//! | [`spaces`] | Shared spaces and memberships |
//! | [`audit`] | Mutation audit log |

pub mod access;
pub mod audit;
pub mod chat;
pub mod documents;
pub mod error;
pub mod models;
pub mod outcome;
pub mod search;
pub mod spaces;
pub mod store;
pub mod websites;
