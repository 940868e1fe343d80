//! # LessonLens
//!
//! Backend for an educator's library of scraped websites. Educators ingest
//! pages they have scraped, keep them privately or share them with a space
//! of colleagues, and run keyword search over either collection. Documents
//! and chat history live alongside the pages under the same scope rules.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────────┐   ┌──────────┐
//! │  CLI (lens)  │──▶│ lessonlens-core │──▶│  SQLite  │
//! │  HTTP (axum) │   │ access + search │   │  (sqlx)  │
//! └──────────────┘   └─────────────────┘   └──────────┘
//! ```
//!
//! Callers are identified by HMAC-signed bearer tokens over HTTP and by
//! `--as <user>` on the trusted local CLI.
//!
//! ## Quick Start
//!
//! ```bash
//! lens init
//! lens token alice
//! lens ingest --as alice page.json
//! lens search "photosynthesis" --as alice
//! lens serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`sqlite_store`] | SQLite implementation of the core `Store` trait |
//! | [`identity`] | Bearer token issue and verification |
//! | [`server`] | JSON HTTP API |
//! | [`websites`] | `ingest` / `list` / `delete` commands |
//! | [`search`] | `search` command |
//! | [`documents`] | `doc` subcommands |
//! | [`chat`] | `chat` subcommands |
//! | [`spaces`] | `space` subcommands |
//! | [`audit`] | `audit` command |

pub mod audit;
pub mod chat;
pub mod config;
pub mod db;
pub mod documents;
pub mod identity;
pub mod logging;
pub mod migrate;
pub mod search;
pub mod server;
pub mod spaces;
pub mod sqlite_store;
pub mod websites;
