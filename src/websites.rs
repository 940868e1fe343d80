//! `lens ingest`, `lens list`, and `lens delete`.
//!
//! Thin CLI wrappers over [`lessonlens_core::websites`] that open the
//! configured SQLite store and print human-readable output.

use anyhow::{Context, Result};
use std::path::Path;

use lessonlens_core::models::{NewWebsite, Scope};
use lessonlens_core::websites;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Read a scraped-website JSON file and ingest it as `caller`.
///
/// `scope` overrides any `scopeId` present in the file.
pub async fn run_ingest(
    config: &Config,
    caller: &str,
    path: &Path,
    scope: Option<String>,
) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut input: NewWebsite = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid website JSON in {}", path.display()))?;
    if scope.is_some() {
        input.scope = Scope::from(scope);
    }

    let store = SqliteStore::open(config).await?;
    let result = websites::ingest_website(&store, Some(caller), input).await;
    store.close().await;

    let id = result?;
    println!("ingested: {}", id);
    Ok(())
}

pub async fn run_list(config: &Config, caller: &str, scope: Option<String>) -> Result<()> {
    let scope = Scope::from(scope);
    let store = SqliteStore::open(config).await?;
    let listed = websites::list_websites(&store, Some(caller), &scope).await;
    store.close().await;

    let items = listed.into_items();
    if items.is_empty() {
        println!("No websites.");
        return Ok(());
    }

    for (i, site) in items.iter().enumerate() {
        let added = chrono::DateTime::from_timestamp_millis(site.created_at)
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!("{}. {}", i + 1, site.title);
        println!("    url: {}", site.url);
        println!("    scope: {}", site.scope);
        println!("    chunks: {}", site.chunks.len());
        println!("    added: {}", added);
        println!("    id: {}", site.id);
        println!();
    }
    Ok(())
}

pub async fn run_delete(config: &Config, caller: &str, id: &str) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let result = websites::delete_website(&store, Some(caller), id).await;
    store.close().await;

    result?;
    println!("deleted: {}", id);
    Ok(())
}
