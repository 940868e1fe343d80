//! `lens doc` subcommands.

use anyhow::{bail, Context, Result};
use std::path::Path;

use lessonlens_core::documents;
use lessonlens_core::models::{NewDocument, Scope};

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Store the text of `path` as a document titled `title`.
pub async fn run_add(
    config: &Config,
    caller: &str,
    title: &str,
    path: &Path,
    scope: Option<String>,
) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let input = NewDocument {
        title: title.to_string(),
        content,
        scope: Scope::from(scope),
    };

    let store = SqliteStore::open(config).await?;
    let result = documents::create_document(&store, Some(caller), input).await;
    store.close().await;

    let id = result?;
    println!("created document: {}", id);
    Ok(())
}

pub async fn run_list(config: &Config, caller: &str, scope: Option<String>) -> Result<()> {
    let scope = Scope::from(scope);
    let store = SqliteStore::open(config).await?;
    let listed = documents::list_documents(&store, Some(caller), &scope).await;
    store.close().await;

    let items = listed.into_items();
    if items.is_empty() {
        println!("No documents.");
        return Ok(());
    }
    for doc in &items {
        println!("{}  {}  ({} chars)", doc.id, doc.title, doc.content.chars().count());
    }
    Ok(())
}

pub async fn run_show(config: &Config, caller: &str, id: &str) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let found = documents::get_document(&store, Some(caller), id).await;
    store.close().await;

    let Some(doc) = found else {
        bail!("document not found: {}", id);
    };
    println!("{}", doc.title);
    println!("scope: {}", doc.scope);
    println!();
    println!("{}", doc.content);
    Ok(())
}

pub async fn run_delete(config: &Config, caller: &str, id: &str) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let result = documents::delete_document(&store, Some(caller), id).await;
    store.close().await;

    result?;
    println!("deleted document: {}", id);
    Ok(())
}
