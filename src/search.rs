//! `lens search`: keyword search over one scope.

use anyhow::Result;

use lessonlens_core::models::Scope;
use lessonlens_core::search::search_websites;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

pub async fn run_search(
    config: &Config,
    caller: &str,
    query: &str,
    scope: Option<String>,
) -> Result<()> {
    let scope = Scope::from(scope);
    let params = config.search.params();

    let store = SqliteStore::open(config).await?;
    let hits = search_websites(&store, Some(caller), query, &scope, &params)
        .await
        .into_items();
    store.close().await;

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        println!("{}. [{}] {}", i + 1, hit.relevance_score, hit.title);
        println!("    url: {}", hit.url);
        println!("    excerpt: \"{}\"", hit.content.replace('\n', " ").trim());
        println!("    id: {}", hit.website_id);
        println!();
    }
    Ok(())
}
