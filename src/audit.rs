//! `lens audit`: print the audit trail for a scope.

use anyhow::Result;

use lessonlens_core::audit::list_audit_logs;
use lessonlens_core::models::Scope;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

pub async fn run_audit(config: &Config, caller: &str, scope: Option<String>) -> Result<()> {
    let scope = Scope::from(scope);
    let store = SqliteStore::open(config).await?;
    let entries = list_audit_logs(&store, Some(caller), &scope).await.into_items();
    store.close().await;

    if entries.is_empty() {
        println!("No audit entries.");
        return Ok(());
    }

    for entry in &entries {
        let at = chrono::DateTime::from_timestamp_millis(entry.created_at)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        print!("{}  {}  {}  {}", at, entry.actor_id, entry.action.as_str(), entry.target_id);
        if !entry.detail.is_empty() {
            print!("  \"{}\"", entry.detail);
        }
        println!();
    }
    Ok(())
}
