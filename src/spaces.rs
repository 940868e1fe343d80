//! `lens space ...` subcommands.

use anyhow::Result;

use lessonlens_core::spaces;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

pub async fn run_create(config: &Config, caller: &str, name: &str) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let result = spaces::create_space(&store, Some(caller), name).await;
    store.close().await;

    println!("created space: {}", result?);
    Ok(())
}

pub async fn run_invite(config: &Config, caller: &str, space_id: &str, user_id: &str) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let result = spaces::invite_member(&store, Some(caller), space_id, user_id).await;
    store.close().await;

    let invitation = result?;
    if invitation.created {
        println!("invited: {} ({})", user_id, invitation.membership.status.as_str());
    } else {
        println!(
            "already a member: {} ({})",
            user_id,
            invitation.membership.status.as_str()
        );
    }
    Ok(())
}

pub async fn run_accept(config: &Config, caller: &str, space_id: &str) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let result = spaces::accept_invitation(&store, Some(caller), space_id).await;
    store.close().await;

    result?;
    println!("joined space: {}", space_id);
    Ok(())
}

pub async fn run_remove(config: &Config, caller: &str, space_id: &str, user_id: &str) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let result = spaces::remove_member(&store, Some(caller), space_id, user_id).await;
    store.close().await;

    result?;
    println!("removed: {}", user_id);
    Ok(())
}

pub async fn run_list(config: &Config, caller: &str) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let listed = spaces::list_spaces(&store, Some(caller)).await.into_items();
    store.close().await;

    if listed.is_empty() {
        println!("No spaces.");
        return Ok(());
    }
    for space in &listed {
        println!("{}  {}  (owner: {})", space.id, space.name, space.owner_id);
    }
    Ok(())
}

pub async fn run_members(config: &Config, caller: &str, space_id: &str) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let members = spaces::list_members(&store, Some(caller), space_id)
        .await
        .into_items();
    store.close().await;

    if members.is_empty() {
        println!("No members.");
        return Ok(());
    }
    for m in &members {
        println!("{}  {}  (invited by {})", m.user_id, m.status.as_str(), m.invited_by);
    }
    Ok(())
}
