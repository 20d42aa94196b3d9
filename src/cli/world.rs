//! World data import
//!
//! `lorekeep seed <world.json>` writes universes, NPC profiles and scripted
//! events into the store.

use crate::app;
use anyhow::{Context, Result};
use lorekeep_memory::WorldFile;

/// Import a world file.
pub async fn seed(path: &str) -> Result<()> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {path}"))?;
    let world: WorldFile =
        serde_json::from_str(&raw).with_context(|| format!("Invalid world file {path}"))?;

    let config = app::load_config()?;
    let store = app::open_store(&config).await?;
    let summary = store
        .import_world(&world)
        .await
        .context("Failed to import world")?;

    println!(
        "Imported {} universe(s), {} NPC(s), {} event(s)",
        summary.universes, summary.npcs, summary.events
    );
    Ok(())
}
