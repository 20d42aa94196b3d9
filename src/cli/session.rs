//! Session commands

use crate::app;
use anyhow::{Context, Result};

/// `lorekeep start`
pub async fn start(
    universe: &str,
    npcs: &[String],
    player: &str,
    event: Option<&str>,
) -> Result<()> {
    let config = app::load_config()?;
    let engine = app::build_engine(&config).await?;
    let session_id = engine
        .start_session(universe, npcs, player, event)
        .await
        .context("Failed to start session")?;
    println!("{session_id}");
    Ok(())
}

/// `lorekeep say`
pub async fn say(session_id: &str, text: &str, provider: Option<&str>) -> Result<()> {
    let config = app::load_config()?;
    let selector = provider.unwrap_or(&config.llm.default_provider).to_string();
    let engine = app::build_engine(&config).await?;
    let reply = engine
        .generate_turn(session_id, text, &selector)
        .await
        .with_context(|| format!("Turn failed for session {session_id}"))?;
    println!("{reply}");
    Ok(())
}

/// `lorekeep end`
pub async fn end(session_id: &str) -> Result<()> {
    let config = app::load_config()?;
    let engine = app::build_engine(&config).await?;
    let outcome = engine
        .end_session(session_id)
        .await
        .with_context(|| format!("Failed to end session {session_id}"))?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

/// `lorekeep show`
pub async fn show(session_id: &str) -> Result<()> {
    let config = app::load_config()?;
    let engine = app::build_engine(&config).await?;
    let session = engine.session(session_id).await?;
    println!("{}", serde_json::to_string_pretty(&session)?);
    Ok(())
}
