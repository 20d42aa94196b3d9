//! Application wiring
//!
//! Loads configuration and assembles the store, provider registry and
//! dialogue engine from it.

pub mod config;
pub mod loader;

use anyhow::{Context, Result};
use lorekeep_core::{DialogueEngine, PromptTemplates};
use lorekeep_llm::AdapterRegistry;
use lorekeep_memory::{DialogueStore, WorldCatalog};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub use config::AppConfig;
pub use loader::load_config;

/// Open the configured store.
pub async fn open_store(config: &AppConfig) -> Result<DialogueStore> {
    DialogueStore::from_path(Path::new(&config.database.path))
        .await
        .with_context(|| format!("Failed to open database at {}", config.database.path))
}

/// Build the engine from configuration and environment credentials.
pub async fn build_engine(config: &AppConfig) -> Result<DialogueEngine> {
    let store = open_store(config).await?;
    let catalog: Arc<dyn WorldCatalog> = Arc::new(store.clone());

    let adapters = AdapterRegistry::from_env();
    if adapters.kinds().is_empty() {
        warn!("No LLM provider credentials found; turns and summaries will fail");
    }

    let templates = match &config.prompts.dir {
        Some(dir) => PromptTemplates::from_dir(Path::new(dir))
            .with_context(|| format!("Failed to load prompt templates from {dir}"))?,
        None => PromptTemplates::builtin(),
    };

    info!(database = %config.database.path, "Building dialogue engine");
    Ok(DialogueEngine::new(
        store,
        catalog,
        adapters,
        templates,
        config.engine.clone(),
    ))
}
