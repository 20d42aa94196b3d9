//! Configuration loading
//!
//! Handles loading configuration from embedded defaults, files, and environment.

use super::config::AppConfig;
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};

/// Embedded default configuration (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../../config/default.toml");

/// Load configuration from files and environment
pub fn load_config() -> Result<AppConfig> {
    let env = std::env::var("LOREKEEP_ENV").unwrap_or_else(|_| "development".to_string());
    let config = Config::builder()
        // 1. Embedded defaults (always available)
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        // 2. External overrides (optional)
        .add_source(File::with_name(&format!("config/{env}")).required(false))
        .add_source(File::with_name("config/local").required(false))
        // 3. Environment variables (highest priority)
        // LOREKEEP_ENGINE__SHORT_TERM_CAP: single _ after the prefix, __ between levels
        .add_source(
            Environment::with_prefix("LOREKEEP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lorekeep_llm::ProviderKind;

    #[test]
    fn test_embedded_defaults_deserialize() {
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.database.path, "data/lorekeep.db");
        assert_eq!(config.engine.short_term_cap, 20);
        assert_eq!(config.engine.summary_max_tokens, 300);
        assert_eq!(config.engine.summarization_provider, ProviderKind::OpenAi);
        assert!(config.engine.dialogue_max_tokens.is_none());
        assert_eq!(config.llm.default_provider, "openai");
        assert!(config.prompts.dir.is_none());
    }

    #[test]
    fn test_file_source_overrides_defaults() {
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from_str(
                "[engine]\nshort_term_cap = 8\n[prompts]\ndir = \"prompts\"",
                FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.engine.short_term_cap, 8);
        assert_eq!(config.engine.important_memory_limit, 5);
        assert_eq!(config.prompts.dir.as_deref(), Some("prompts"));
    }
}
