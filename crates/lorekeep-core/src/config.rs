//! Engine configuration

use lorekeep_llm::{GenerationOptions, ProviderKind};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables of the dialogue engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Short-term memory cap, in entries
    pub short_term_cap: usize,
    /// Important memories injected per scope
    pub important_memory_limit: usize,
    /// Ended sessions feeding the relationship summary
    pub summary_window: usize,
    /// Continuation rounds before a reply is given up on
    pub max_continuation_rounds: u32,
    /// Per-call provider timeout
    pub provider_timeout_secs: u64,
    /// Backend used for end-of-session summarization
    pub summarization_provider: ProviderKind,
    /// Output budget for dialogue turns (provider default when unset)
    pub dialogue_max_tokens: Option<u32>,
    /// Sampling temperature for dialogue turns
    pub dialogue_temperature: f32,
    /// Output budget for the long-term summary
    pub summary_max_tokens: u32,
    /// Output budget for important-memory extraction
    pub important_max_tokens: u32,
    /// Sampling temperature for summarization calls
    pub summary_temperature: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            short_term_cap: lorekeep_memory::DEFAULT_SHORT_TERM_CAP,
            important_memory_limit: 5,
            summary_window: 5,
            max_continuation_rounds: 8,
            provider_timeout_secs: 60,
            summarization_provider: ProviderKind::OpenAi,
            dialogue_max_tokens: None,
            dialogue_temperature: 0.7,
            summary_max_tokens: 300,
            important_max_tokens: 150,
            summary_temperature: 0.5,
        }
    }
}

impl EngineConfig {
    /// Provider call timeout.
    #[must_use]
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub(crate) fn dialogue_options(&self) -> GenerationOptions {
        GenerationOptions {
            model: None,
            max_tokens: self.dialogue_max_tokens,
            temperature: Some(self.dialogue_temperature),
        }
    }

    pub(crate) fn summary_options(&self) -> GenerationOptions {
        GenerationOptions {
            model: None,
            max_tokens: Some(self.summary_max_tokens),
            temperature: Some(self.summary_temperature),
        }
    }

    pub(crate) fn important_options(&self) -> GenerationOptions {
        GenerationOptions {
            model: None,
            max_tokens: Some(self.important_max_tokens),
            temperature: Some(self.summary_temperature),
        }
    }
}
