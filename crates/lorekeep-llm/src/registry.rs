//! Adapter registry
//!
//! Maps each configured [`ProviderKind`] to its adapter. Built once at
//! startup and shared read-only.

use crate::adapter::{adapter_for, DialogueAdapter, ProviderKind};
use crate::anthropic::AnthropicProvider;
use crate::error::{Error, Result};
use crate::openai::OpenAiProvider;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Configured adapters keyed by backend.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<ProviderKind, Arc<dyn DialogueAdapter>>,
}

impl AdapterRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every provider whose credentials are present in the environment.
    #[must_use]
    pub fn from_env() -> Self {
        let mut registry = Self::new();

        match OpenAiProvider::from_env() {
            Ok(p) => registry.register(adapter_for(ProviderKind::OpenAi, Arc::new(p))),
            Err(e) => warn!(error = %e, "OpenAI provider unavailable"),
        }

        match AnthropicProvider::from_env() {
            Ok(p) => registry.register(adapter_for(ProviderKind::Anthropic, Arc::new(p))),
            Err(e) => warn!(error = %e, "Anthropic provider unavailable"),
        }

        registry
    }

    /// Add or replace the adapter for its backend.
    pub fn register(&mut self, adapter: Arc<dyn DialogueAdapter>) {
        info!(provider = %adapter.kind(), "registered dialogue adapter");
        self.adapters.insert(adapter.kind(), adapter);
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, adapter: Arc<dyn DialogueAdapter>) -> Self {
        self.register(adapter);
        self
    }

    /// Adapter for a backend.
    ///
    /// # Errors
    /// `NotConfigured` when the backend was never registered.
    pub fn get(&self, kind: ProviderKind) -> Result<Arc<dyn DialogueAdapter>> {
        self.adapters
            .get(&kind)
            .cloned()
            .ok_or_else(|| Error::NotConfigured(kind.to_string()))
    }

    /// Registered backends.
    #[must_use]
    pub fn kinds(&self) -> Vec<ProviderKind> {
        self.adapters.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockProvider;

    #[test]
    fn test_get_registered_and_missing() {
        let registry = AdapterRegistry::new()
            .with(adapter_for(ProviderKind::OpenAi, Arc::new(MockProvider::new())));

        assert_eq!(registry.get(ProviderKind::OpenAi).unwrap().kind(), ProviderKind::OpenAi);
        assert!(matches!(
            registry.get(ProviderKind::Anthropic),
            Err(Error::NotConfigured(_))
        ));
        assert_eq!(registry.kinds(), vec![ProviderKind::OpenAi]);
    }
}
