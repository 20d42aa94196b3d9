//! Dialogue adapters
//!
//! Callers describe a dialogue turn once, as a [`DialoguePrompt`]: system
//! text, prior turns, the new player utterance, and (while continuing a
//! truncated reply) the assistant text produced so far. Each adapter turns
//! that into its own wire shape and reports truncation in its own dialect:
//!
//! | Adapter | Shape | Truncation signal |
//! |---------|-------|-------------------|
//! | [`ChatAdapter`] | system-role message + turns | `finish_reason == "length"` |
//! | [`SystemPromptAdapter`] | top-level system field + alternating turns | `stop_reason == "max_tokens"` |

use crate::completion::CompletionRequest;
use crate::error::{Error, Result};
use crate::message::{Message, MessageRole};
use crate::provider::LlmProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Placeholder user turn for single-turn backends that reject a leading
/// assistant message.
const OPENING_USER_TURN: &str = "(The conversation begins.)";

/// Supported generation backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Multi-turn chat API
    OpenAi,
    /// System-prompt messages API
    Anthropic,
}

impl ProviderKind {
    /// Selector string
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            other => Err(Error::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Sampling knobs carried alongside a prompt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationOptions {
    /// Model override (None = provider default)
    pub model: Option<String>,
    /// Output token budget
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    pub temperature: Option<f32>,
}

/// Provider-agnostic description of one generation.
#[derive(Debug, Clone, Default)]
pub struct DialoguePrompt {
    /// System context (may be empty)
    pub system: String,
    /// Prior turns, oldest first
    pub turns: Vec<Message>,
    /// The new user utterance
    pub utterance: String,
    /// Assistant text already produced for this utterance
    pub partial: Option<String>,
    /// Sampling options
    pub options: GenerationOptions,
}

impl DialoguePrompt {
    /// Create a prompt.
    #[must_use]
    pub fn new(system: impl Into<String>, turns: Vec<Message>, utterance: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            turns,
            utterance: utterance.into(),
            partial: None,
            options: GenerationOptions::default(),
        }
    }

    /// Set sampling options.
    #[must_use]
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the assistant text produced so far.
    #[must_use]
    pub fn with_partial(mut self, partial: impl Into<String>) -> Self {
        self.partial = Some(partial.into());
        self
    }

    /// Turns followed by the utterance and, if any, the partial reply.
    fn transcript(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.turns.len() + 2);
        messages.extend(self.turns.iter().cloned());
        messages.push(Message::user(self.utterance.clone()));
        if let Some(partial) = self.partial.as_ref().filter(|p| !p.is_empty()) {
            messages.push(Message::assistant(partial.clone()));
        }
        messages
    }
}

/// Wire-ready request, one variant per backend shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderPayload {
    /// Everything, system included, is a message.
    Chat {
        /// Ordered messages
        messages: Vec<Message>,
        /// Sampling options
        options: GenerationOptions,
    },
    /// System text travels out of band; messages alternate user/assistant.
    SingleTurn {
        /// Top-level system field
        system: Option<String>,
        /// Ordered, alternating messages
        messages: Vec<Message>,
        /// Sampling options
        options: GenerationOptions,
    },
}

impl ProviderPayload {
    /// Messages in send order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        match self {
            Self::Chat { messages, .. } | Self::SingleTurn { messages, .. } => messages,
        }
    }

    fn to_request(&self) -> CompletionRequest {
        let (system, messages, options) = match self {
            Self::Chat { messages, options } => (None, messages, options),
            Self::SingleTurn {
                system,
                messages,
                options,
            } => (system.clone(), messages, options),
        };
        CompletionRequest {
            model: options.model.clone().unwrap_or_default(),
            system,
            messages: messages.clone(),
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            stop: None,
        }
    }
}

/// Result of one provider invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    /// Generated text
    pub text: String,
    /// The provider stopped on its output-length limit
    pub truncated: bool,
}

/// Capability interface over a generation backend.
#[async_trait::async_trait]
pub trait DialogueAdapter: Send + Sync {
    /// Backend this adapter speaks to
    fn kind(&self) -> ProviderKind;

    /// Build the backend-specific payload.
    fn compose(&self, prompt: &DialoguePrompt) -> ProviderPayload;

    /// Send a payload and report whether the reply was cut short.
    async fn invoke(&self, payload: &ProviderPayload) -> Result<Generation>;
}

/// Adapter for multi-turn chat backends.
pub struct ChatAdapter {
    provider: Arc<dyn LlmProvider>,
}

impl ChatAdapter {
    /// Wrap a chat provider.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait::async_trait]
impl DialogueAdapter for ChatAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn compose(&self, prompt: &DialoguePrompt) -> ProviderPayload {
        let mut messages = Vec::with_capacity(prompt.turns.len() + 3);
        if !prompt.system.is_empty() {
            messages.push(Message::system(prompt.system.clone()));
        }
        messages.extend(prompt.transcript());
        ProviderPayload::Chat {
            messages,
            options: prompt.options.clone(),
        }
    }

    async fn invoke(&self, payload: &ProviderPayload) -> Result<Generation> {
        let response = self.provider.complete(payload.to_request()).await?;
        let truncated = response
            .finish_reason
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case("length"));
        debug!(provider = self.provider.name(), truncated, "chat generation finished");
        Ok(Generation {
            text: response.content,
            truncated,
        })
    }
}

/// Adapter for backends that take the system prompt as a request field.
pub struct SystemPromptAdapter {
    provider: Arc<dyn LlmProvider>,
}

impl SystemPromptAdapter {
    /// Wrap a system-prompt provider.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    /// Merge same-role neighbours and make sure the list opens with a user turn.
    fn alternate(messages: Vec<Message>) -> Vec<Message> {
        let mut out: Vec<Message> = Vec::with_capacity(messages.len() + 1);
        for msg in messages {
            match out.last_mut() {
                Some(last) if last.role == msg.role => {
                    last.content.push('\n');
                    last.content.push_str(&msg.content);
                }
                _ => out.push(msg),
            }
        }
        if out.first().is_some_and(|m| m.role == MessageRole::Assistant) {
            out.insert(0, Message::user(OPENING_USER_TURN));
        }
        out
    }
}

#[async_trait::async_trait]
impl DialogueAdapter for SystemPromptAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn compose(&self, prompt: &DialoguePrompt) -> ProviderPayload {
        let turns = prompt
            .transcript()
            .into_iter()
            .filter(|m| m.role != MessageRole::System)
            .collect();
        ProviderPayload::SingleTurn {
            system: Some(prompt.system.clone()).filter(|s| !s.is_empty()),
            messages: Self::alternate(turns),
            options: prompt.options.clone(),
        }
    }

    async fn invoke(&self, payload: &ProviderPayload) -> Result<Generation> {
        let response = self.provider.complete(payload.to_request()).await?;
        let truncated = response
            .finish_reason
            .as_deref()
            .is_some_and(|r| r == "max_tokens");
        debug!(provider = self.provider.name(), truncated, "single-turn generation finished");
        Ok(Generation {
            text: response.content,
            truncated,
        })
    }
}

/// Wrap a provider in the adapter matching its backend shape.
#[must_use]
pub fn adapter_for(kind: ProviderKind, provider: Arc<dyn LlmProvider>) -> Arc<dyn DialogueAdapter> {
    match kind {
        ProviderKind::OpenAi => Arc::new(ChatAdapter::new(provider)),
        ProviderKind::Anthropic => Arc::new(SystemPromptAdapter::new(provider)),
    }
}
