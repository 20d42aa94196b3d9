//! Lorekeep LLM - Provider Abstraction
//!
//! This crate provides LLM integration for Lorekeep:
//! - Provider: the low-level `LlmProvider` trait
//! - OpenAI: multi-turn chat completions (async-openai)
//! - Anthropic: messages API with a top-level system prompt (reqwest)
//! - Adapter: provider-agnostic dialogue prompts, per-backend payload
//!   shapes and truncation signals
//! - Registry: adapters keyed by provider selector
//! - Mock: scripted provider for tests

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adapter;
pub mod anthropic;
pub mod completion;
pub mod error;
pub mod message;
pub mod mock;
pub mod openai;
pub mod provider;
pub mod registry;
pub mod util;

pub use adapter::{
    adapter_for, ChatAdapter, DialogueAdapter, DialoguePrompt, Generation, GenerationOptions,
    ProviderKind, ProviderPayload, SystemPromptAdapter,
};
pub use completion::{CompletionRequest, CompletionResponse, TokenUsage};
pub use error::{Error, Result};
pub use message::{Message, MessageRole};
pub use mock::MockProvider;
pub use provider::LlmProvider;
pub use registry::AdapterRegistry;

pub use anthropic::{AnthropicConfig, AnthropicProvider};
pub use openai::{OpenAiConfig, OpenAiProvider};
