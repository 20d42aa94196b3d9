//! Lorekeep Core - Dialogue Orchestration Engine
//!
//! This crate drives NPC conversations against persisted sessions:
//! - Engine: session lifecycle (start, turn, end) under per-session locks
//! - Composer: system context from world data and memory tiers, single-
//!   or multi-NPC
//! - Continuation: reassembles replies cut short by output limits
//! - Summarizer: long-term, important and relationship memories at end
//! - Templates: prompt text with named placeholders

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod composer;
pub mod config;
pub mod continuation;
pub mod engine;
pub mod error;
pub mod summarizer;
pub mod templates;

pub use composer::{Composition, CompositionPath, DialogueComposer};
pub use config::EngineConfig;
pub use continuation::ContinuationController;
pub use engine::{DialogueEngine, EndSessionOutcome};
pub use error::{Error, ErrorKind, Result};
pub use summarizer::Summarizer;
pub use templates::{PromptTemplates, TemplateKind};
