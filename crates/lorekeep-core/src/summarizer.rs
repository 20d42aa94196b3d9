//! End-of-session summarization
//!
//! Three provider calls, each a single user message rendered from a
//! template: the long-term narrative summary, the important-event
//! extraction and the rolling relationship sentence.

use crate::continuation::ContinuationController;
use crate::error::Result;
use crate::templates::{PromptTemplates, TemplateKind};
use lorekeep_llm::{DialogueAdapter, DialoguePrompt, GenerationOptions};
use lorekeep_memory::ShortTermMemory;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Provider-facing answer meaning "nothing significant happened".
const NO_IMPORTANT_EVENT: &str = "false";

/// Runs the summarization prompts against one adapter.
pub struct Summarizer {
    adapter: Arc<dyn DialogueAdapter>,
    templates: Arc<PromptTemplates>,
    controller: ContinuationController,
    summary_options: GenerationOptions,
    important_options: GenerationOptions,
}

impl Summarizer {
    /// Create a summarizer.
    pub fn new(
        adapter: Arc<dyn DialogueAdapter>,
        templates: Arc<PromptTemplates>,
        controller: ContinuationController,
        summary_options: GenerationOptions,
        important_options: GenerationOptions,
    ) -> Self {
        Self {
            adapter,
            templates,
            controller,
            summary_options,
            important_options,
        }
    }

    /// Narrative summary of a finished transcript.
    pub async fn long_term_memory(&self, transcript: &ShortTermMemory) -> Result<String> {
        let prompt = self.render(
            TemplateKind::LongMemorySummary,
            "conversation_history",
            transcript.transcript(),
        );
        let summary = self.ask(prompt, self.summary_options.clone()).await?;
        debug!(chars = summary.len(), "long-term memory generated");
        Ok(summary)
    }

    /// One-sentence important event, or `None` when nothing significant happened.
    pub async fn important_memory(&self, transcript: &ShortTermMemory) -> Result<Option<String>> {
        let prompt = self.render(
            TemplateKind::ImportantMemoryExtract,
            "conversation_history",
            transcript.transcript(),
        );
        let answer = self.ask(prompt, self.important_options.clone()).await?;
        let extracted = parse_important(&answer);
        debug!(extracted = extracted.is_some(), "important memory extraction finished");
        Ok(extracted)
    }

    /// Relationship sentence from recent long-term memories, most recent first.
    pub async fn relationship_summary(&self, long_memories: &[String]) -> Result<String> {
        let listed = long_memories
            .iter()
            .enumerate()
            .map(|(i, m)| format!("{}. {m}", i + 1))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = self.render(TemplateKind::RelationshipSummary, "long_memories", listed);
        self.ask(prompt, self.important_options.clone()).await
    }

    fn render(&self, kind: TemplateKind, slot: &'static str, value: String) -> String {
        self.templates.render(kind, &HashMap::from([(slot, value)]))
    }

    async fn ask(&self, prompt: String, options: GenerationOptions) -> Result<String> {
        let prompt = DialoguePrompt::new(String::new(), Vec::new(), prompt).with_options(options);
        let text = self.controller.generate(self.adapter.as_ref(), &prompt).await?;
        Ok(text.trim().to_string())
    }
}

/// Map the provider's answer to an optional memory.
///
/// `false`, in any case, optionally quoted or followed by a period, and an
/// empty answer both mean no record.
fn parse_important(answer: &str) -> Option<String> {
    let trimmed = answer.trim();
    let bare = trimmed
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim_end_matches('.')
        .trim();
    if bare.is_empty() || bare.eq_ignore_ascii_case(NO_IMPORTANT_EVENT) {
        None
    } else {
        Some(trimmed.to_string())
    }
}
