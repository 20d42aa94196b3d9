//! Prompt templates
//!
//! Templates are opaque text with `{placeholder}` slots. Built-in defaults
//! are compiled in; a directory may override them file by file.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info};

const DIALOGUE: &str = r#"You are {npc_name}, a character in the world of {universe_name}.
Stay in character at all times and answer as {npc_name} would, in one or a few short paragraphs.

## World
{universe_description}

Lore: {universe_lore}
Rules: {universe_rules}

## You
Name: {npc_name}
Race: {npc_race}
Species: {npc_species}
Gender: {npc_gender}
Background: {npc_bio}

## Your history with this player
Relationship: {summary_memory}
Things you remember:
{important_memories}

Never mention that you are an AI model. Do not narrate the player's actions."#;

const GROUP_DIALOGUE: &str = r#"You are narrating a scene in the world of {universe_name} with several characters present.
Reply with the lines of whichever characters would naturally respond, each prefixed by the speaker's name ("Name: ...").

## World
{universe_description}

Lore: {universe_lore}
Rules: {universe_rules}

## Characters
{npc_profiles}

## Scene goal
{event_goal}
Goal is reached when: {event_trigger}

Keep every character consistent with their profile and history. Never speak for the player."#;

const LONG_MEMORY_SUMMARY: &str = r#"Summarize the following conversation between a player and an NPC in a short narrative paragraph.
Focus on what happened and how the relationship between them changed.

{conversation_history}"#;

const IMPORTANT_MEMORY_EXTRACT: &str = r#"Read the following conversation between a player and an NPC.
If a significant event or a change in their relationship occurred, describe it in one sentence.
If nothing significant happened, answer with exactly: false

{conversation_history}"#;

const RELATIONSHIP_SUMMARY: &str = r#"Here are summaries of past conversations between a player and an NPC, most recent first:

{long_memories}

In one sentence, describe the NPC's current feelings and relationship toward the player."#;

/// Which prompt a template fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    /// Single-NPC system context
    Dialogue,
    /// Multi-NPC system context
    GroupDialogue,
    /// End-of-session narrative summary
    LongMemorySummary,
    /// End-of-session important-event extraction
    ImportantMemoryExtract,
    /// Rolling relationship sentence
    RelationshipSummary,
}

impl TemplateKind {
    /// All kinds.
    pub const ALL: [TemplateKind; 5] = [
        TemplateKind::Dialogue,
        TemplateKind::GroupDialogue,
        TemplateKind::LongMemorySummary,
        TemplateKind::ImportantMemoryExtract,
        TemplateKind::RelationshipSummary,
    ];

    /// Override file name.
    #[must_use]
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Dialogue => "dialogue.txt",
            Self::GroupDialogue => "group_dialogue.txt",
            Self::LongMemorySummary => "long_memory_summary.txt",
            Self::ImportantMemoryExtract => "important_memory_extract.txt",
            Self::RelationshipSummary => "relationship_summary.txt",
        }
    }

    fn builtin(&self) -> &'static str {
        match self {
            Self::Dialogue => DIALOGUE,
            Self::GroupDialogue => GROUP_DIALOGUE,
            Self::LongMemorySummary => LONG_MEMORY_SUMMARY,
            Self::ImportantMemoryExtract => IMPORTANT_MEMORY_EXTRACT,
            Self::RelationshipSummary => RELATIONSHIP_SUMMARY,
        }
    }
}

/// The full template set.
#[derive(Debug, Clone, Default)]
pub struct PromptTemplates {
    overrides: HashMap<TemplateKind, String>,
}

impl PromptTemplates {
    /// Built-in templates only.
    #[must_use]
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Built-ins, overridden by any template file present in `dir`.
    pub fn from_dir(dir: &Path) -> std::io::Result<Self> {
        let mut templates = Self::default();
        for kind in TemplateKind::ALL {
            let path = dir.join(kind.file_name());
            if path.is_file() {
                templates.overrides.insert(kind, std::fs::read_to_string(&path)?);
                info!(path = %path.display(), "prompt template override loaded");
            }
        }
        Ok(templates)
    }

    /// Replace one template.
    #[must_use]
    pub fn with_template(mut self, kind: TemplateKind, text: impl Into<String>) -> Self {
        self.overrides.insert(kind, text.into());
        self
    }

    /// Raw template text.
    #[must_use]
    pub fn get(&self, kind: TemplateKind) -> &str {
        self.overrides
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| kind.builtin())
    }

    /// Fill a template's placeholders.
    #[must_use]
    pub fn render(&self, kind: TemplateKind, vars: &HashMap<&str, String>) -> String {
        debug!(template = kind.file_name(), vars = vars.len(), "rendering template");
        render(self.get(kind), vars)
    }
}

static PLACEHOLDER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([a-z_]+)\}").expect("PLACEHOLDER_REGEX is a compile-time constant")
});

/// Replace `{name}` slots with values from `vars`; unknown slots stay verbatim.
#[must_use]
pub fn render(template: &str, vars: &HashMap<&str, String>) -> String {
    PLACEHOLDER_REGEX
        .replace_all(template, |caps: &Captures<'_>| {
            vars.get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&'static str, &str)]) -> HashMap<&'static str, String> {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn test_render_fills_known_and_keeps_unknown() {
        let out = render(
            "Hi {npc_name}, {unknown_slot} {npc_name}!",
            &vars(&[("npc_name", "Mira")]),
        );
        assert_eq!(out, "Hi Mira, {unknown_slot} Mira!");
    }

    #[test]
    fn test_render_does_not_rescan_values() {
        let out = render("{a}", &vars(&[("a", "{b}"), ("b", "x")]));
        assert_eq!(out, "{b}");
    }

    #[test]
    fn test_builtin_dialogue_has_contract_slots() {
        let t = PromptTemplates::builtin();
        let text = t.get(TemplateKind::Dialogue);
        for slot in [
            "universe_name",
            "universe_lore",
            "npc_name",
            "npc_bio",
            "summary_memory",
            "important_memories",
        ] {
            assert!(text.contains(&format!("{{{slot}}}")), "missing {slot}");
        }
        assert!(t.get(TemplateKind::GroupDialogue).contains("{npc_profiles}"));
        assert!(t.get(TemplateKind::ImportantMemoryExtract).contains("false"));
    }

    #[test]
    fn test_override_replaces_single_template() {
        let t = PromptTemplates::builtin()
            .with_template(TemplateKind::LongMemorySummary, "Sum: {conversation_history}");
        let out = t.render(
            TemplateKind::LongMemorySummary,
            &vars(&[("conversation_history", "Player: Hi")]),
        );
        assert_eq!(out, "Sum: Player: Hi");
        assert!(t.get(TemplateKind::Dialogue).contains("{npc_name}"));
    }
}
