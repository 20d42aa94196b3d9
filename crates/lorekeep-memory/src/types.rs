//! Core data types for sessions and memory tiers.
//!
//! Every long-lived tier is keyed by a [`Scope`]: the (universe, NPC, player)
//! triple. Sessions own the short-term tier directly.

use chrono::{DateTime, Utc};
use lorekeep_llm::Message;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default short-term memory cap (entries, not exchanges).
pub const DEFAULT_SHORT_TERM_CAP: usize = 20;

/// Key for the important / summary tiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    /// Universe ID
    pub universe_id: String,
    /// NPC ID
    pub npc_id: String,
    /// Player ID
    pub player_id: String,
}

impl Scope {
    /// Build a scope.
    #[must_use]
    pub fn new(
        universe_id: impl Into<String>,
        npc_id: impl Into<String>,
        player_id: impl Into<String>,
    ) -> Self {
        Self {
            universe_id: universe_id.into(),
            npc_id: npc_id.into(),
            player_id: player_id.into(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.universe_id, self.npc_id, self.player_id)
    }
}

/// Role of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// Player utterance
    User,
    /// NPC reply
    Assistant,
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One role-tagged utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Who spoke
    pub role: TurnRole,
    /// What was said
    pub content: String,
}

impl Turn {
    /// Player turn.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    /// NPC turn.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }

    /// Transcript line for this turn, see [`display_line`].
    #[must_use]
    pub fn display_line(&self) -> String {
        display_line(self.role, &self.content)
    }

    /// Convert into an LLM message.
    #[must_use]
    pub fn to_message(&self) -> Message {
        match self.role {
            TurnRole::User => Message::user(&self.content),
            TurnRole::Assistant => Message::assistant(&self.content),
        }
    }
}

/// Render one transcript line: `Player: ...` or `NPC: ...`.
///
/// Shared by the summarizer prompts and continuation tracing so both see the
/// same rendering.
#[must_use]
pub fn display_line(role: TurnRole, content: &str) -> String {
    let speaker = match role {
        TurnRole::User => "Player",
        TurnRole::Assistant => "NPC",
    };
    format!("{speaker}: {content}")
}

/// Bounded FIFO transcript of the current session.
///
/// Serialized as a plain JSON array of `{role, content}` objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortTermMemory {
    turns: Vec<Turn>,
}

impl ShortTermMemory {
    /// Empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap existing turns (no cap applied).
    #[must_use]
    pub fn from_turns(turns: Vec<Turn>) -> Self {
        Self { turns }
    }

    /// Append a turn, then evict the oldest entries beyond `cap`.
    pub fn push(&mut self, turn: Turn, cap: usize) {
        self.turns.push(turn);
        self.enforce_cap(cap);
    }

    /// Append several turns in order, then evict beyond `cap`.
    pub fn extend(&mut self, turns: impl IntoIterator<Item = Turn>, cap: usize) {
        self.turns.extend(turns);
        self.enforce_cap(cap);
    }

    fn enforce_cap(&mut self, cap: usize) {
        if self.turns.len() > cap {
            let excess = self.turns.len() - cap;
            self.turns.drain(..excess);
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// No entries yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Entries, oldest first.
    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Entries as LLM messages.
    #[must_use]
    pub fn to_messages(&self) -> Vec<Message> {
        self.turns.iter().map(Turn::to_message).collect()
    }

    /// Newline-joined display lines.
    #[must_use]
    pub fn transcript(&self) -> String {
        self.turns
            .iter()
            .map(Turn::display_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Session lifecycle state. Only `Active -> Ended` is legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Accepting turns
    Active,
    /// Terminal
    Ended,
}

impl SessionStatus {
    /// Column value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Ended => "ended",
        }
    }

    /// Parse a column value; unknown text is treated as ended.
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            _ => Self::Ended,
        }
    }
}

/// A persisted roleplay session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session ID (UUID)
    pub id: String,
    /// Universe the dialogue happens in
    pub universe_id: String,
    /// Participating NPCs, in the order they were given
    pub npc_ids: Vec<String>,
    /// Player ID
    pub player_id: String,
    /// Lifecycle state
    pub status: SessionStatus,
    /// Rolling transcript
    pub short_term: ShortTermMemory,
    /// Linked scripted event
    pub event_id: Option<String>,
    /// Narrative summary attached at end
    pub long_term_memory: Option<String>,
    /// Optimistic-concurrency counter, bumped on every write
    pub revision: i64,
    /// When the session started
    pub created_at: DateTime<Utc>,
    /// When the session ended
    pub ended_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Whether turns are accepted.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Scope for one participating NPC.
    #[must_use]
    pub fn scope_for(&self, npc_id: &str) -> Scope {
        Scope::new(&self.universe_id, npc_id, &self.player_id)
    }

    /// Scopes of every participating NPC.
    #[must_use]
    pub fn scopes(&self) -> Vec<Scope> {
        self.npc_ids.iter().map(|n| self.scope_for(n)).collect()
    }
}

/// Input for creating a session.
#[derive(Debug, Clone)]
pub struct NewSession {
    /// Universe ID
    pub universe_id: String,
    /// One or more NPC IDs
    pub npc_ids: Vec<String>,
    /// Player ID
    pub player_id: String,
    /// Linked scripted event
    pub event_id: Option<String>,
}

/// A durable fact extracted at session end. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportantMemory {
    /// Row ID (UUID)
    pub id: String,
    /// Owning scope
    pub scope: Scope,
    /// One-sentence description
    pub content: String,
    /// When it was recorded
    pub created_at: DateTime<Utc>,
}

/// Standing relationship/mood sentence, one per scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryMemory {
    /// Owning scope
    pub scope: Scope,
    /// Summary sentence
    pub content: String,
    /// Last overwrite
    pub updated_at: DateTime<Utc>,
}

/// Who speaks a scripted step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpeakerType {
    /// The player
    Player,
    /// An NPC, identified by the step's speaker ID
    Npc,
    /// Narration or a bystander
    Other,
}

impl SpeakerType {
    /// Column value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Player => "PLAYER",
            Self::Npc => "NPC",
            Self::Other => "OTHER",
        }
    }

    /// Parse a column value; unknown text is treated as `Other`.
    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "PLAYER" => Self::Player,
            "NPC" => Self::Npc,
            _ => Self::Other,
        }
    }
}

/// One line of an authored event script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedEventStep {
    /// Speaker kind
    pub speaker_type: SpeakerType,
    /// NPC ID when `speaker_type` is `Npc`
    #[serde(default)]
    pub speaker_id: Option<String>,
    /// Line text
    pub message: String,
}

/// An authored event: ordered steps plus an optional goal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedEvent {
    /// Event ID
    pub id: String,
    /// Steps in authored order
    #[serde(default)]
    pub steps: Vec<ScriptedEventStep>,
    /// What the event is driving toward
    #[serde(default)]
    pub goal_description: Option<String>,
    /// What completes the goal
    #[serde(default)]
    pub goal_trigger: Option<String>,
}

/// Static NPC profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpcProfile {
    /// NPC ID
    pub id: String,
    /// Display name
    pub name: String,
    /// Biography
    #[serde(default)]
    pub bio: String,
    /// Race
    #[serde(default)]
    pub race: String,
    /// Gender
    #[serde(default)]
    pub gender: String,
    /// Species
    #[serde(default)]
    pub species: String,
}

/// Static universe settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniverseSettings {
    /// Universe ID
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Short description
    #[serde(default)]
    pub description: Option<String>,
    /// Lore text
    #[serde(default)]
    pub lore: Option<String>,
    /// World rules
    #[serde(default)]
    pub rules: Option<String>,
}
