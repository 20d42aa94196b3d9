//! Read-only world data: NPC profiles, universe settings, scripted events.
//!
//! The engine consumes these through [`WorldCatalog`]. [`DialogueStore`]
//! implements it over its own tables; hosts with another source of world
//! data can implement it themselves.
//!
//! [`DialogueStore`]: crate::DialogueStore

use crate::error::Result;
use crate::types::{NpcProfile, ScriptedEvent, UniverseSettings};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Typed lookups over authored world data.
#[async_trait]
pub trait WorldCatalog: Send + Sync {
    /// Profile of an NPC within a universe.
    async fn npc_profile(&self, universe_id: &str, npc_id: &str) -> Result<Option<NpcProfile>>;

    /// Universe settings.
    async fn universe(&self, universe_id: &str) -> Result<Option<UniverseSettings>>;

    /// Scripted event with its ordered steps.
    async fn scripted_event(&self, event_id: &str) -> Result<Option<ScriptedEvent>>;
}

/// Import format for seeding the catalog tables.
///
/// ```json
/// { "universes": [ { "id": "...", "name": "...", "npcs": [...], "events": [...] } ] }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldFile {
    /// Universes with their NPCs and events
    #[serde(default)]
    pub universes: Vec<UniverseEntry>,
}

/// One universe in a [`WorldFile`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UniverseEntry {
    /// Universe settings
    #[serde(flatten)]
    pub settings: UniverseSettings,
    /// NPCs living in this universe
    #[serde(default)]
    pub npcs: Vec<NpcProfile>,
    /// Scripted events of this universe
    #[serde(default)]
    pub events: Vec<ScriptedEvent>,
}

/// Counts reported by an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Universes written
    pub universes: usize,
    /// NPCs written
    pub npcs: usize,
    /// Events written
    pub events: usize,
}
