//! Lorekeep Memory - session and tiered NPC memory persistence
//!
//! Stores dialogue sessions together with the memory tiers derived from
//! them, keyed by the (universe, NPC, player) scope.
//!
//! # Tiers
//!
//! ```text
//! Session ──► short-term (JSON column, FIFO capped)
//!    │
//!    └─ end ──► long-term (on the session row)
//!          ├──► important memories (append-only, per scope)
//!          └──► summary memory (one row per scope, upserted)
//! ```
//!
//! World data (NPC profiles, universe lore, scripted events) is read
//! through [`WorldCatalog`], which [`DialogueStore`] also implements.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod catalog;
pub mod error;
pub mod store;
pub mod types;

pub use catalog::{ImportSummary, UniverseEntry, WorldCatalog, WorldFile};
pub use error::{Error, Result};
pub use store::DialogueStore;
pub use types::{
    display_line, ImportantMemory, NewSession, NpcProfile, Scope, ScriptedEvent,
    ScriptedEventStep, Session, SessionStatus, ShortTermMemory, SpeakerType, SummaryMemory,
    Turn, TurnRole, UniverseSettings, DEFAULT_SHORT_TERM_CAP,
};
