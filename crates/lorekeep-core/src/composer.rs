//! Dialogue composer
//!
//! Builds the provider-agnostic prompt for one turn: the system context
//! rendered from world data and memory tiers, the prior transcript, and the
//! new utterance. Sessions with one NPC get a single-character context;
//! sessions with several get one combined block.

use crate::error::{Error, Result};
use crate::templates::{PromptTemplates, TemplateKind};
use lorekeep_llm::{DialoguePrompt, GenerationOptions};
use lorekeep_memory::{
    DialogueStore, NpcProfile, Scope, ScriptedEvent, Session, SpeakerType, Turn,
    UniverseSettings, WorldCatalog,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

const UNKNOWN: &str = "unknown";
const NONE: &str = "none";

/// Which composition path a session takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositionPath {
    /// Exactly one NPC
    SingleNpc,
    /// Two or more NPCs
    MultiNpc,
}

impl CompositionPath {
    /// Dispatch on participant count.
    ///
    /// # Errors
    /// `InvalidState` when the session has no NPCs.
    pub fn for_participants(count: usize) -> Result<Self> {
        match count {
            0 => Err(Error::InvalidState("no NPCs in session".to_string())),
            1 => Ok(Self::SingleNpc),
            _ => Ok(Self::MultiNpc),
        }
    }
}

/// Output of composition for one turn.
#[derive(Debug, Clone)]
pub struct Composition {
    /// Path that produced the system text
    pub path: CompositionPath,
    /// Rendered system context
    pub system: String,
    /// Scripted steps to prepend to an empty transcript
    pub seed: Vec<Turn>,
}

impl Composition {
    /// Prompt for a transcript that already includes the seed.
    #[must_use]
    pub fn prompt(
        &self,
        transcript: &[Turn],
        utterance: &str,
        options: GenerationOptions,
    ) -> DialoguePrompt {
        let turns = transcript.iter().map(Turn::to_message).collect();
        DialoguePrompt::new(self.system.clone(), turns, utterance).with_options(options)
    }
}

/// Reads world data and memory tiers and renders the system context.
#[derive(Clone)]
pub struct DialogueComposer {
    store: DialogueStore,
    catalog: Arc<dyn WorldCatalog>,
    templates: Arc<PromptTemplates>,
    important_limit: usize,
}

impl DialogueComposer {
    /// Create a composer.
    pub fn new(
        store: DialogueStore,
        catalog: Arc<dyn WorldCatalog>,
        templates: Arc<PromptTemplates>,
        important_limit: usize,
    ) -> Self {
        Self {
            store,
            catalog,
            templates,
            important_limit,
        }
    }

    /// Compose the context for the next turn of `session`.
    pub async fn compose(&self, session: &Session, utterance: &str) -> Result<Composition> {
        let path = CompositionPath::for_participants(session.npc_ids.len())?;
        let universe = self.catalog.universe(&session.universe_id).await?;
        let event = match &session.event_id {
            Some(id) => self.catalog.scripted_event(id).await?,
            None => None,
        };

        let mut vars = universe_vars(universe.as_ref());
        vars.insert("player_input", utterance.to_string());

        let (system, seed) = match path {
            CompositionPath::SingleNpc => {
                let npc_id = &session.npc_ids[0];
                let profile = self.catalog.npc_profile(&session.universe_id, npc_id).await?;
                let scope = session.scope_for(npc_id);
                let (summary, importants) = self.scope_memories(&scope).await?;

                vars.extend(npc_vars(profile.as_ref()));
                vars.insert("summary_memory", summary.unwrap_or_else(|| NONE.to_string()));
                vars.insert("important_memories", format_important(&importants));

                let seed = match (&event, session.short_term.is_empty()) {
                    (Some(event), true) => self.seed_transcript(&session.universe_id, event).await?,
                    _ => Vec::new(),
                };
                (self.templates.render(TemplateKind::Dialogue, &vars), seed)
            }
            CompositionPath::MultiNpc => {
                let mut blocks = Vec::with_capacity(session.npc_ids.len());
                for npc_id in &session.npc_ids {
                    let profile = self.catalog.npc_profile(&session.universe_id, npc_id).await?;
                    let (summary, importants) =
                        self.scope_memories(&session.scope_for(npc_id)).await?;
                    blocks.push(npc_block(npc_id, profile.as_ref(), summary.as_deref(), &importants));
                }
                vars.insert("npc_profiles", blocks.join("\n\n"));
                let goal = event.as_ref().and_then(|e| e.goal_description.as_ref());
                let trigger = event.as_ref().and_then(|e| e.goal_trigger.as_ref());
                vars.insert("event_goal", or_fallback(goal, NONE));
                vars.insert("event_trigger", or_fallback(trigger, NONE));
                (self.templates.render(TemplateKind::GroupDialogue, &vars), Vec::new())
            }
        };

        debug!(
            session_id = %session.id,
            path = ?path,
            seeded = seed.len(),
            "dialogue composed"
        );
        Ok(Composition { path, system, seed })
    }

    async fn scope_memories(&self, scope: &Scope) -> Result<(Option<String>, Vec<String>)> {
        let summary = self.store.summary_memory(scope).await?.map(|s| s.content);
        let importants = self
            .store
            .important_memories(scope, self.important_limit)
            .await?
            .into_iter()
            .map(|m| m.content)
            .collect();
        Ok((summary, importants))
    }

    /// Scripted steps as transcript turns.
    ///
    /// PLAYER steps are user turns, NPC steps are assistant turns prefixed
    /// with the speaker's name, OTHER steps are user turns.
    async fn seed_transcript(&self, universe_id: &str, event: &ScriptedEvent) -> Result<Vec<Turn>> {
        let mut names: HashMap<String, String> = HashMap::new();
        let mut turns = Vec::with_capacity(event.steps.len());

        for step in &event.steps {
            let turn = match step.speaker_type {
                SpeakerType::Player | SpeakerType::Other => Turn::user(&step.message),
                SpeakerType::Npc => {
                    let name = match &step.speaker_id {
                        Some(id) => match names.get(id) {
                            Some(name) => name.clone(),
                            None => {
                                let name = self
                                    .catalog
                                    .npc_profile(universe_id, id)
                                    .await?
                                    .map(|p| p.name)
                                    .unwrap_or_else(|| UNKNOWN.to_string());
                                names.insert(id.clone(), name.clone());
                                name
                            }
                        },
                        None => UNKNOWN.to_string(),
                    };
                    Turn::assistant(format!("{name}: {}", step.message))
                }
            };
            turns.push(turn);
        }
        Ok(turns)
    }
}

fn or_fallback(value: Option<&String>, fallback: &str) -> String {
    value
        .filter(|s| !s.trim().is_empty())
        .cloned()
        .unwrap_or_else(|| fallback.to_string())
}

fn universe_vars(universe: Option<&UniverseSettings>) -> HashMap<&'static str, String> {
    HashMap::from([
        ("universe_name", or_fallback(universe.and_then(|u| u.name.as_ref()), UNKNOWN)),
        (
            "universe_description",
            or_fallback(universe.and_then(|u| u.description.as_ref()), UNKNOWN),
        ),
        ("universe_lore", or_fallback(universe.and_then(|u| u.lore.as_ref()), UNKNOWN)),
        ("universe_rules", or_fallback(universe.and_then(|u| u.rules.as_ref()), NONE)),
    ])
}

fn npc_vars(profile: Option<&NpcProfile>) -> HashMap<&'static str, String> {
    HashMap::from([
        ("npc_name", or_fallback(profile.map(|p| &p.name), UNKNOWN)),
        ("npc_bio", or_fallback(profile.map(|p| &p.bio), UNKNOWN)),
        ("npc_race", or_fallback(profile.map(|p| &p.race), UNKNOWN)),
        ("npc_gender", or_fallback(profile.map(|p| &p.gender), UNKNOWN)),
        ("npc_species", or_fallback(profile.map(|p| &p.species), UNKNOWN)),
    ])
}

/// `- fact` lines, or `none`.
pub(crate) fn format_important(memories: &[String]) -> String {
    if memories.is_empty() {
        return NONE.to_string();
    }
    memories
        .iter()
        .map(|m| format!("- {m}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn npc_block(
    npc_id: &str,
    profile: Option<&NpcProfile>,
    summary: Option<&str>,
    importants: &[String],
) -> String {
    let vars = npc_vars(profile);
    let name = profile.map(|p| p.name.as_str()).unwrap_or(npc_id);
    format!(
        "### {name}\nRace: {}\nSpecies: {}\nGender: {}\nBackground: {}\nRelationship with the player: {}\nThings {name} remembers:\n{}",
        vars["npc_race"],
        vars["npc_species"],
        vars["npc_gender"],
        vars["npc_bio"],
        summary.unwrap_or(NONE),
        format_important(importants),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use lorekeep_memory::{
        ImportantMemory, NewSession, ScriptedEventStep, UniverseEntry, WorldFile,
    };

    async fn setup() -> (DialogueStore, DialogueComposer) {
        let store = DialogueStore::in_memory().await.unwrap();
        let world = WorldFile {
            universes: vec![UniverseEntry {
                settings: UniverseSettings {
                    id: "u1".into(),
                    name: Some("Eldoria".into()),
                    description: Some("A misty kingdom".into()),
                    lore: None,
                    rules: None,
                },
                npcs: vec![
                    NpcProfile {
                        id: "n1".into(),
                        name: "Mira".into(),
                        bio: "A blacksmith".into(),
                        race: "human".into(),
                        gender: "female".into(),
                        species: "".into(),
                    },
                    NpcProfile {
                        id: "n2".into(),
                        name: "Tobin".into(),
                        bio: "A bard".into(),
                        race: "halfling".into(),
                        gender: "male".into(),
                        species: "".into(),
                    },
                ],
                events: vec![ScriptedEvent {
                    id: "e1".into(),
                    steps: vec![
                        ScriptedEventStep {
                            speaker_type: SpeakerType::Player,
                            speaker_id: None,
                            message: "Hello".into(),
                        },
                        ScriptedEventStep {
                            speaker_type: SpeakerType::Npc,
                            speaker_id: Some("n1".into()),
                            message: "Welcome".into(),
                        },
                        ScriptedEventStep {
                            speaker_type: SpeakerType::Npc,
                            speaker_id: Some("ghost".into()),
                            message: "Boo".into(),
                        },
                    ],
                    goal_description: Some("Buy a sword".into()),
                    goal_trigger: None,
                }],
            }],
        };
        store.import_world(&world).await.unwrap();
        let composer = DialogueComposer::new(
            store.clone(),
            Arc::new(store.clone()),
            Arc::new(PromptTemplates::builtin()),
            5,
        );
        (store, composer)
    }

    async fn session(store: &DialogueStore, npcs: &[&str], event: Option<&str>) -> Session {
        store
            .create_session(&NewSession {
                universe_id: "u1".into(),
                npc_ids: npcs.iter().map(|n| n.to_string()).collect(),
                player_id: "p1".into(),
                event_id: event.map(String::from),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_single_npc_context() {
        let (store, composer) = setup().await;
        let s = session(&store, &["n1"], None).await;
        store
            .upsert_summary_memory(&s.scope_for("n1"), "Mira trusts the player.")
            .await
            .unwrap();
        store
            .insert_important_memory(&ImportantMemory {
                id: "i1".into(),
                scope: s.scope_for("n1"),
                content: "The player saved her forge.".into(),
                created_at: chrono::Utc::now(),
            })
            .await
            .unwrap();

        let c = composer.compose(&s, "Hi").await.unwrap();
        assert_eq!(c.path, CompositionPath::SingleNpc);
        assert!(c.system.contains("You are Mira"));
        assert!(c.system.contains("Eldoria"));
        assert!(c.system.contains("Lore: unknown"));
        assert!(c.system.contains("Rules: none"));
        assert!(c.system.contains("Species: unknown"));
        assert!(c.system.contains("Relationship: Mira trusts the player."));
        assert!(c.system.contains("- The player saved her forge."));
        assert!(c.seed.is_empty());
    }

    #[tokio::test]
    async fn test_empty_memories_render_none() {
        let (store, composer) = setup().await;
        let s = session(&store, &["n1"], None).await;
        let c = composer.compose(&s, "Hi").await.unwrap();
        assert!(c.system.contains("Relationship: none"));
        assert!(c.system.contains("Things you remember:\nnone"));
    }

    #[tokio::test]
    async fn test_event_seeds_empty_transcript() {
        let (store, composer) = setup().await;
        let s = session(&store, &["n1"], Some("e1")).await;
        let c = composer.compose(&s, "Hi").await.unwrap();
        assert_eq!(
            c.seed,
            vec![
                Turn::user("Hello"),
                Turn::assistant("Mira: Welcome"),
                Turn::assistant("unknown: Boo"),
            ]
        );
    }

    #[tokio::test]
    async fn test_event_not_reseeded_once_transcript_exists() {
        let (store, composer) = setup().await;
        let mut s = session(&store, &["n1"], Some("e1")).await;
        s.short_term.push(Turn::user("earlier"), 20);
        let c = composer.compose(&s, "Hi").await.unwrap();
        assert!(c.seed.is_empty());
    }

    #[tokio::test]
    async fn test_multi_npc_context() {
        let (store, composer) = setup().await;
        let s = session(&store, &["n1", "n2"], Some("e1")).await;
        let c = composer.compose(&s, "Hi all").await.unwrap();
        assert_eq!(c.path, CompositionPath::MultiNpc);
        assert!(c.system.contains("### Mira"));
        assert!(c.system.contains("### Tobin"));
        assert!(c.system.contains("Buy a sword"));
        assert!(c.system.contains("Goal is reached when: none"));
        assert!(c.seed.is_empty());
    }

    #[tokio::test]
    async fn test_zero_npcs_is_invalid_state() {
        let (store, composer) = setup().await;
        let mut s = session(&store, &["n1"], None).await;
        s.npc_ids.clear();
        let err = composer.compose(&s, "Hi").await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[test]
    fn test_prompt_appends_utterance_after_transcript() {
        let c = Composition {
            path: CompositionPath::SingleNpc,
            system: "sys".into(),
            seed: Vec::new(),
        };
        let prompt = c.prompt(
            &[Turn::user("Hello"), Turn::assistant("Welcome")],
            "Hi",
            GenerationOptions::default(),
        );
        assert_eq!(prompt.system, "sys");
        assert_eq!(prompt.turns.len(), 2);
        assert_eq!(prompt.utterance, "Hi");
    }
}
