//! Dialogue engine
//!
//! Owns the session lifecycle: `start_session` creates an active session,
//! `generate_turn` drives one exchange, `end_session` summarizes and closes
//! it. Each turn and end runs under a per-session lock, and every write
//! back is additionally conditional on the revision that was read.

use crate::composer::DialogueComposer;
use crate::config::EngineConfig;
use crate::continuation::ContinuationController;
use crate::error::{Error, Result};
use crate::summarizer::Summarizer;
use crate::templates::PromptTemplates;
use chrono::Utc;
use dashmap::DashMap;
use lorekeep_llm::{AdapterRegistry, ProviderKind};
use lorekeep_memory::{
    DialogueStore, ImportantMemory, NewSession, Session, Turn, WorldCatalog,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};
use uuid::Uuid;

static IDENTIFIER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("IDENTIFIER_REGEX is a compile-time constant")
});

/// Result of ending a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndSessionOutcome {
    /// Narrative summary attached to the session
    pub long_term_memory: String,
    /// Significant event recorded for the session's scopes, if any
    pub important_memory: Option<String>,
}

/// Conversation memory and dialogue orchestration engine.
pub struct DialogueEngine {
    store: DialogueStore,
    composer: DialogueComposer,
    adapters: AdapterRegistry,
    templates: Arc<PromptTemplates>,
    config: EngineConfig,
    controller: ContinuationController,
    session_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl DialogueEngine {
    /// Create an engine over explicit collaborators.
    pub fn new(
        store: DialogueStore,
        catalog: Arc<dyn WorldCatalog>,
        adapters: AdapterRegistry,
        templates: PromptTemplates,
        config: EngineConfig,
    ) -> Self {
        let templates = Arc::new(templates);
        let composer = DialogueComposer::new(
            store.clone(),
            catalog,
            Arc::clone(&templates),
            config.important_memory_limit,
        );
        let controller =
            ContinuationController::new(config.max_continuation_rounds, config.provider_timeout());
        info!(
            providers = ?adapters.kinds(),
            short_term_cap = config.short_term_cap,
            "dialogue engine ready"
        );
        Self {
            store,
            composer,
            adapters,
            templates,
            config,
            controller,
            session_locks: DashMap::new(),
        }
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start a session and return its ID.
    ///
    /// # Errors
    /// `Validation` for malformed IDs, an empty or duplicated NPC list;
    /// `Storage` when the row cannot be written.
    #[instrument(skip(self, npc_ids), fields(npcs = npc_ids.len()))]
    pub async fn start_session(
        &self,
        universe_id: &str,
        npc_ids: &[String],
        player_id: &str,
        event_id: Option<&str>,
    ) -> Result<String> {
        validate_id("universe id", universe_id)?;
        validate_id("player id", player_id)?;
        if npc_ids.is_empty() {
            return Err(Error::Validation("at least one NPC id is required".to_string()));
        }
        let mut seen = HashSet::new();
        for npc_id in npc_ids {
            validate_id("npc id", npc_id)?;
            if !seen.insert(npc_id.as_str()) {
                return Err(Error::Validation(format!("duplicate npc id: {npc_id}")));
            }
        }
        if let Some(event_id) = event_id {
            validate_id("event id", event_id)?;
        }

        let session = self
            .store
            .create_session(&NewSession {
                universe_id: universe_id.to_string(),
                npc_ids: npc_ids.to_vec(),
                player_id: player_id.to_string(),
                event_id: event_id.map(String::from),
            })
            .await?;

        info!(session_id = %session.id, "session started");
        Ok(session.id)
    }

    /// Generate the NPC reply to one player utterance.
    ///
    /// The transcript is written back only once the full reply has been
    /// assembled; any failure leaves it untouched.
    ///
    /// # Errors
    /// `Validation` for an unknown selector, malformed session ID or empty
    /// utterance, `NotFound` when no active session has this ID,
    /// `InvalidState` for a session without NPCs, `Provider` and `Storage`
    /// from the collaborators.
    #[instrument(skip(self, utterance))]
    pub async fn generate_turn(
        &self,
        session_id: &str,
        utterance: &str,
        selector: &str,
    ) -> Result<String> {
        let kind: ProviderKind = selector
            .parse()
            .map_err(|e: lorekeep_llm::Error| Error::Validation(e.to_string()))?;
        validate_id("session id", session_id)?;
        if utterance.trim().is_empty() {
            return Err(Error::Validation("player utterance is empty".to_string()));
        }
        let adapter = self.adapters.get(kind)?;

        let entry = self.session_lock(session_id);
        let _guard = entry.lock.lock().await;
        self.run_turn(session_id, utterance, adapter.as_ref()).await
    }

    async fn run_turn(
        &self,
        session_id: &str,
        utterance: &str,
        adapter: &dyn lorekeep_llm::DialogueAdapter,
    ) -> Result<String> {
        let session = self.active_session(session_id).await?;
        let composition = self.composer.compose(&session, utterance).await?;
        let cap = self.config.short_term_cap;

        let mut transcript = session.short_term.clone();
        transcript.extend(composition.seed.iter().cloned(), cap);

        let prompt = composition.prompt(transcript.turns(), utterance, self.config.dialogue_options());
        let reply = self.controller.generate(adapter, &prompt).await?;

        transcript.extend([Turn::user(utterance), Turn::assistant(reply.clone())], cap);
        self.store
            .save_short_term(session_id, &transcript, session.revision)
            .await?;

        debug!(session_id, entries = transcript.len(), "turn committed");
        Ok(reply)
    }

    /// End a session: summarize, record memories and close it.
    ///
    /// # Errors
    /// `Validation` for a malformed ID, `NotFound` when no active session
    /// has this ID, `Provider` when a summarization call fails (the session
    /// then stays active), `Storage`.
    #[instrument(skip(self))]
    pub async fn end_session(&self, session_id: &str) -> Result<EndSessionOutcome> {
        validate_id("session id", session_id)?;
        let entry = self.session_lock(session_id);
        let _guard = entry.lock.lock().await;
        self.run_end(session_id).await
    }

    async fn run_end(&self, session_id: &str) -> Result<EndSessionOutcome> {
        let session = self.active_session(session_id).await?;
        if session.npc_ids.is_empty() {
            return Err(Error::InvalidState("no NPCs in session".to_string()));
        }

        let adapter = self.adapters.get(self.config.summarization_provider)?;
        let summarizer = Summarizer::new(
            adapter,
            Arc::clone(&self.templates),
            self.controller,
            self.config.summary_options(),
            self.config.important_options(),
        );

        let long_term_memory = summarizer.long_term_memory(&session.short_term).await?;
        let important_memory = summarizer.important_memory(&session.short_term).await?;

        let scopes = session.scopes();
        let now = Utc::now();
        let important_rows: Vec<ImportantMemory> = important_memory
            .iter()
            .flat_map(|content| {
                scopes.iter().map(move |scope| ImportantMemory {
                    id: Uuid::new_v4().to_string(),
                    scope: scope.clone(),
                    content: content.clone(),
                    created_at: now,
                })
            })
            .collect();

        self.store
            .close_session(session_id, session.revision, &long_term_memory, &important_rows)
            .await?;
        info!(
            session_id,
            important = important_memory.is_some(),
            "session ended"
        );

        for scope in &scopes {
            let recent = self
                .store
                .recent_long_memories(scope, self.config.summary_window)
                .await?;
            if recent.is_empty() {
                continue;
            }
            let sentence = summarizer.relationship_summary(&recent).await?;
            self.store.upsert_summary_memory(scope, &sentence).await?;
            debug!(scope = %scope, sessions = recent.len(), "relationship summary updated");
        }

        Ok(EndSessionOutcome {
            long_term_memory,
            important_memory,
        })
    }

    /// Stored snapshot of a session, active or ended.
    ///
    /// # Errors
    /// `NotFound` only when no session with this ID was ever created.
    pub async fn session(&self, session_id: &str) -> Result<Session> {
        self.store
            .get_session(session_id)
            .await?
            .ok_or_else(|| Error::NotFound(session_id.to_string()))
    }

    async fn active_session(&self, session_id: &str) -> Result<Session> {
        self.store
            .get_active_session(session_id)
            .await?
            .ok_or_else(|| Error::NotFound(session_id.to_string()))
    }

    fn session_lock<'a>(&'a self, session_id: &'a str) -> SessionLockEntry<'a> {
        let lock = self
            .session_locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        SessionLockEntry {
            locks: &self.session_locks,
            session_id,
            lock,
        }
    }
}

/// A claim on one session's lock.
///
/// Dropping it, including when the request future is cancelled, removes
/// the map entry once no other request holds or waits on it.
struct SessionLockEntry<'a> {
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    session_id: &'a str,
    lock: Arc<Mutex<()>>,
}

impl Drop for SessionLockEntry<'_> {
    fn drop(&mut self) {
        // Two references left: the map's and ours
        self.locks.remove_if(self.session_id, |_, lock| {
            Arc::ptr_eq(lock, &self.lock) && Arc::strong_count(lock) == 2
        });
    }
}

fn validate_id(what: &str, id: &str) -> Result<()> {
    if IDENTIFIER_REGEX.is_match(id) {
        Ok(())
    } else {
        Err(Error::Validation(format!("malformed {what}: {id:?}")))
    }
}
