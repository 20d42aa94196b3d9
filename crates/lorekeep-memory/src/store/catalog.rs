use super::DialogueStore;
use crate::catalog::{ImportSummary, WorldCatalog, WorldFile};
use crate::error::Result;
use crate::types::{
    NpcProfile, ScriptedEvent, ScriptedEventStep, SpeakerType, UniverseSettings,
};
use async_trait::async_trait;
use sqlx::Row;
use tracing::info;

impl DialogueStore {
    // ── World catalog ───────────────────────────────────────────

    /// Import a world file, replacing existing rows with the same IDs.
    pub async fn import_world(&self, world: &WorldFile) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();
        let mut tx = self.pool.begin().await?;

        for entry in &world.universes {
            let u = &entry.settings;
            sqlx::query(
                "INSERT OR REPLACE INTO universes (id, name, description, lore, rules)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(&u.id)
            .bind(&u.name)
            .bind(&u.description)
            .bind(&u.lore)
            .bind(&u.rules)
            .execute(&mut *tx)
            .await?;
            summary.universes += 1;

            for npc in &entry.npcs {
                sqlx::query(
                    "INSERT OR REPLACE INTO npcs (universe_id, id, name, bio, race, gender, species)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )
                .bind(&u.id)
                .bind(&npc.id)
                .bind(&npc.name)
                .bind(&npc.bio)
                .bind(&npc.race)
                .bind(&npc.gender)
                .bind(&npc.species)
                .execute(&mut *tx)
                .await?;
                summary.npcs += 1;
            }

            for event in &entry.events {
                sqlx::query(
                    "INSERT OR REPLACE INTO events (id, universe_id, goal_description, goal_trigger)
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .bind(&event.id)
                .bind(&u.id)
                .bind(&event.goal_description)
                .bind(&event.goal_trigger)
                .execute(&mut *tx)
                .await?;

                sqlx::query("DELETE FROM event_steps WHERE event_id = ?1")
                    .bind(&event.id)
                    .execute(&mut *tx)
                    .await?;

                for (position, step) in event.steps.iter().enumerate() {
                    sqlx::query(
                        "INSERT INTO event_steps (event_id, position, speaker_type, speaker_id, message)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                    )
                    .bind(&event.id)
                    .bind(position as i64)
                    .bind(step.speaker_type.as_str())
                    .bind(&step.speaker_id)
                    .bind(&step.message)
                    .execute(&mut *tx)
                    .await?;
                }
                summary.events += 1;
            }
        }

        tx.commit().await?;
        info!(
            universes = summary.universes,
            npcs = summary.npcs,
            events = summary.events,
            "World catalog imported"
        );
        Ok(summary)
    }
}

#[async_trait]
impl WorldCatalog for DialogueStore {
    async fn npc_profile(&self, universe_id: &str, npc_id: &str) -> Result<Option<NpcProfile>> {
        let row = sqlx::query(
            "SELECT id, name, bio, race, gender, species FROM npcs
             WHERE universe_id = ?1 AND id = ?2",
        )
        .bind(universe_id)
        .bind(npc_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> Result<NpcProfile> {
            Ok(NpcProfile {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                bio: row.try_get("bio")?,
                race: row.try_get("race")?,
                gender: row.try_get("gender")?,
                species: row.try_get("species")?,
            })
        })
        .transpose()
    }

    async fn universe(&self, universe_id: &str) -> Result<Option<UniverseSettings>> {
        let row = sqlx::query(
            "SELECT id, name, description, lore, rules FROM universes WHERE id = ?1",
        )
        .bind(universe_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> Result<UniverseSettings> {
            Ok(UniverseSettings {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                description: row.try_get("description")?,
                lore: row.try_get("lore")?,
                rules: row.try_get("rules")?,
            })
        })
        .transpose()
    }

    async fn scripted_event(&self, event_id: &str) -> Result<Option<ScriptedEvent>> {
        let Some(row) = sqlx::query(
            "SELECT id, goal_description, goal_trigger FROM events WHERE id = ?1",
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let steps = sqlx::query(
            "SELECT speaker_type, speaker_id, message FROM event_steps
             WHERE event_id = ?1 ORDER BY position",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|r| -> Result<ScriptedEventStep> {
            let speaker: String = r.try_get("speaker_type")?;
            Ok(ScriptedEventStep {
                speaker_type: SpeakerType::from_str_lossy(&speaker),
                speaker_id: r.try_get("speaker_id")?,
                message: r.try_get("message")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

        Ok(Some(ScriptedEvent {
            id: row.try_get("id")?,
            steps,
            goal_description: row.try_get("goal_description")?,
            goal_trigger: row.try_get("goal_trigger")?,
        }))
    }
}
