use super::{format_ts, parse_ts, DialogueStore};
use crate::error::{Error, Result};
use crate::types::{ImportantMemory, Scope, SummaryMemory};
use chrono::Utc;
use sqlx::{Row, Sqlite, Transaction};
use tracing::debug;

impl DialogueStore {
    // ── Important memories ──────────────────────────────────────

    /// Append an important memory outside of a session close.
    pub async fn insert_important_memory(&self, memory: &ImportantMemory) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::insert_important_memory_in(&mut tx, memory).await?;
        tx.commit().await?;
        Ok(())
    }

    pub(crate) async fn insert_important_memory_in(
        tx: &mut Transaction<'_, Sqlite>,
        memory: &ImportantMemory,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO important_memories
             (id, universe_id, npc_id, player_id, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&memory.id)
        .bind(&memory.scope.universe_id)
        .bind(&memory.scope.npc_id)
        .bind(&memory.scope.player_id)
        .bind(&memory.content)
        .bind(format_ts(memory.created_at))
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// The oldest `limit` important memories of a scope, earliest first.
    pub async fn important_memories(&self, scope: &Scope, limit: usize) -> Result<Vec<ImportantMemory>> {
        let rows = sqlx::query(
            "SELECT id, universe_id, npc_id, player_id, content, created_at
             FROM important_memories
             WHERE universe_id = ?1 AND npc_id = ?2 AND player_id = ?3
             ORDER BY created_at ASC, rowid ASC
             LIMIT ?4",
        )
        .bind(&scope.universe_id)
        .bind(&scope.npc_id)
        .bind(&scope.player_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_important).collect()
    }

    /// Number of important memories in a scope.
    pub async fn important_memory_count(&self, scope: &Scope) -> Result<u32> {
        let row = sqlx::query(
            "SELECT COUNT(*) as cnt FROM important_memories
             WHERE universe_id = ?1 AND npc_id = ?2 AND player_id = ?3",
        )
        .bind(&scope.universe_id)
        .bind(&scope.npc_id)
        .bind(&scope.player_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get::<i32, _>("cnt")? as u32)
    }

    fn row_to_important(row: &sqlx::sqlite::SqliteRow) -> Result<ImportantMemory> {
        let created_str: String = row.try_get("created_at")?;
        Ok(ImportantMemory {
            id: row.try_get("id")?,
            scope: Scope {
                universe_id: row.try_get("universe_id")?,
                npc_id: row.try_get("npc_id")?,
                player_id: row.try_get("player_id")?,
            },
            content: row.try_get("content")?,
            created_at: parse_ts(&created_str),
        })
    }

    // ── Summary memory ──────────────────────────────────────────

    /// The standing summary of a scope.
    pub async fn summary_memory(&self, scope: &Scope) -> Result<Option<SummaryMemory>> {
        let row = sqlx::query(
            "SELECT content, updated_at FROM summary_memories
             WHERE universe_id = ?1 AND npc_id = ?2 AND player_id = ?3",
        )
        .bind(&scope.universe_id)
        .bind(&scope.npc_id)
        .bind(&scope.player_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> Result<SummaryMemory> {
            let updated_str: String = row.try_get("updated_at")?;
            Ok(SummaryMemory {
                scope: scope.clone(),
                content: row.try_get("content")?,
                updated_at: parse_ts(&updated_str),
            })
        })
        .transpose()
    }

    /// Create or overwrite the standing summary of a scope.
    pub async fn upsert_summary_memory(&self, scope: &Scope, content: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO summary_memories (universe_id, npc_id, player_id, content, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(universe_id, npc_id, player_id) DO UPDATE SET
                content = excluded.content,
                updated_at = excluded.updated_at",
        )
        .bind(&scope.universe_id)
        .bind(&scope.npc_id)
        .bind(&scope.player_id)
        .bind(content)
        .bind(format_ts(Utc::now()))
        .execute(&self.pool)
        .await?;
        debug!(scope = %scope, "Summary memory upserted");
        Ok(())
    }

    // ── Long-term memories ──────────────────────────────────────

    /// Long-term memories of the `limit` most recently ended sessions in a
    /// scope, most recent first.
    pub async fn recent_long_memories(&self, scope: &Scope, limit: usize) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT s.long_memory FROM sessions s
             JOIN session_npcs n ON n.session_id = s.id
             WHERE s.universe_id = ?1 AND n.npc_id = ?2 AND s.player_id = ?3
               AND s.status = 'ended' AND s.long_memory IS NOT NULL
             ORDER BY s.ended_at DESC, s.rowid DESC
             LIMIT ?4",
        )
        .bind(&scope.universe_id)
        .bind(&scope.npc_id)
        .bind(&scope.player_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| r.try_get::<String, _>("long_memory").map_err(Error::from))
            .collect()
    }
}
