use super::{format_ts, parse_ts, DialogueStore};
use crate::error::{Error, Result};
use crate::types::{
    ImportantMemory, NewSession, Session, SessionStatus, ShortTermMemory,
};
use chrono::{DateTime, Utc};
use sqlx::Row;
use tracing::debug;
use uuid::Uuid;

const SESSION_COLUMNS: &str = "id, universe_id, player_id, status, short_memory, event_id, \
                               long_memory, revision, created_at, ended_at";

impl DialogueStore {
    // ── Sessions ────────────────────────────────────────────────

    /// Create an active session with an empty transcript.
    pub async fn create_session(&self, new: &NewSession) -> Result<Session> {
        let session = Session {
            id: Uuid::new_v4().to_string(),
            universe_id: new.universe_id.clone(),
            npc_ids: new.npc_ids.clone(),
            player_id: new.player_id.clone(),
            status: SessionStatus::Active,
            short_term: ShortTermMemory::new(),
            event_id: new.event_id.clone(),
            long_term_memory: None,
            revision: 0,
            created_at: Utc::now(),
            ended_at: None,
        };

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO sessions
             (id, universe_id, player_id, status, short_memory, event_id, revision, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&session.id)
        .bind(&session.universe_id)
        .bind(&session.player_id)
        .bind(session.status.as_str())
        .bind(serde_json::to_string(&session.short_term)?)
        .bind(&session.event_id)
        .bind(session.revision)
        .bind(format_ts(session.created_at))
        .execute(&mut *tx)
        .await?;

        for (position, npc_id) in session.npc_ids.iter().enumerate() {
            sqlx::query(
                "INSERT OR IGNORE INTO session_npcs (session_id, npc_id, position)
                 VALUES (?1, ?2, ?3)",
            )
            .bind(&session.id)
            .bind(npc_id)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        debug!(session_id = %session.id, npcs = session.npc_ids.len(), "Session created");
        Ok(session)
    }

    /// Get a session by ID, whatever its status.
    pub async fn get_session(&self, id: &str) -> Result<Option<Session>> {
        let row = sqlx::query(&format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let npc_ids = self.session_npc_ids(id).await?;
                Self::row_to_session(&row, npc_ids).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Get a session only if it is still active.
    pub async fn get_active_session(&self, id: &str) -> Result<Option<Session>> {
        Ok(self.get_session(id).await?.filter(Session::is_active))
    }

    /// NPC IDs linked to a session, in the order they were given.
    pub async fn session_npc_ids(&self, session_id: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT npc_id FROM session_npcs WHERE session_id = ?1 ORDER BY position",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| r.try_get::<String, _>("npc_id").map_err(Error::from))
            .collect()
    }

    /// Write back the transcript of an active session.
    ///
    /// The write only applies while the row is active and still at
    /// `expected_revision`. Returns the new revision.
    pub async fn save_short_term(
        &self,
        session_id: &str,
        short_term: &ShortTermMemory,
        expected_revision: i64,
    ) -> Result<i64> {
        let result = sqlx::query(
            "UPDATE sessions SET short_memory = ?1, revision = revision + 1
             WHERE id = ?2 AND status = 'active' AND revision = ?3",
        )
        .bind(serde_json::to_string(short_term)?)
        .bind(session_id)
        .bind(expected_revision)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.stale_write_error(session_id).await);
        }
        debug!(session_id, entries = short_term.len(), "Short-term memory saved");
        Ok(expected_revision + 1)
    }

    /// End a session in one transaction.
    ///
    /// Important memories are appended first; the status flip with the
    /// long-term memory and end timestamp is the last write. Nothing is
    /// kept if the row is no longer active at `expected_revision`.
    pub async fn close_session(
        &self,
        session_id: &str,
        expected_revision: i64,
        long_term_memory: &str,
        important: &[ImportantMemory],
    ) -> Result<DateTime<Utc>> {
        let ended_at = Utc::now();
        let mut tx = self.pool.begin().await?;

        for memory in important {
            Self::insert_important_memory_in(&mut tx, memory).await?;
        }

        let result = sqlx::query(
            "UPDATE sessions
             SET status = 'ended', long_memory = ?1, ended_at = ?2, revision = revision + 1
             WHERE id = ?3 AND status = 'active' AND revision = ?4",
        )
        .bind(long_term_memory)
        .bind(format_ts(ended_at))
        .bind(session_id)
        .bind(expected_revision)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(self.stale_write_error(session_id).await);
        }
        tx.commit().await?;

        debug!(session_id, important = important.len(), "Session closed");
        Ok(ended_at)
    }

    /// Classify a conditional write that matched no row.
    async fn stale_write_error(&self, session_id: &str) -> Error {
        let row = sqlx::query("SELECT status, revision FROM sessions WHERE id = ?1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await;

        match row {
            Ok(Some(row)) => {
                let status: String = row.try_get("status").unwrap_or_default();
                if SessionStatus::from_str_lossy(&status) != SessionStatus::Active {
                    return Error::SessionNotActive(session_id.to_string());
                }
                let revision: i64 = row.try_get("revision").unwrap_or_default();
                debug!(session_id, revision, "Stale session write rejected");
                Error::Conflict(session_id.to_string())
            }
            Ok(None) => Error::SessionNotActive(session_id.to_string()),
            Err(e) => Error::Database(e),
        }
    }

    pub(crate) fn row_to_session(
        row: &sqlx::sqlite::SqliteRow,
        npc_ids: Vec<String>,
    ) -> Result<Session> {
        let status: String = row.try_get("status")?;
        let short_memory: String = row.try_get("short_memory")?;
        let created_str: String = row.try_get("created_at")?;
        let ended_str: Option<String> = row.try_get("ended_at")?;
        Ok(Session {
            id: row.try_get("id")?,
            universe_id: row.try_get("universe_id")?,
            npc_ids,
            player_id: row.try_get("player_id")?,
            status: SessionStatus::from_str_lossy(&status),
            short_term: serde_json::from_str(&short_memory)?,
            event_id: row.try_get("event_id")?,
            long_term_memory: row.try_get("long_memory")?,
            revision: row.try_get("revision")?,
            created_at: parse_ts(&created_str),
            ended_at: ended_str.as_deref().map(parse_ts),
        })
    }
}
