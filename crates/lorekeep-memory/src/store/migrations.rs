use super::DialogueStore;
use crate::error::Result;

impl DialogueStore {
    // ── Migrations ──────────────────────────────────────────────

    pub(crate) async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS sessions (
                id           TEXT PRIMARY KEY,
                universe_id  TEXT NOT NULL,
                player_id    TEXT NOT NULL,
                status       TEXT NOT NULL DEFAULT 'active',
                short_memory TEXT NOT NULL DEFAULT '[]',
                event_id     TEXT,
                long_memory  TEXT,
                revision     INTEGER NOT NULL DEFAULT 0,
                created_at   TEXT NOT NULL,
                ended_at     TEXT
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_sessions_scope
             ON sessions(universe_id, player_id, status, ended_at)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS session_npcs (
                session_id TEXT NOT NULL REFERENCES sessions(id),
                npc_id     TEXT NOT NULL,
                position   INTEGER NOT NULL,
                PRIMARY KEY (session_id, npc_id)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_session_npcs_npc ON session_npcs(npc_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS important_memories (
                id          TEXT PRIMARY KEY,
                universe_id TEXT NOT NULL,
                npc_id      TEXT NOT NULL,
                player_id   TEXT NOT NULL,
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_important_scope
             ON important_memories(universe_id, npc_id, player_id, created_at)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS summary_memories (
                universe_id TEXT NOT NULL,
                npc_id      TEXT NOT NULL,
                player_id   TEXT NOT NULL,
                content     TEXT NOT NULL,
                updated_at  TEXT NOT NULL,
                PRIMARY KEY (universe_id, npc_id, player_id)
            )",
        )
        .execute(&self.pool)
        .await?;

        // World catalog
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS universes (
                id          TEXT PRIMARY KEY,
                name        TEXT,
                description TEXT,
                lore        TEXT,
                rules       TEXT
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS npcs (
                universe_id TEXT NOT NULL REFERENCES universes(id),
                id          TEXT NOT NULL,
                name        TEXT NOT NULL,
                bio         TEXT NOT NULL DEFAULT '',
                race        TEXT NOT NULL DEFAULT '',
                gender      TEXT NOT NULL DEFAULT '',
                species     TEXT NOT NULL DEFAULT '',
                PRIMARY KEY (universe_id, id)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS events (
                id               TEXT PRIMARY KEY,
                universe_id      TEXT NOT NULL REFERENCES universes(id),
                goal_description TEXT,
                goal_trigger     TEXT
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS event_steps (
                event_id     TEXT NOT NULL REFERENCES events(id),
                position     INTEGER NOT NULL,
                speaker_type TEXT NOT NULL,
                speaker_id   TEXT,
                message      TEXT NOT NULL,
                PRIMARY KEY (event_id, position)
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
