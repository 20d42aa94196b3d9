use super::DialogueStore;
use crate::catalog::{WorldCatalog, WorldFile};
use crate::error::Error;
use crate::types::*;
use chrono::{Duration, Utc};

async fn test_store() -> DialogueStore {
    DialogueStore::in_memory().await.unwrap()
}

fn new_session(npcs: &[&str]) -> NewSession {
    NewSession {
        universe_id: "u1".into(),
        npc_ids: npcs.iter().map(|n| n.to_string()).collect(),
        player_id: "p1".into(),
        event_id: None,
    }
}

fn important(scope: &Scope, content: &str, offset_secs: i64) -> ImportantMemory {
    ImportantMemory {
        id: uuid::Uuid::new_v4().to_string(),
        scope: scope.clone(),
        content: content.into(),
        created_at: Utc::now() + Duration::seconds(offset_secs),
    }
}

#[tokio::test]
async fn test_create_and_get_session() {
    let store = test_store().await;
    let created = store.create_session(&new_session(&["n1", "n2"])).await.unwrap();

    let got = store.get_session(&created.id).await.unwrap().unwrap();
    assert_eq!(got.id, created.id);
    assert_eq!(got.npc_ids, vec!["n1", "n2"]);
    assert_eq!(got.status, SessionStatus::Active);
    assert!(got.short_term.is_empty());
    assert_eq!(got.revision, 0);
    assert!(got.ended_at.is_none());
}

#[tokio::test]
async fn test_get_missing_session() {
    let store = test_store().await;
    assert!(store.get_session("nope").await.unwrap().is_none());
    assert!(store.get_active_session("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn test_save_short_term_bumps_revision() {
    let store = test_store().await;
    let session = store.create_session(&new_session(&["n1"])).await.unwrap();

    let mut mem = ShortTermMemory::new();
    mem.extend([Turn::user("Hi"), Turn::assistant("Hello")], DEFAULT_SHORT_TERM_CAP);
    let rev = store.save_short_term(&session.id, &mem, 0).await.unwrap();
    assert_eq!(rev, 1);

    let got = store.get_session(&session.id).await.unwrap().unwrap();
    assert_eq!(got.short_term, mem);
    assert_eq!(got.revision, 1);
}

#[tokio::test]
async fn test_stale_revision_is_conflict() {
    let store = test_store().await;
    let session = store.create_session(&new_session(&["n1"])).await.unwrap();
    let mem = ShortTermMemory::from_turns(vec![Turn::user("a")]);

    store.save_short_term(&session.id, &mem, 0).await.unwrap();
    let err = store.save_short_term(&session.id, &mem, 0).await.unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
}

#[tokio::test]
async fn test_close_session_is_terminal() {
    let store = test_store().await;
    let session = store.create_session(&new_session(&["n1"])).await.unwrap();
    let scope = session.scope_for("n1");

    store
        .close_session(&session.id, 0, "They met.", &[important(&scope, "They met.", 0)])
        .await
        .unwrap();

    let got = store.get_session(&session.id).await.unwrap().unwrap();
    assert_eq!(got.status, SessionStatus::Ended);
    assert_eq!(got.long_term_memory.as_deref(), Some("They met."));
    assert!(got.ended_at.is_some());
    assert!(store.get_active_session(&session.id).await.unwrap().is_none());
    assert_eq!(store.important_memory_count(&scope).await.unwrap(), 1);

    // No writes after end
    let mem = ShortTermMemory::from_turns(vec![Turn::user("late")]);
    let err = store.save_short_term(&session.id, &mem, got.revision).await.unwrap_err();
    assert!(matches!(err, Error::SessionNotActive(_)));

    let err = store
        .close_session(&session.id, got.revision, "again", &[important(&scope, "x", 0)])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SessionNotActive(_)));
    // The rejected close must not leave its important memory behind
    assert_eq!(store.important_memory_count(&scope).await.unwrap(), 1);
}

#[tokio::test]
async fn test_important_memories_oldest_first_limited() {
    let store = test_store().await;
    let scope = Scope::new("u1", "n1", "p1");
    for i in 0..7 {
        store
            .insert_important_memory(&important(&scope, &format!("fact {i}"), i))
            .await
            .unwrap();
    }
    store
        .insert_important_memory(&important(&Scope::new("u1", "n2", "p1"), "other", -100))
        .await
        .unwrap();

    let got = store.important_memories(&scope, 5).await.unwrap();
    let contents: Vec<_> = got.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, ["fact 0", "fact 1", "fact 2", "fact 3", "fact 4"]);
}

#[tokio::test]
async fn test_summary_upsert_overwrites() {
    let store = test_store().await;
    let scope = Scope::new("u1", "n1", "p1");
    assert!(store.summary_memory(&scope).await.unwrap().is_none());

    store.upsert_summary_memory(&scope, "Wary.").await.unwrap();
    store.upsert_summary_memory(&scope, "Friendly.").await.unwrap();

    let got = store.summary_memory(&scope).await.unwrap().unwrap();
    assert_eq!(got.content, "Friendly.");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM summary_memories")
        .fetch_one(&store.pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_recent_long_memories_most_recent_first() {
    let store = test_store().await;
    for i in 0..7 {
        let s = store.create_session(&new_session(&["n1"])).await.unwrap();
        store
            .close_session(&s.id, 0, &format!("session {i}"), &[])
            .await
            .unwrap();
    }
    // Active sessions and other NPCs are ignored
    store.create_session(&new_session(&["n1"])).await.unwrap();
    let other = store.create_session(&new_session(&["n2"])).await.unwrap();
    store.close_session(&other.id, 0, "other npc", &[]).await.unwrap();

    let got = store
        .recent_long_memories(&Scope::new("u1", "n1", "p1"), 5)
        .await
        .unwrap();
    assert_eq!(
        got,
        ["session 6", "session 5", "session 4", "session 3", "session 2"]
    );
}

#[tokio::test]
async fn test_world_import_and_lookup() {
    let store = test_store().await;
    let world: WorldFile = serde_json::from_str(
        r#"{
            "universes": [{
                "id": "u1",
                "name": "Eldoria",
                "npcs": [{ "id": "n1", "name": "Mira", "bio": "A smith" }],
                "events": [{
                    "id": "e1",
                    "goal_trigger": "Player pays",
                    "steps": [
                        { "speaker_type": "PLAYER", "message": "Hello" },
                        { "speaker_type": "NPC", "speaker_id": "n1", "message": "Welcome" }
                    ]
                }]
            }]
        }"#,
    )
    .unwrap();

    let summary = store.import_world(&world).await.unwrap();
    assert_eq!((summary.universes, summary.npcs, summary.events), (1, 1, 1));
    // Re-import replaces instead of duplicating steps
    store.import_world(&world).await.unwrap();

    let npc = store.npc_profile("u1", "n1").await.unwrap().unwrap();
    assert_eq!(npc.name, "Mira");
    assert!(store.npc_profile("u2", "n1").await.unwrap().is_none());

    let universe = store.universe("u1").await.unwrap().unwrap();
    assert_eq!(universe.name.as_deref(), Some("Eldoria"));
    assert!(universe.lore.is_none());

    let event = store.scripted_event("e1").await.unwrap().unwrap();
    assert_eq!(event.steps.len(), 2);
    assert_eq!(event.steps[0].speaker_type, SpeakerType::Player);
    assert_eq!(event.steps[1].speaker_id.as_deref(), Some("n1"));
    assert_eq!(event.goal_trigger.as_deref(), Some("Player pays"));
    assert!(store.scripted_event("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_file_backed_store_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("lorekeep.db");

    let id = {
        let store = DialogueStore::from_path(&path).await.unwrap();
        let s = store.create_session(&new_session(&["n1"])).await.unwrap();
        store.pool.close().await;
        s.id
    };

    let store = DialogueStore::from_path(&path).await.unwrap();
    let got = store.get_session(&id).await.unwrap().unwrap();
    assert_eq!(got.npc_ids, vec!["n1"]);
}
