//! Persistence Tests
//!
//! Round trips through the JSON store and reopening features from disk.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use story_cascade::{
    Backlog, BacklogRegistry, BacklogStore, BlockReason, JsonFileStore, ManualClock, Priority,
    StatusMachine, Story, StoryStatus, UpsertMode,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap()
}

/// A backlog touching every persisted field
fn populated_backlog() -> Backlog {
    let clock = Arc::new(ManualClock::new(now()));
    let machine = StatusMachine::new(clock.clone());
    let mut backlog = Backlog::new("checkout");

    let mut cart = Story::draft("US-001", "Cart", Priority::P1, now())
        .with_parent("EPIC-1")
        .with_description("Persist the cart between visits");
    cart.acceptance_criteria = vec!["Cart survives reload".into(), "Totals match".into()];
    backlog.upsert(cart, UpsertMode::Create).unwrap();
    backlog
        .upsert(
            Story::draft("US-002", "Payment", Priority::P2, now()).with_dependencies(["US-001"]),
            UpsertMode::Create,
        )
        .unwrap();
    backlog
        .upsert(Story::draft("US-003", "Receipts", Priority::P3, now()), UpsertMode::Create)
        .unwrap();

    for id in ["US-001", "US-002", "US-003"] {
        machine.mark_ready(&mut backlog, id).unwrap();
    }
    machine.start(&mut backlog, "US-001").unwrap();
    machine.record_progress(&mut backlog, "US-001", 5, Some(7.5)).unwrap();
    clock.advance(Duration::hours(3));
    machine.complete(&mut backlog, "US-001").unwrap();

    machine.start(&mut backlog, "US-003").unwrap();
    machine
        .block(&mut backlog, "US-003", BlockReason::External("Waiting on tax service".into()))
        .unwrap();
    backlog
}

#[test]
fn test_save_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::for_feature(dir.path(), "checkout");
    let backlog = populated_backlog();

    store.save(&backlog).unwrap();
    let loaded = store.load().unwrap();
    assert_eq!(loaded, backlog);

    // Saving what was loaded changes nothing
    store.save(&loaded).unwrap();
    assert_eq!(store.load().unwrap(), backlog);

    let receipts = loaded.get("US-003").unwrap();
    assert_eq!(receipts.status, StoryStatus::Blocked);
    assert_eq!(receipts.external_blocker.as_deref(), Some("Waiting on tax service"));
    assert_eq!(loaded.ids(), vec!["US-001", "US-002", "US-003"]);
}

#[test]
fn test_persisted_document_shape() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::for_feature(dir.path(), "checkout");
    store.save(&populated_backlog()).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
    assert_eq!(raw["feature_id"], "checkout");
    assert_eq!(raw["version"], "1.0.0");
    assert_eq!(raw["stories"][0]["status"], "complete");
    assert_eq!(raw["stories"][0]["priority"], "p1");
    assert_eq!(raw["stories"][1]["dependencies"][0], "US-001");
}

#[test]
fn test_duplicate_ids_rejected_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("backlog.json"), "checkout");
    let story = serde_json::to_value(Story::draft("US-001", "Cart", Priority::P1, now())).unwrap();
    let doc = serde_json::json!({
        "feature_id": "checkout",
        "stories": [story.clone(), story],
    });
    std::fs::write(store.path(), doc.to_string()).unwrap();

    assert!(store.load().is_err());
}

#[tokio::test]
async fn test_registry_reopens_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(now()));

    {
        let registry = BacklogRegistry::json(dir.path(), clock.clone());
        let session = registry.open("checkout").await.unwrap();
        session
            .create_story(Story::draft("US-001", "Cart", Priority::P1, now()))
            .await
            .unwrap();
        session.mark_ready("US-001").await.unwrap();
        session.start("US-001").await.unwrap();
    }

    let registry = BacklogRegistry::json(dir.path(), clock);
    let session = registry.open("checkout").await.unwrap();
    let story = session.get("US-001").await.unwrap();
    assert_eq!(story.status, StoryStatus::InProgress);
    assert_eq!(story.started_at, Some(now()));

    assert!(dir
        .path()
        .join("checkout")
        .join("stories")
        .join("backlog.json")
        .exists());
}
