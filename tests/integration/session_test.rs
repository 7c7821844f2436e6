//! Session Tests
//!
//! Concurrent callers against per-feature sessions.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use story_cascade::{BacklogRegistry, CoreError, ManualClock, Priority, Story, StoryStatus};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_completions_propagate_once() {
    let registry = Arc::new(BacklogRegistry::in_memory(Arc::new(ManualClock::new(now()))));
    let session = registry.open("checkout").await.unwrap();

    // Ten independent roots, one story waiting on all of them
    let roots: Vec<String> = (1..=10).map(|i| format!("US-{:03}", i)).collect();
    for id in &roots {
        session
            .create_story(Story::draft(id.as_str(), "Root", Priority::P2, now()))
            .await
            .unwrap();
        session.mark_ready(id).await.unwrap();
        session.start(id).await.unwrap();
    }
    session
        .create_story(
            Story::draft("US-100", "Release", Priority::P1, now()).with_dependencies(roots.clone()),
        )
        .await
        .unwrap();
    session.mark_ready("US-100").await.unwrap();

    let mut handles = Vec::new();
    for id in roots {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            let session = registry.open("checkout").await?;
            session.complete(&id).await
        }));
    }

    let mut unblocked = Vec::new();
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        unblocked.extend(outcome.unblocked);
    }

    assert_eq!(unblocked, vec!["US-100"]);
    let release = session.get("US-100").await.unwrap();
    assert_eq!(release.status, StoryStatus::Ready);
    assert!(release.blocked_by.is_empty());
}

#[tokio::test]
async fn test_features_are_independent() {
    let registry = BacklogRegistry::in_memory(Arc::new(ManualClock::new(now())));
    let checkout = registry.open("checkout").await.unwrap();
    let search = registry.open("search").await.unwrap();

    checkout
        .create_story(Story::draft("US-001", "Cart", Priority::P1, now()))
        .await
        .unwrap();
    search
        .create_story(Story::draft("US-001", "Index", Priority::P1, now()))
        .await
        .unwrap();

    assert_eq!(checkout.get("US-001").await.unwrap().title, "Cart");
    assert_eq!(search.get("US-001").await.unwrap().title, "Index");

    let err = checkout
        .create_story(Story::draft("US-001", "Cart again", Priority::P1, now()))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::DuplicateIdConflict(_)));
}

#[tokio::test]
async fn test_update_keeps_lifecycle_fields() {
    let registry = BacklogRegistry::in_memory(Arc::new(ManualClock::new(now())));
    let session = registry.open("checkout").await.unwrap();
    session
        .create_story(Story::draft("US-001", "Cart", Priority::P2, now()))
        .await
        .unwrap();
    session.mark_ready("US-001").await.unwrap();
    session.start("US-001").await.unwrap();

    let mut edited = session.get("US-001").await.unwrap();
    edited.title = "Persistent cart".into();
    edited.status = StoryStatus::Complete;
    edited.started_at = None;
    session.update_story(edited).await.unwrap();

    let stored = session.get("US-001").await.unwrap();
    assert_eq!(stored.title, "Persistent cart");
    assert_eq!(stored.status, StoryStatus::InProgress);
    assert_eq!(stored.started_at, Some(now()));

    let missing = Story::draft("US-404", "Ghost", Priority::P3, now());
    assert!(matches!(
        session.update_story(missing).await,
        Err(CoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_dropping_dependency_clears_blocker() {
    let registry = BacklogRegistry::in_memory(Arc::new(ManualClock::new(now())));
    let session = registry.open("checkout").await.unwrap();
    session
        .create_story(Story::draft("US-001", "Cart", Priority::P2, now()))
        .await
        .unwrap();
    session
        .create_story(
            Story::draft("US-002", "Payment", Priority::P2, now()).with_dependencies(["US-001"]),
        )
        .await
        .unwrap();
    let outcome = session.mark_ready("US-002").await.unwrap();
    assert_eq!(outcome.status, StoryStatus::Blocked);

    let mut edited = session.get("US-002").await.unwrap();
    edited.dependencies.clear();
    session.update_story(edited).await.unwrap();

    let stored = session.get("US-002").await.unwrap();
    assert!(stored.blocked_by.is_empty());
    assert_eq!(stored.status, StoryStatus::Blocked);

    let report = session.reconcile_blocked().await.unwrap();
    assert_eq!(report.unblocked, vec!["US-002".to_string()]);
    assert_eq!(
        session.get("US-002").await.unwrap().status,
        StoryStatus::Ready
    );
}
