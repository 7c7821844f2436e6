//! Lifecycle Scenario Tests
//!
//! Walks stories through the state machine the way a caller would and checks
//! the dependency engine's ordering guarantees.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use story_cascade::services::analysis::fanout_bottleneck;
use story_cascade::services::dependency::{self, execution_batches};
use story_cascade::services::metrics::progress;
use story_cascade::{
    AnalysisConfig, Backlog, CoreError, ManualClock, Priority, StatusMachine, Story, StoryMetrics,
    StoryStatus, UpsertMode,
};

// ============================================================================
// Helpers
// ============================================================================

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap()
}

fn machine() -> StatusMachine {
    StatusMachine::new(Arc::new(ManualClock::new(now())))
}

fn backlog(stories: &[(&str, Priority, &[&str])]) -> Backlog {
    let mut backlog = Backlog::new("checkout");
    for (id, priority, deps) in stories {
        let story = Story::draft(*id, format!("Story {}", id), *priority, now())
            .with_dependencies(deps.iter().copied());
        backlog.upsert(story, UpsertMode::Create).unwrap();
    }
    backlog
}

fn ids(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_completing_a_root_unblocks_its_dependents() {
    let machine = machine();
    let mut b = backlog(&[
        ("US-001", Priority::P1, &[]),
        ("US-002", Priority::P2, &["US-001"]),
        ("US-003", Priority::P2, &["US-001"]),
    ]);

    for id in ["US-001", "US-002", "US-003"] {
        machine.mark_ready(&mut b, id).unwrap();
    }
    assert_eq!(b.get("US-002").unwrap().status, StoryStatus::Blocked);
    assert_eq!(b.get("US-003").unwrap().status, StoryStatus::Blocked);

    machine.start(&mut b, "US-001").unwrap();
    let outcome = machine.complete(&mut b, "US-001").unwrap();

    assert_eq!(outcome.unblocked, vec!["US-002", "US-003"]);
    assert_eq!(b.get("US-002").unwrap().status, StoryStatus::Ready);
    assert_eq!(b.get("US-003").unwrap().status, StoryStatus::Ready);
    assert_eq!(dependency::ready_set(&b), ids(&["US-002", "US-003"]));
}

#[test]
fn test_two_story_cycle_reports_path() {
    let b = backlog(&[
        ("US-001", Priority::P2, &["US-002"]),
        ("US-002", Priority::P2, &["US-001"]),
    ]);

    match dependency::validate(&b) {
        Err(CoreError::CycleError { path }) => {
            assert_eq!(path, vec!["US-001", "US-002", "US-001"]);
        }
        other => panic!("expected cycle, got {:?}", other),
    }
}

#[test]
fn test_partial_progress() {
    let mut metrics = StoryMetrics::planned(10, 20.0);
    metrics.completed_units = 4;
    let story = Story::draft("US-004", "Reporting", Priority::P2, now()).with_metrics(metrics);
    assert_eq!(progress(&story), 0.4);
}

#[test]
fn test_fan_out_flags_shared_blocker() {
    let mut stories: Vec<(String, Vec<&str>)> = vec![("US-001".to_string(), vec![])];
    for i in 2..=7 {
        stories.push((format!("US-{:03}", i), vec!["US-001"]));
    }
    for i in 8..=10 {
        stories.push((format!("US-{:03}", i), vec![]));
    }

    let mut b = Backlog::new("checkout");
    for (id, deps) in &stories {
        let story = Story::draft(id.as_str(), "Story", Priority::P2, now())
            .with_dependencies(deps.iter().copied());
        b.upsert(story, UpsertMode::Create).unwrap();
    }

    let config = AnalysisConfig::default().with_fanout_threshold(0.2);
    let found = fanout_bottleneck(&b, &config).unwrap().unwrap();
    assert_eq!(found.story_id, "US-001");
    assert_eq!(found.dependents, 6);
    assert_eq!(found.fraction, 0.6);
    assert!(found.flagged);
}

#[test]
fn test_draft_cannot_skip_ready() {
    let machine = machine();
    let mut b = backlog(&[("US-001", Priority::P1, &[]), ("US-002", Priority::P3, &[])]);

    for id in ["US-001", "US-002"] {
        let err = machine
            .transition(&mut b, id, StoryStatus::InProgress)
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidTransition {
                from: StoryStatus::Draft,
                to: StoryStatus::InProgress
            }
        ));
        assert_eq!(b.get(id).unwrap().status, StoryStatus::Draft);
    }
}

// ============================================================================
// Graph Properties
// ============================================================================

#[test]
fn test_topological_order_respects_every_edge() {
    let b = backlog(&[
        ("US-010", Priority::P3, &[]),
        ("US-002", Priority::P1, &["US-010"]),
        ("US-003", Priority::P2, &[]),
        ("US-004", Priority::P1, &["US-003", "US-002"]),
        ("US-005", Priority::P1, &[]),
        ("US-006", Priority::P2, &["US-005", "US-004"]),
        ("US-007", Priority::P3, &["US-010"]),
    ]);

    let order = dependency::topological_order(&b).unwrap();
    assert_eq!(order.len(), b.len());

    let position: HashMap<&str, usize> =
        order.iter().enumerate().map(|(i, id)| (id.as_str(), i)).collect();
    for story in b.iter() {
        for dep in &story.dependencies {
            assert!(position[dep.as_str()] < position[story.id.as_str()]);
        }
    }

    // Deterministic across calls and ties favour priority
    assert_eq!(dependency::topological_order(&b).unwrap(), order);
    assert_eq!(order[0], "US-005");
}

#[test]
fn test_invalid_graphs_are_rejected() {
    let self_dep = backlog(&[("US-001", Priority::P2, &["US-001"])]);
    let err = dependency::validate(&self_dep).unwrap_err();
    assert!(matches!(err, CoreError::SelfDependency { .. }));
    assert_eq!(err.cycle_path().unwrap(), vec!["US-001", "US-001"]);

    let dangling = backlog(&[("US-001", Priority::P2, &["US-999"])]);
    assert!(matches!(
        dependency::validate(&dangling),
        Err(CoreError::DanglingReference { .. })
    ));

    let dag = backlog(&[("US-001", Priority::P2, &[]), ("US-002", Priority::P2, &["US-001"])]);
    assert!(dependency::validate(&dag).is_ok());
}

#[test]
fn test_graph_errors_block_mutations_until_repaired() {
    let machine = machine();
    let mut b = backlog(&[
        ("US-001", Priority::P2, &["US-404"]),
        ("US-002", Priority::P2, &[]),
    ]);
    assert!(machine.mark_ready(&mut b, "US-002").unwrap_err().is_graph_error());

    // Repair through an update, then the same transition succeeds
    let repaired = b.get("US-001").unwrap().clone().with_dependencies(Vec::<String>::new());
    b.upsert(repaired, UpsertMode::Update).unwrap();
    machine.mark_ready(&mut b, "US-002").unwrap();
}

#[test]
fn test_execution_batches_and_next_story() {
    let machine = machine();
    let mut b = backlog(&[
        ("US-001", Priority::P2, &[]),
        ("US-002", Priority::P1, &[]),
        ("US-003", Priority::P1, &["US-001", "US-002"]),
    ]);
    let batches = execution_batches(&b).unwrap();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].story_ids, vec!["US-002", "US-001"]);

    for id in ["US-001", "US-002", "US-003"] {
        machine.mark_ready(&mut b, id).unwrap();
    }
    assert_eq!(dependency::next_story(&b).unwrap().id, "US-002");
}
