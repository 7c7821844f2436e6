//! Analysis Tests
//!
//! Metrics and analyzer reports over a backlog driven through its lifecycle
//! with a manual clock.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use story_cascade::services::analysis::BottleneckKind;
use story_cascade::services::metrics::{
    completion_history, feature_progress, projected_completion, summarize, velocity,
};
use story_cascade::{
    AnalysisConfig, Analyzer, Backlog, Clock, ManualClock, Priority, StatusMachine, Story,
    StoryMetrics, StoryStatus, UpsertMode,
};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap()
}

fn story(id: &str, units: u32, effort: f64, deps: &[&str]) -> Story {
    Story::draft(id, format!("Story {}", id), Priority::P2, start())
        .with_metrics(StoryMetrics::planned(units, effort))
        .with_dependencies(deps.iter().copied())
}

/// Six stories; US-001..US-003 finish on consecutive days with overruns
fn worked_backlog(clock: &Arc<ManualClock>) -> Backlog {
    let machine = StatusMachine::new(clock.clone());
    let mut backlog = Backlog::new("search");
    for s in [
        story("US-001", 5, 10.0, &[]),
        story("US-002", 8, 10.0, &["US-001"]),
        story("US-003", 5, 10.0, &["US-001"]),
        story("US-004", 12, 20.0, &["US-002", "US-003"]),
        story("US-005", 4, 5.0, &["US-004"]),
        story("US-006", 3, 4.0, &[]),
    ] {
        backlog.upsert(s, UpsertMode::Create).unwrap();
    }
    for id in backlog.ids().into_iter().map(String::from).collect::<Vec<_>>() {
        machine.mark_ready(&mut backlog, &id).unwrap();
    }

    for (id, effort) in [("US-001", 13.0), ("US-002", 14.0), ("US-003", 12.5)] {
        machine.start(&mut backlog, id).unwrap();
        let units = backlog.get(id).unwrap().metrics.estimated_units;
        machine.record_progress(&mut backlog, id, units, Some(effort)).unwrap();
        clock.advance(Duration::days(1));
        machine.complete(&mut backlog, id).unwrap();
    }

    machine.start(&mut backlog, "US-004").unwrap();
    machine.record_progress(&mut backlog, "US-004", 2, Some(4.0)).unwrap();
    backlog
}

#[test]
fn test_metrics_over_worked_backlog() {
    let clock = Arc::new(ManualClock::new(start()));
    let backlog = worked_backlog(&clock);

    // 5 + 8 + 5 + 2 of 37 units
    assert!((feature_progress(&backlog) - 20.0 / 37.0).abs() < 1e-9);

    let history = completion_history(&backlog);
    assert_eq!(history.len(), 3);
    let v = velocity(&history, Duration::days(7), clock.now());
    assert_eq!(v.completions, 3);
    assert!(!v.low_confidence);
    assert!((v.units_per_day - 18.0 / 7.0).abs() < 1e-9);

    // 10 + 4 + 3 units remain
    let eta = projected_completion(&backlog, &v, clock.now()).unwrap();
    let expected_secs = (17.0 / (18.0 / 7.0) * 86_400.0_f64).round() as i64;
    assert_eq!(eta, clock.now() + Duration::seconds(expected_secs));

    let summary = summarize(&backlog);
    assert_eq!(summary.count(StoryStatus::Complete), 3);
    assert_eq!(summary.count(StoryStatus::InProgress), 1);
    assert_eq!(summary.count(StoryStatus::Ready), 1);
    assert_eq!(summary.next_story.as_deref(), Some("US-006"));
}

#[test]
fn test_report_with_previous_snapshot() {
    let clock = Arc::new(ManualClock::new(start()));
    let backlog = worked_backlog(&clock);
    let previous = backlog.clone();

    // Four days pass without US-004 moving
    clock.advance(Duration::days(4));
    let config = AnalysisConfig::default();
    let report = Analyzer::new(config).report(&backlog, Some(&previous), clock.now()).unwrap();

    assert_eq!(report.stalled.len(), 1);
    assert_eq!(report.stalled[0].story_id, "US-004");

    assert_eq!(
        report.critical_path.story_ids,
        vec!["US-001", "US-002", "US-004", "US-005"]
    );
    assert_eq!(report.critical_path.total_effort, 45.0);
    assert_eq!(report.chain_depth, 4);

    let estimation = report.estimation.as_ref().unwrap();
    assert_eq!(estimation.story_count, 3);
    assert_eq!(estimation.under_estimated, 3);
    assert!(!estimation.is_accurate());

    // US-005 is the only blocked story, one of three still open
    assert!(report.status_mix.at_risk);
    assert!(report.needs_attention());
}

#[test]
fn test_report_without_previous_skips_stall_detection() {
    let clock = Arc::new(ManualClock::new(start()));
    let backlog = worked_backlog(&clock);
    clock.advance(Duration::days(30));

    let report = Analyzer::default().report(&backlog, None, clock.now()).unwrap();
    assert!(report.stalled.is_empty());
}

#[test]
fn test_blocked_pile_up_is_at_risk() {
    let clock = Arc::new(ManualClock::new(start()));
    let machine = StatusMachine::new(clock.clone());
    let mut backlog = Backlog::new("search");
    backlog.upsert(story("US-001", 5, 10.0, &[]), UpsertMode::Create).unwrap();
    for i in 2..=6 {
        backlog
            .upsert(story(&format!("US-{:03}", i), 5, 10.0, &["US-001"]), UpsertMode::Create)
            .unwrap();
    }
    for id in backlog.ids().into_iter().map(String::from).collect::<Vec<_>>() {
        machine.mark_ready(&mut backlog, &id).unwrap();
    }

    let report = Analyzer::default().report(&backlog, None, clock.now()).unwrap();
    assert_eq!(report.status_mix.blocked, 5);
    assert!(report.status_mix.at_risk);

    let kinds: Vec<_> = report.bottlenecks.iter().map(|b| b.kind).collect();
    assert!(kinds.contains(&BottleneckKind::Dependency));
    assert!(kinds.contains(&BottleneckKind::Blocked));
    assert_eq!(report.fanout.as_ref().unwrap().story_id, "US-001");
}
