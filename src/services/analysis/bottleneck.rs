//! Bottleneck Catalogue
//!
//! Rule-based detectors for work that is holding the backlog up. Each finding
//! carries a severity in `[0, 1]`; impact is severity times the number of
//! affected stories, and findings are returned highest impact first.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use story_cascade_core::{Backlog, CoreResult, StoryStatus};

use crate::services::dependency::DependencyGraph;
use crate::services::metrics::progress;

/// Open stories a single blocker must hold up to count
const DEPENDENCY_MIN_BLOCKED: usize = 3;
const COMPLEXITY_MIN_UNITS: u32 = 20;
const COMPLEXITY_MAX_PROGRESS: f64 = 0.3;
const WIP_LIMIT: usize = 5;
const BLOCKED_LIMIT: usize = 3;
const OVERRUN_RATIO: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BottleneckKind {
    /// An open story that several open stories depend on
    Dependency,
    /// A large IN_PROGRESS story with little progress
    Complexity,
    /// Too many stories IN_PROGRESS at once
    WorkInProgress,
    /// Too many stories BLOCKED at once
    Blocked,
    /// An IN_PROGRESS story well over its effort estimate
    LongDuration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bottleneck {
    pub kind: BottleneckKind,
    /// Story the finding is about, when it concerns one story
    pub story_id: Option<String>,
    pub severity: f64,
    pub affected: Vec<String>,
    pub description: String,
}

impl Bottleneck {
    pub fn impact(&self) -> f64 {
        self.severity * self.affected.len() as f64
    }
}

/// Every bottleneck in the backlog, highest impact first
pub fn detect_bottlenecks(backlog: &Backlog) -> CoreResult<Vec<Bottleneck>> {
    DependencyGraph::build_validated(backlog)?;

    let mut found = dependency_bottlenecks(backlog);
    found.extend(complexity_bottlenecks(backlog));
    found.extend(status_bottlenecks(backlog));
    found.extend(duration_bottlenecks(backlog));

    // Stable sort keeps detector order for equal impact
    found.sort_by(|a, b| b.impact().total_cmp(&a.impact()));
    Ok(found)
}

fn dependency_bottlenecks(backlog: &Backlog) -> Vec<Bottleneck> {
    let mut blocking: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for story in backlog.iter() {
        for dep in &story.dependencies {
            if backlog.find(dep).map(|d| !d.is_complete()).unwrap_or(false) {
                blocking.entry(dep.as_str()).or_default().push(story.id.clone());
            }
        }
    }

    blocking
        .into_iter()
        .filter(|(_, blocked)| blocked.len() >= DEPENDENCY_MIN_BLOCKED)
        .map(|(id, blocked)| {
            let title = backlog.find(id).map(|s| s.title.as_str()).unwrap_or_default();
            Bottleneck {
                kind: BottleneckKind::Dependency,
                story_id: Some(id.to_string()),
                severity: (blocked.len() as f64 / 10.0).min(1.0),
                description: format!(
                    "Story {} ({}) is blocking {} other stories",
                    id,
                    title,
                    blocked.len()
                ),
                affected: blocked,
            }
        })
        .collect()
}

fn complexity_bottlenecks(backlog: &Backlog) -> Vec<Bottleneck> {
    backlog
        .stories_by_status(StoryStatus::InProgress)
        .into_iter()
        .filter(|s| s.metrics.estimated_units > COMPLEXITY_MIN_UNITS)
        .filter(|s| progress(s) < COMPLEXITY_MAX_PROGRESS)
        .map(|s| {
            let units = s.metrics.estimated_units;
            Bottleneck {
                kind: BottleneckKind::Complexity,
                story_id: Some(s.id.clone()),
                severity: ((units - COMPLEXITY_MIN_UNITS) as f64 / 30.0).min(1.0),
                affected: vec![s.id.clone()],
                description: format!(
                    "Story {} has {} units with {:.1}% progress",
                    s.id,
                    units,
                    progress(s) * 100.0
                ),
            }
        })
        .collect()
}

fn status_bottlenecks(backlog: &Backlog) -> Vec<Bottleneck> {
    let mut found = Vec::new();

    let in_progress = backlog.stories_by_status(StoryStatus::InProgress);
    if in_progress.len() > WIP_LIMIT {
        found.push(Bottleneck {
            kind: BottleneckKind::WorkInProgress,
            story_id: None,
            severity: (in_progress.len() as f64 / 10.0).min(1.0),
            description: format!("{} stories are in progress simultaneously", in_progress.len()),
            affected: in_progress.iter().map(|s| s.id.clone()).collect(),
        });
    }

    let blocked = backlog.stories_by_status(StoryStatus::Blocked);
    if blocked.len() > BLOCKED_LIMIT {
        found.push(Bottleneck {
            kind: BottleneckKind::Blocked,
            story_id: None,
            severity: (blocked.len() as f64 / 5.0).min(1.0),
            description: format!("{} stories are blocked", blocked.len()),
            affected: blocked.iter().map(|s| s.id.clone()).collect(),
        });
    }

    found
}

fn duration_bottlenecks(backlog: &Backlog) -> Vec<Bottleneck> {
    backlog
        .stories_by_status(StoryStatus::InProgress)
        .into_iter()
        .filter(|s| s.metrics.estimated_effort > 0.0)
        .filter_map(|s| {
            let ratio = s.metrics.actual_effort / s.metrics.estimated_effort;
            (ratio > OVERRUN_RATIO).then(|| Bottleneck {
                kind: BottleneckKind::LongDuration,
                story_id: Some(s.id.clone()),
                severity: ((ratio - 1.0) / 2.0).min(1.0),
                affected: vec![s.id.clone()],
                description: format!(
                    "Story {} is taking {:.1}x longer than estimated ({:.1}h vs {:.1}h)",
                    s.id, ratio, s.metrics.actual_effort, s.metrics.estimated_effort
                ),
            })
        })
        .collect()
}
