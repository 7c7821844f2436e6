//! Stall Detection
//!
//! Compares two snapshots of the same backlog. The analyzer keeps no state
//! between calls, so the caller supplies the earlier snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use story_cascade_core::{Backlog, CoreResult, StoryStatus};

use crate::config::AnalysisConfig;
use crate::services::dependency::DependencyGraph;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StalledStory {
    pub story_id: String,
    pub started_at: DateTime<Utc>,
    /// Whole seconds since `started_at`
    pub in_progress_secs: i64,
    pub completed_units: u32,
    /// Units in the earlier snapshot; 0 when the story was not there
    pub previous_units: u32,
}

/// IN_PROGRESS stories running longer than `stalled_after` with no unit gain.
///
/// Stories without a `started_at` are skipped.
pub fn stalled_stories(
    previous: &Backlog,
    current: &Backlog,
    config: &AnalysisConfig,
    now: DateTime<Utc>,
) -> CoreResult<Vec<StalledStory>> {
    DependencyGraph::build_validated(current)?;
    let threshold = config.stalled_after();

    let stalled = current
        .iter()
        .filter(|s| s.status == StoryStatus::InProgress)
        .filter_map(|story| {
            let started_at = story.started_at?;
            let elapsed = now - started_at;
            if elapsed <= threshold {
                return None;
            }
            let previous_units = previous
                .find(&story.id)
                .map(|p| p.metrics.completed_units)
                .unwrap_or(0);
            if story.metrics.completed_units > previous_units {
                return None;
            }
            Some(StalledStory {
                story_id: story.id.clone(),
                started_at,
                in_progress_secs: elapsed.num_seconds(),
                completed_units: story.metrics.completed_units,
                previous_units,
            })
        })
        .collect::<Vec<_>>();

    if !stalled.is_empty() {
        tracing::debug!(count = stalled.len(), "stalled stories detected");
    }
    Ok(stalled)
}
