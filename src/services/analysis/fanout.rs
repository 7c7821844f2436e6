//! Fan-out Bottleneck
//!
//! The open story that the most other stories depend on directly.

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};
use story_cascade_core::{Backlog, CoreResult};

use crate::config::AnalysisConfig;
use crate::services::dependency::DependencyGraph;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FanoutBottleneck {
    pub story_id: String,
    /// Direct dependents, any status
    pub dependents: usize,
    pub total_stories: usize,
    /// `dependents / total_stories`
    pub fraction: f64,
    /// Whether `fraction` exceeds the configured threshold
    pub flagged: bool,
}

/// Largest direct-dependent set among non-COMPLETE stories.
///
/// Ties go to the higher priority, then the lower id. `None` when no open
/// story has dependents.
pub fn fanout_bottleneck(
    backlog: &Backlog,
    config: &AnalysisConfig,
) -> CoreResult<Option<FanoutBottleneck>> {
    let graph = DependencyGraph::build_validated(backlog)?;

    let mut best = None;
    for story in backlog.iter().filter(|s| !s.is_complete()) {
        let count = graph.dependents(&story.id)?.len();
        if count == 0 {
            continue;
        }
        let key = (Reverse(count), story.priority, story.id.as_str());
        if best.as_ref().map(|b| key < *b).unwrap_or(true) {
            best = Some(key);
        }
    }

    Ok(best.map(|(Reverse(count), _, id)| {
        let total = backlog.len();
        let fraction = count as f64 / total as f64;
        let flagged = fraction > config.fanout_threshold;
        if flagged {
            tracing::debug!(story = %id, dependents = count, "fan-out bottleneck flagged");
        }
        FanoutBottleneck {
            story_id: id.to_string(),
            dependents: count,
            total_stories: total,
            fraction,
            flagged,
        }
    }))
}
