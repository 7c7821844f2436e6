//! Execution Batches
//!
//! Groups the open stories of a backlog into waves. Every story in a wave has
//! its dependencies satisfied by COMPLETE stories or by earlier waves, so the
//! members of one wave can be worked in parallel.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use story_cascade_core::{Backlog, CoreError, CoreResult, Story};

use super::graph::DependencyGraph;

/// A batch of stories that can be worked in parallel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionBatch {
    /// Batch index (1-based for display)
    pub index: usize,
    /// Story ids, highest priority first
    pub story_ids: Vec<String>,
}

impl ExecutionBatch {
    pub fn len(&self) -> usize {
        self.story_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.story_ids.is_empty()
    }
}

/// Layer the non-COMPLETE stories of a validated backlog into batches.
pub fn execution_batches(backlog: &Backlog) -> CoreResult<Vec<ExecutionBatch>> {
    DependencyGraph::build_validated(backlog)?;

    let mut satisfied: HashSet<&str> = backlog.completed_ids();
    let mut remaining: Vec<&Story> = backlog.iter().filter(|s| !s.is_complete()).collect();
    let mut batches = Vec::new();

    while !remaining.is_empty() {
        let (mut ready, blocked): (Vec<&Story>, Vec<&Story>) =
            remaining.into_iter().partition(|story| {
                story
                    .dependencies
                    .iter()
                    .all(|dep| satisfied.contains(dep.as_str()))
            });

        if ready.is_empty() {
            // Unreachable on a validated graph
            return Err(CoreError::CycleError {
                path: blocked.iter().map(|s| s.id.clone()).collect(),
            });
        }

        ready.sort_by(|a, b| (a.priority, &a.id).cmp(&(b.priority, &b.id)));
        for story in &ready {
            satisfied.insert(story.id.as_str());
        }

        batches.push(ExecutionBatch {
            index: batches.len() + 1,
            story_ids: ready.iter().map(|s| s.id.clone()).collect(),
        });
        remaining = blocked;
    }

    Ok(batches)
}
