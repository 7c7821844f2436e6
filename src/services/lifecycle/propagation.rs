//! Completion Propagation
//!
//! Breadth-first walk over the reverse-dependency graph after a story becomes
//! COMPLETE. Each dependent's `blocked_by` is recomputed; a dependency-blocked
//! dependent with nothing left outstanding moves to READY and its own
//! dependents are checked in turn. Each story is examined at most once, so the
//! walk is bounded by the backlog size.

use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Utc};
use story_cascade_core::{Backlog, CoreResult, StoryStatus};

use crate::services::dependency::DependencyGraph;

pub(crate) fn propagate_completion(
    backlog: &mut Backlog,
    graph: &DependencyGraph,
    completed_id: &str,
    now: DateTime<Utc>,
) -> CoreResult<Vec<String>> {
    let mut unblocked = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = VecDeque::new();

    visited.insert(completed_id.to_string());
    queue.push_back(completed_id.to_string());

    while let Some(current) = queue.pop_front() {
        for dependent in graph.dependents(&current)? {
            if !visited.insert(dependent.clone()) {
                continue;
            }

            let remaining = backlog.incomplete_dependencies(dependent)?;
            let story = backlog.get_mut(dependent)?;
            if story.status != StoryStatus::Blocked {
                continue;
            }

            if story.external_blocker.is_some() || !remaining.is_empty() {
                if story.blocked_by != remaining {
                    story.blocked_by = remaining;
                    story.updated_at = now;
                }
                continue;
            }

            story.status = StoryStatus::Ready;
            story.blocked_by.clear();
            story.updated_at = now;
            tracing::debug!(story = %dependent, via = %current, "auto-unblocked");

            unblocked.push(dependent.clone());
            queue.push_back(dependent.clone());
        }
    }

    Ok(unblocked)
}
