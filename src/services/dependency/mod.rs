//! Dependency Analysis Module
//!
//! Builds the dependency graph of a backlog, validates it (self-dependencies,
//! dangling references, cycles) and answers ordering questions: topological
//! order, what is ready to start, who depends on a story, and execution batches.

mod batches;
mod graph;

use std::collections::BTreeSet;

use story_cascade_core::{Backlog, CoreResult, Story};

pub use batches::{execution_batches, ExecutionBatch};
pub use graph::DependencyGraph;

/// Ok iff the dependency relation is a DAG over existing stories
pub fn validate(backlog: &Backlog) -> CoreResult<()> {
    DependencyGraph::build(backlog).validate()
}

/// Dependencies first; ties by priority then id
pub fn topological_order(backlog: &Backlog) -> CoreResult<Vec<String>> {
    DependencyGraph::build(backlog).topological_order()
}

/// READY stories whose dependencies are all COMPLETE
pub fn ready_set(backlog: &Backlog) -> BTreeSet<String> {
    DependencyGraph::build(backlog).ready_set(backlog)
}

/// Stories that list `id` in their dependencies
pub fn dependents(backlog: &Backlog, id: &str) -> CoreResult<BTreeSet<String>> {
    DependencyGraph::build(backlog).dependents(id).cloned()
}

/// Highest-priority story in the ready set, then lowest id
pub fn next_story(backlog: &Backlog) -> Option<&Story> {
    let ready = ready_set(backlog);
    backlog
        .iter()
        .filter(|story| ready.contains(&story.id))
        .min_by(|a, b| (a.priority, &a.id).cmp(&(b.priority, &b.id)))
}
