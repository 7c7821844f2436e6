//! Critical Path
//!
//! Longest effort-weighted chain through the dependency DAG, computed by
//! dynamic programming over the topological order.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use story_cascade_core::{Backlog, CoreResult};

use crate::services::dependency::DependencyGraph;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalPath {
    /// Dependencies first
    pub story_ids: Vec<String>,
    /// Sum of `estimated_effort` along the path
    pub total_effort: f64,
}

impl CriticalPath {
    pub fn is_empty(&self) -> bool {
        self.story_ids.is_empty()
    }
}

/// The path always ends at a story nothing depends on. Ties between
/// equal-weight predecessors or endpoints go to the story that comes first in
/// topological order.
pub fn critical_path(backlog: &Backlog) -> CoreResult<CriticalPath> {
    let graph = DependencyGraph::build_validated(backlog)?;
    let order = graph.topological_order()?;
    let position: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();

    let mut best: HashMap<&str, f64> = HashMap::with_capacity(order.len());
    let mut previous: HashMap<&str, &str> = HashMap::new();

    for id in &order {
        let weight = backlog.get(id)?.metrics.estimated_effort;

        let mut deps: Vec<&str> = graph.dependencies(id)?.iter().map(String::as_str).collect();
        deps.sort_by_key(|dep| position.get(dep).copied().unwrap_or(usize::MAX));

        let mut longest: Option<(&str, f64)> = None;
        for dep in deps {
            let dist = best.get(dep).copied().unwrap_or(0.0);
            if longest.map(|(_, d)| dist > d).unwrap_or(true) {
                longest = Some((dep, dist));
            }
        }

        let base = match longest {
            Some((dep, dist)) => {
                previous.insert(id.as_str(), dep);
                dist
            }
            None => 0.0,
        };
        best.insert(id.as_str(), base + weight);
    }

    let sinks: HashSet<&str> = graph.sinks().into_iter().collect();
    let mut end: Option<(&str, f64)> = None;
    for id in order.iter().filter(|id| sinks.contains(id.as_str())) {
        let dist = best.get(id.as_str()).copied().unwrap_or(0.0);
        if end.map(|(_, d)| dist > d).unwrap_or(true) {
            end = Some((id.as_str(), dist));
        }
    }

    let Some((end_id, total_effort)) = end else {
        return Ok(CriticalPath::default());
    };

    let mut story_ids = vec![end_id.to_string()];
    let mut cursor = end_id;
    while let Some(&prev) = previous.get(cursor) {
        story_ids.push(prev.to_string());
        cursor = prev;
    }
    story_ids.reverse();

    Ok(CriticalPath {
        story_ids,
        total_effort,
    })
}
