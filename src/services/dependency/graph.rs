//! Dependency Graph
//!
//! Explicit adjacency for a backlog: `forward[a]` holds the stories `a` depends
//! on, `reverse[b]` holds the stories depending on `b`. Built once per snapshot
//! instead of re-reading story declarations on every query.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

use story_cascade_core::{Backlog, CoreError, CoreResult, Priority, StoryStatus};

/// DFS marker distinguishing "on the current path" from "fully processed"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Directed graph where an edge `a -> b` means "a depends on b"
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Story ids in backlog insertion order
    nodes: Vec<String>,
    priorities: HashMap<String, Priority>,
    forward: HashMap<String, BTreeSet<String>>,
    reverse: HashMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    /// Build the adjacency maps without validating them.
    ///
    /// Dangling references stay in `forward` so [`validate`](Self::validate)
    /// can report them; they never appear in `reverse`.
    pub fn build(backlog: &Backlog) -> Self {
        let mut nodes = Vec::with_capacity(backlog.len());
        let mut priorities = HashMap::with_capacity(backlog.len());
        let mut forward = HashMap::with_capacity(backlog.len());
        let mut reverse: HashMap<String, BTreeSet<String>> = HashMap::with_capacity(backlog.len());

        for story in backlog.iter() {
            nodes.push(story.id.clone());
            priorities.insert(story.id.clone(), story.priority);
            forward.insert(story.id.clone(), story.dependencies.clone());
            reverse.entry(story.id.clone()).or_default();
        }

        for story in backlog.iter() {
            for dep in &story.dependencies {
                if let Some(dependents) = reverse.get_mut(dep) {
                    dependents.insert(story.id.clone());
                }
            }
        }

        Self {
            nodes,
            priorities,
            forward,
            reverse,
        }
    }

    /// Build and validate in one step
    pub fn build_validated(backlog: &Backlog) -> CoreResult<Self> {
        let graph = Self::build(backlog);
        graph.validate()?;
        Ok(graph)
    }

    /// Number of stories in the graph
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Story ids in backlog insertion order
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn contains(&self, id: &str) -> bool {
        self.forward.contains_key(id)
    }

    /// Stories `id` depends on
    pub fn dependencies(&self, id: &str) -> CoreResult<&BTreeSet<String>> {
        self.forward
            .get(id)
            .ok_or_else(|| CoreError::not_found(format!("Story not found: {}", id)))
    }

    /// Stories that list `id` in their dependencies
    pub fn dependents(&self, id: &str) -> CoreResult<&BTreeSet<String>> {
        self.reverse
            .get(id)
            .ok_or_else(|| CoreError::not_found(format!("Story not found: {}", id)))
    }

    /// Stories with no dependencies
    pub fn roots(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|id| self.forward.get(*id).map(BTreeSet::is_empty).unwrap_or(true))
            .map(String::as_str)
            .collect()
    }

    /// Stories nothing depends on
    pub fn sinks(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|id| self.reverse.get(*id).map(BTreeSet::is_empty).unwrap_or(true))
            .map(String::as_str)
            .collect()
    }

    /// Check for self-dependencies, dangling references and cycles.
    ///
    /// Per story in insertion order, a self-dependency is reported before a
    /// dangling reference. Cycle search runs only once both pass for every
    /// story and returns the first cycle found.
    pub fn validate(&self) -> CoreResult<()> {
        for id in &self.nodes {
            let deps = match self.forward.get(id) {
                Some(deps) => deps,
                None => continue,
            };
            if deps.contains(id) {
                return Err(CoreError::SelfDependency { id: id.clone() });
            }
            if let Some(missing) = deps.iter().find(|dep| !self.forward.contains_key(*dep)) {
                return Err(CoreError::DanglingReference {
                    story: id.clone(),
                    dependency: missing.clone(),
                });
            }
        }

        if let Some(path) = self.find_cycle() {
            return Err(CoreError::CycleError { path });
        }

        tracing::debug!(stories = self.nodes.len(), "dependency graph validated");
        Ok(())
    }

    /// Depth-first cycle search. Returns the cycle path, closed on its start.
    fn find_cycle(&self) -> Option<Vec<String>> {
        let mut marks: HashMap<&str, Mark> = HashMap::with_capacity(self.nodes.len());
        let mut path: Vec<&str> = Vec::new();

        for id in &self.nodes {
            if !marks.contains_key(id.as_str()) {
                if let Some(cycle) = self.visit(id, &mut marks, &mut path) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn visit<'a>(
        &'a self,
        node: &'a str,
        marks: &mut HashMap<&'a str, Mark>,
        path: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
        marks.insert(node, Mark::Visiting);
        path.push(node);

        if let Some(deps) = self.forward.get(node) {
            for dep in deps {
                match marks.get(dep.as_str()) {
                    Some(Mark::Visiting) => {
                        let start = path.iter().position(|id| *id == dep.as_str()).unwrap_or(0);
                        let mut cycle: Vec<String> =
                            path[start..].iter().map(|id| id.to_string()).collect();
                        cycle.push(dep.clone());
                        return Some(cycle);
                    }
                    Some(Mark::Done) => {}
                    None if self.forward.contains_key(dep.as_str()) => {
                        if let Some(cycle) = self.visit(dep, marks, path) {
                            return Some(cycle);
                        }
                    }
                    None => {}
                }
            }
        }

        path.pop();
        marks.insert(node, Mark::Done);
        None
    }

    /// Kahn's algorithm with a priority queue.
    ///
    /// Every dependency precedes its dependents. Among stories whose
    /// dependencies are all placed, P1 comes before P2 before P3, then ids
    /// ascend.
    pub fn topological_order(&self) -> CoreResult<Vec<String>> {
        self.validate()?;

        let mut in_degree: HashMap<&str, usize> = self
            .nodes
            .iter()
            .map(|id| (id.as_str(), self.forward.get(id).map(BTreeSet::len).unwrap_or(0)))
            .collect();

        let mut queue: BinaryHeap<Reverse<(Priority, &str)>> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| Reverse((self.priority_of(id), *id)))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(Reverse((_, id))) = queue.pop() {
            order.push(id.to_string());
            if let Some(dependents) = self.reverse.get(id) {
                for dependent in dependents {
                    if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                        *degree = degree.saturating_sub(1);
                        if *degree == 0 {
                            queue.push(Reverse((self.priority_of(dependent), dependent.as_str())));
                        }
                    }
                }
            }
        }

        Ok(order)
    }

    fn priority_of(&self, id: &str) -> Priority {
        self.priorities.get(id).copied().unwrap_or_default()
    }

    /// READY stories whose dependencies are all COMPLETE
    pub fn ready_set(&self, backlog: &Backlog) -> BTreeSet<String> {
        backlog
            .iter()
            .filter(|story| story.status == StoryStatus::Ready)
            .filter(|story| {
                story
                    .dependencies
                    .iter()
                    .all(|dep| backlog.find(dep).map(|d| d.is_complete()).unwrap_or(false))
            })
            .map(|story| story.id.clone())
            .collect()
    }

    /// Longest dependency chain, counted in stories
    pub fn max_chain_depth(&self) -> CoreResult<usize> {
        let order = self.topological_order()?;
        let mut depth: HashMap<&str, usize> = HashMap::with_capacity(order.len());

        for id in &order {
            let longest_dep = self
                .forward
                .get(id)
                .into_iter()
                .flatten()
                .filter_map(|dep| depth.get(dep.as_str()).copied())
                .max()
                .unwrap_or(0);
            depth.insert(id.as_str(), longest_dep + 1);
        }

        Ok(depth.values().copied().max().unwrap_or(0))
    }
}
