//! Status State Machine
//!
//! Enforces the story lifecycle:
//!
//! ```text
//! DRAFT -> READY -> IN_PROGRESS -> COMPLETE
//!            ^  \       |
//!            |   v      v
//!            +-- BLOCKED
//! ```
//!
//! Every operation validates the dependency graph first; a cyclic or dangling
//! backlog rejects all mutations. Timestamps come from the injected clock.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use story_cascade_core::{Backlog, Clock, CoreError, CoreResult, StoryStatus};

use super::propagation::propagate_completion;
use crate::services::dependency::DependencyGraph;

/// Every legal `(from, to)` pair
pub const LEGAL_TRANSITIONS: [(StoryStatus, StoryStatus); 6] = [
    (StoryStatus::Draft, StoryStatus::Ready),
    (StoryStatus::Ready, StoryStatus::InProgress),
    (StoryStatus::Ready, StoryStatus::Blocked),
    (StoryStatus::InProgress, StoryStatus::Complete),
    (StoryStatus::InProgress, StoryStatus::Blocked),
    (StoryStatus::Blocked, StoryStatus::Ready),
];

/// Whether the lifecycle table allows `from -> to`
pub fn is_legal(from: StoryStatus, to: StoryStatus) -> bool {
    LEGAL_TRANSITIONS.contains(&(from, to))
}

/// Why a story is being blocked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    /// At least one dependency is not COMPLETE
    Dependencies,
    /// Something outside the backlog; only valid for IN_PROGRESS stories.
    ///
    /// The note is stored as `external_blocker` and must not be blank. It is
    /// what keeps the story BLOCKED when `blocked_by` is empty because every
    /// dependency is already COMPLETE.
    External(String),
}

/// Result of a committed transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOutcome {
    pub story_id: String,
    pub from: StoryStatus,
    /// Status the caller asked for
    pub requested: StoryStatus,
    /// Status after system-triggered follow-ups (DRAFT -> READY may land on BLOCKED)
    pub status: StoryStatus,
    /// Dependents moved BLOCKED -> READY by propagation, in BFS order
    pub unblocked: Vec<String>,
    pub at: chrono::DateTime<chrono::Utc>,
}

/// Stories moved by [`StatusMachine::reconcile_blocked`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub blocked: Vec<String>,
    pub unblocked: Vec<String>,
}

impl ReconcileReport {
    pub fn changed(&self) -> usize {
        self.blocked.len() + self.unblocked.len()
    }
}

/// Applies lifecycle operations to a backlog
#[derive(Clone)]
pub struct StatusMachine {
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for StatusMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusMachine").finish_non_exhaustive()
    }
}

impl StatusMachine {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Move a story to `to`. A BLOCKED target is treated as a dependency block.
    pub fn transition(
        &self,
        backlog: &mut Backlog,
        id: &str,
        to: StoryStatus,
    ) -> CoreResult<TransitionOutcome> {
        match to {
            StoryStatus::Blocked => self.block(backlog, id, BlockReason::Dependencies),
            _ => self.apply(backlog, id, to),
        }
    }

    /// DRAFT -> READY, or a manual BLOCKED -> READY
    pub fn mark_ready(&self, backlog: &mut Backlog, id: &str) -> CoreResult<TransitionOutcome> {
        self.apply(backlog, id, StoryStatus::Ready)
    }

    /// READY -> IN_PROGRESS
    pub fn start(&self, backlog: &mut Backlog, id: &str) -> CoreResult<TransitionOutcome> {
        self.apply(backlog, id, StoryStatus::InProgress)
    }

    /// IN_PROGRESS -> COMPLETE, then propagate to dependents
    pub fn complete(&self, backlog: &mut Backlog, id: &str) -> CoreResult<TransitionOutcome> {
        self.apply(backlog, id, StoryStatus::Complete)
    }

    /// Manual BLOCKED -> READY
    pub fn unblock(&self, backlog: &mut Backlog, id: &str) -> CoreResult<TransitionOutcome> {
        let from = backlog.get(id)?.status;
        if from != StoryStatus::Blocked {
            return Err(self.reject(id, from, StoryStatus::Ready));
        }
        self.apply(backlog, id, StoryStatus::Ready)
    }

    /// READY/IN_PROGRESS -> BLOCKED
    pub fn block(
        &self,
        backlog: &mut Backlog,
        id: &str,
        reason: BlockReason,
    ) -> CoreResult<TransitionOutcome> {
        DependencyGraph::build_validated(backlog)?;

        let from = backlog.get(id)?.status;
        let to = StoryStatus::Blocked;
        if !is_legal(from, to) {
            return Err(self.reject(id, from, to));
        }

        let incomplete = backlog.incomplete_dependencies(id)?;
        let external = match reason {
            BlockReason::Dependencies if incomplete.is_empty() => {
                return Err(self.reject(id, from, to));
            }
            BlockReason::Dependencies => None,
            BlockReason::External(_) if from == StoryStatus::Ready => {
                return Err(self.reject(id, from, to));
            }
            BlockReason::External(note) if note.trim().is_empty() => {
                return Err(CoreError::validation(format!(
                    "Story '{}' needs a reason for an external block",
                    id
                )));
            }
            BlockReason::External(note) => Some(note),
        };

        let now = self.clock.now();
        let story = backlog.get_mut(id)?;
        story.status = to;
        story.blocked_by = incomplete;
        story.external_blocker = external;
        story.updated_at = now;

        tracing::info!(story = %id, from = %from, to = %to, "story blocked");
        Ok(TransitionOutcome {
            story_id: id.to_string(),
            from,
            requested: to,
            status: to,
            unblocked: Vec::new(),
            at: now,
        })
    }

    fn apply(
        &self,
        backlog: &mut Backlog,
        id: &str,
        to: StoryStatus,
    ) -> CoreResult<TransitionOutcome> {
        let graph = DependencyGraph::build_validated(backlog)?;

        let from = backlog.get(id)?.status;
        if !is_legal(from, to) || to == StoryStatus::Blocked {
            return Err(self.reject(id, from, to));
        }

        let now = self.clock.now();
        let incomplete = backlog.incomplete_dependencies(id)?;
        let mut unblocked = Vec::new();

        let status = match (from, to) {
            (StoryStatus::Draft, StoryStatus::Ready) => {
                let story = backlog.get_mut(id)?;
                if incomplete.is_empty() {
                    story.status = StoryStatus::Ready;
                } else {
                    tracing::debug!(story = %id, waiting_on = incomplete.len(), "ready story auto-blocked");
                    story.status = StoryStatus::Blocked;
                    story.blocked_by = incomplete;
                }
                story.updated_at = now;
                story.status
            }
            (StoryStatus::Ready, StoryStatus::InProgress) => {
                ensure_complete(id, &incomplete)?;
                let story = backlog.get_mut(id)?;
                story.status = StoryStatus::InProgress;
                story.started_at = Some(now);
                story.updated_at = now;
                story.status
            }
            (StoryStatus::Blocked, StoryStatus::Ready) => {
                // An external block is lifted on request; reconciliation
                // re-blocks the story if dependencies are still open.
                if backlog.get(id)?.external_blocker.is_none() {
                    ensure_complete(id, &incomplete)?;
                }
                let story = backlog.get_mut(id)?;
                story.status = StoryStatus::Ready;
                story.blocked_by.clear();
                story.external_blocker = None;
                story.updated_at = now;
                story.status
            }
            (StoryStatus::InProgress, StoryStatus::Complete) => {
                {
                    let story = backlog.get_mut(id)?;
                    story.status = StoryStatus::Complete;
                    story.completed_at = Some(now);
                    story.blocked_by.clear();
                    story.external_blocker = None;
                    story.updated_at = now;
                }
                unblocked = propagate_completion(backlog, &graph, id, now)?;
                StoryStatus::Complete
            }
            _ => return Err(self.reject(id, from, to)),
        };

        tracing::info!(
            story = %id,
            from = %from,
            to = %status,
            unblocked = unblocked.len(),
            "story transitioned"
        );

        Ok(TransitionOutcome {
            story_id: id.to_string(),
            from,
            requested: to,
            status,
            unblocked,
            at: now,
        })
    }

    /// Record unit and effort progress on an open story.
    ///
    /// `completed_units > estimated_units` is logged, not rejected. Completion
    /// stays an explicit transition.
    pub fn record_progress(
        &self,
        backlog: &mut Backlog,
        id: &str,
        completed_units: u32,
        actual_effort: Option<f64>,
    ) -> CoreResult<()> {
        DependencyGraph::build_validated(backlog)?;

        if let Some(effort) = actual_effort {
            if !effort.is_finite() || effort < 0.0 {
                return Err(CoreError::validation(format!(
                    "actual_effort must be a non-negative number, got {}",
                    effort
                )));
            }
        }

        let now = self.clock.now();
        let story = backlog.get_mut(id)?;
        if story.is_complete() {
            return Err(CoreError::validation(format!(
                "Story '{}' is complete; progress is frozen",
                id
            )));
        }

        story.metrics.completed_units = completed_units;
        if let Some(effort) = actual_effort {
            story.metrics.actual_effort = effort;
        }
        story.updated_at = now;

        if story.metrics.is_over_reported() {
            tracing::warn!(
                story = %id,
                completed = story.metrics.completed_units,
                estimated = story.metrics.estimated_units,
                "completed units exceed estimate"
            );
        }
        Ok(())
    }

    /// Bring every READY/BLOCKED story in line with its dependencies.
    ///
    /// READY stories with incomplete dependencies become BLOCKED; dependency-
    /// blocked stories whose dependencies are all COMPLETE become READY.
    /// IN_PROGRESS stories are never touched.
    pub fn reconcile_blocked(&self, backlog: &mut Backlog) -> CoreResult<ReconcileReport> {
        DependencyGraph::build_validated(backlog)?;

        let now = self.clock.now();
        let mut report = ReconcileReport::default();
        let ids: Vec<String> = backlog.ids().into_iter().map(String::from).collect();

        for id in ids {
            let incomplete = backlog.incomplete_dependencies(&id)?;
            let story = backlog.get_mut(&id)?;
            match story.status {
                StoryStatus::Ready if !incomplete.is_empty() => {
                    story.status = StoryStatus::Blocked;
                    story.blocked_by = incomplete;
                    story.updated_at = now;
                    report.blocked.push(id);
                }
                StoryStatus::Blocked if story.external_blocker.is_none() && incomplete.is_empty() => {
                    story.status = StoryStatus::Ready;
                    story.blocked_by.clear();
                    story.updated_at = now;
                    report.unblocked.push(id);
                }
                StoryStatus::Blocked if story.blocked_by != incomplete => {
                    story.blocked_by = incomplete;
                    story.updated_at = now;
                }
                _ => {}
            }
        }

        if report.changed() > 0 {
            tracing::info!(
                blocked = report.blocked.len(),
                unblocked = report.unblocked.len(),
                "reconciled blocked status"
            );
        }
        Ok(report)
    }

    fn reject(&self, id: &str, from: StoryStatus, to: StoryStatus) -> CoreError {
        tracing::warn!(story = %id, from = %from, to = %to, "transition rejected");
        CoreError::invalid_transition(from, to)
    }
}

fn ensure_complete(id: &str, incomplete: &BTreeSet<String>) -> CoreResult<()> {
    if incomplete.is_empty() {
        return Ok(());
    }
    tracing::warn!(story = %id, waiting_on = incomplete.len(), "dependencies incomplete");
    Err(CoreError::DependenciesIncomplete {
        ids: incomplete.iter().cloned().collect(),
    })
}
