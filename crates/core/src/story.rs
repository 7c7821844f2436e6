//! Story Models
//!
//! Data structures for a single schedulable unit of work: lifecycle status,
//! priority, dependency declarations and effort metrics.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Default estimated units for a templated story
pub const DEFAULT_ESTIMATED_UNITS: u32 = 5;

/// Default estimated effort for a templated story
pub const DEFAULT_ESTIMATED_EFFORT: f64 = 10.0;

/// Priority level for stories. Declaration order is sort order: P1 first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Must have
    P1,
    /// Should have
    #[default]
    P2,
    /// Nice to have
    P3,
}

impl Priority {
    /// All priorities, highest first
    pub const ALL: [Priority; 3] = [Priority::P1, Priority::P2, Priority::P3];
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::P1 => write!(f, "P1"),
            Priority::P2 => write!(f, "P2"),
            Priority::P3 => write!(f, "P3"),
        }
    }
}

/// Lifecycle status of a story
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoryStatus {
    #[default]
    Draft,
    Ready,
    InProgress,
    Blocked,
    Complete,
}

impl StoryStatus {
    /// All statuses in lifecycle order
    pub const ALL: [StoryStatus; 5] = [
        StoryStatus::Draft,
        StoryStatus::Ready,
        StoryStatus::InProgress,
        StoryStatus::Blocked,
        StoryStatus::Complete,
    ];

    /// COMPLETE is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, StoryStatus::Complete)
    }

    /// Stories still carrying open work
    pub fn is_open(&self) -> bool {
        !self.is_terminal()
    }
}

impl std::fmt::Display for StoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoryStatus::Draft => write!(f, "draft"),
            StoryStatus::Ready => write!(f, "ready"),
            StoryStatus::InProgress => write!(f, "in_progress"),
            StoryStatus::Blocked => write!(f, "blocked"),
            StoryStatus::Complete => write!(f, "complete"),
        }
    }
}

/// Size and effort tracking for a story
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StoryMetrics {
    /// Planned units of work (tasks)
    #[serde(default)]
    pub estimated_units: u32,
    /// Units finished so far
    #[serde(default)]
    pub completed_units: u32,
    /// Planned effort (hours)
    #[serde(default)]
    pub estimated_effort: f64,
    /// Effort spent so far (hours)
    #[serde(default)]
    pub actual_effort: f64,
    /// Caller-supplied quality signal, e.g. test coverage
    #[serde(default)]
    pub quality_score: f64,
}

impl StoryMetrics {
    /// Metrics for a freshly planned story
    pub fn planned(estimated_units: u32, estimated_effort: f64) -> Self {
        Self {
            estimated_units,
            estimated_effort,
            ..Self::default()
        }
    }

    /// `completed_units > estimated_units`; flagged by callers, never rejected
    pub fn is_over_reported(&self) -> bool {
        self.completed_units > self.estimated_units
    }

    /// Units still outstanding, never negative
    pub fn remaining_units(&self) -> u32 {
        self.estimated_units.saturating_sub(self.completed_units)
    }

    /// Reject negative or non-finite numbers
    pub fn validate(&self) -> CoreResult<()> {
        let fields = [
            ("estimated_effort", self.estimated_effort),
            ("actual_effort", self.actual_effort),
            ("quality_score", self.quality_score),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(CoreError::validation(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// A single story in a feature backlog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    /// Stable identifier, `US-###`
    pub id: String,
    /// Owning epic; informational only
    #[serde(default, alias = "epic_id")]
    pub parent_id: Option<String>,
    /// Story title
    pub title: String,
    /// Detailed description of the story
    #[serde(default)]
    pub description: String,
    /// Acceptance criteria, free text
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    /// Priority level
    #[serde(default)]
    pub priority: Priority,
    /// Current status
    #[serde(default)]
    pub status: StoryStatus,
    /// Story ids that must be COMPLETE before this story may start
    #[serde(default)]
    pub dependencies: BTreeSet<String>,
    /// Dependencies that are not yet COMPLETE while this story is BLOCKED
    #[serde(default)]
    pub blocked_by: BTreeSet<String>,
    /// Note for a block that does not come from dependencies
    #[serde(default)]
    pub external_blocker: Option<String>,
    /// Size and effort tracking
    #[serde(default)]
    pub metrics: StoryMetrics,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Story {
    /// Create a new DRAFT story with required fields
    pub fn new(id: impl Into<String>, title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            title: title.into(),
            description: String::new(),
            acceptance_criteria: Vec::new(),
            priority: Priority::default(),
            status: StoryStatus::Draft,
            dependencies: BTreeSet::new(),
            blocked_by: BTreeSet::new(),
            external_blocker: None,
            metrics: StoryMetrics::default(),
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    /// DRAFT story with the default size estimate
    pub fn draft(
        id: impl Into<String>,
        title: impl Into<String>,
        priority: Priority,
        now: DateTime<Utc>,
    ) -> Self {
        Self::new(id, title, now)
            .with_priority(priority)
            .with_metrics(StoryMetrics::planned(
                DEFAULT_ESTIMATED_UNITS,
                DEFAULT_ESTIMATED_EFFORT,
            ))
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_metrics(mut self, metrics: StoryMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Whether this story is COMPLETE
    pub fn is_complete(&self) -> bool {
        self.status == StoryStatus::Complete
    }

    /// Whether the current block is dependency-based
    pub fn is_dependency_blocked(&self) -> bool {
        self.status == StoryStatus::Blocked && self.external_blocker.is_none()
    }

    /// Check the id format and metric ranges
    pub fn validate(&self) -> CoreResult<()> {
        if !is_valid_story_id(&self.id) {
            return Err(CoreError::validation(format!(
                "Invalid story id '{}': expected US-###",
                self.id
            )));
        }
        if self.title.trim().is_empty() {
            return Err(CoreError::validation(format!(
                "Story '{}' must have a title",
                self.id
            )));
        }
        self.metrics.validate()
    }
}

/// `US-` followed by at least three ASCII digits
pub fn is_valid_story_id(id: &str) -> bool {
    match id.strip_prefix("US-") {
        Some(digits) => digits.len() >= 3 && digits.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}
