//! Backlog Container
//!
//! An insertion-ordered collection of stories scoped to one feature. Keys are
//! unique; CRUD goes through [`Backlog::upsert`] so create/update intent is
//! explicit. Lifecycle fields are owned by the state machine and survive an
//! update untouched.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::story::{Priority, Story, StoryStatus};

/// Whether an upsert creates a new story or replaces an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertMode {
    Create,
    Update,
}

/// Persisted shape of a backlog
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BacklogRecord {
    #[serde(default = "default_version")]
    version: String,
    feature_id: String,
    #[serde(default)]
    stories: Vec<Story>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

/// All stories of one feature, in insertion order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BacklogRecord", into = "BacklogRecord")]
pub struct Backlog {
    version: String,
    feature_id: String,
    stories: Vec<Story>,
}

impl TryFrom<BacklogRecord> for Backlog {
    type Error = CoreError;

    fn try_from(record: BacklogRecord) -> CoreResult<Self> {
        let mut backlog = Backlog::from_stories(record.feature_id, record.stories)?;
        backlog.version = record.version;
        Ok(backlog)
    }
}

impl From<Backlog> for BacklogRecord {
    fn from(backlog: Backlog) -> Self {
        Self {
            version: backlog.version,
            feature_id: backlog.feature_id,
            stories: backlog.stories,
        }
    }
}

impl Backlog {
    /// Create an empty backlog for a feature
    pub fn new(feature_id: impl Into<String>) -> Self {
        Self {
            version: default_version(),
            feature_id: feature_id.into(),
            stories: Vec::new(),
        }
    }

    /// Build a backlog from decoded stories, rejecting duplicate ids
    pub fn from_stories(feature_id: impl Into<String>, stories: Vec<Story>) -> CoreResult<Self> {
        let mut seen = HashSet::new();
        for story in &stories {
            if !seen.insert(story.id.as_str()) {
                return Err(CoreError::DuplicateIdConflict(story.id.clone()));
            }
        }
        Ok(Self {
            version: default_version(),
            feature_id: feature_id.into(),
            stories,
        })
    }

    pub fn feature_id(&self) -> &str {
        &self.feature_id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.stories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.stories.iter().position(|s| s.id == id)
    }

    /// Get a story by id
    pub fn get(&self, id: &str) -> CoreResult<&Story> {
        self.find(id)
            .ok_or_else(|| CoreError::not_found(format!("Story not found: {}", id)))
    }

    /// Get a story by id, `None` when absent
    pub fn find(&self, id: &str) -> Option<&Story> {
        self.stories.iter().find(|s| s.id == id)
    }

    /// Mutable access for the lifecycle engine. Callers outside the state
    /// machine should go through [`Backlog::upsert`].
    pub fn get_mut(&mut self, id: &str) -> CoreResult<&mut Story> {
        self.stories
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| CoreError::not_found(format!("Story not found: {}", id)))
    }

    /// All stories in insertion order
    pub fn all(&self) -> &[Story] {
        &self.stories
    }

    pub fn iter(&self) -> impl Iterator<Item = &Story> {
        self.stories.iter()
    }

    /// All story ids in insertion order
    pub fn ids(&self) -> Vec<&str> {
        self.stories.iter().map(|s| s.id.as_str()).collect()
    }

    /// Create or replace a story.
    ///
    /// `Create` requires a new id and a DRAFT story. `Update` requires an
    /// existing id and keeps the stored lifecycle fields (status, blockers,
    /// lifecycle timestamps); everything else is replaced. Blockers no longer
    /// among the new dependencies are dropped; the status move for a story
    /// left with no blockers is up to `reconcile_blocked`.
    pub fn upsert(&mut self, story: Story, mode: UpsertMode) -> CoreResult<()> {
        story.validate()?;

        match (mode, self.position(&story.id)) {
            (UpsertMode::Create, Some(_)) => Err(CoreError::DuplicateIdConflict(story.id)),
            (UpsertMode::Create, None) => {
                if story.status != StoryStatus::Draft {
                    return Err(CoreError::validation(format!(
                        "Story '{}' must be created in draft, got {}",
                        story.id, story.status
                    )));
                }
                self.stories.push(story);
                Ok(())
            }
            (UpsertMode::Update, None) => Err(CoreError::not_found(format!(
                "Story not found: {}",
                story.id
            ))),
            (UpsertMode::Update, Some(index)) => {
                let existing = &self.stories[index];
                let mut story = story;
                story.status = existing.status;
                story.blocked_by = existing
                    .blocked_by
                    .intersection(&story.dependencies)
                    .cloned()
                    .collect();
                story.external_blocker = existing.external_blocker.clone();
                story.created_at = existing.created_at;
                story.started_at = existing.started_at;
                story.completed_at = existing.completed_at;
                self.stories[index] = story;
                Ok(())
            }
        }
    }

    /// Get all stories with a specific status
    pub fn stories_by_status(&self, status: StoryStatus) -> Vec<&Story> {
        self.stories.iter().filter(|s| s.status == status).collect()
    }

    /// Get all stories with a specific priority
    pub fn stories_by_priority(&self, priority: Priority) -> Vec<&Story> {
        self.stories.iter().filter(|s| s.priority == priority).collect()
    }

    /// Get all stories belonging to an epic
    pub fn stories_by_epic(&self, epic_id: &str) -> Vec<&Story> {
        self.stories
            .iter()
            .filter(|s| s.parent_id.as_deref() == Some(epic_id))
            .collect()
    }

    /// Ids of COMPLETE stories
    pub fn completed_ids(&self) -> HashSet<&str> {
        self.stories
            .iter()
            .filter(|s| s.is_complete())
            .map(|s| s.id.as_str())
            .collect()
    }

    /// Dependencies of `id` that are not COMPLETE. Unknown ids count as incomplete.
    pub fn incomplete_dependencies(&self, id: &str) -> CoreResult<BTreeSet<String>> {
        let story = self.get(id)?;
        Ok(story
            .dependencies
            .iter()
            .filter(|dep| !self.find(dep).map(Story::is_complete).unwrap_or(false))
            .cloned()
            .collect())
    }
}
