//! Backlog Summary

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use story_cascade_core::{Backlog, Priority, StoryStatus};

use super::progress::feature_progress;
use crate::services::dependency::next_story;

/// Counts and totals for one backlog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacklogSummary {
    pub feature_id: String,
    pub total_stories: usize,
    /// Every status, zero counts included
    pub by_status: BTreeMap<String, usize>,
    /// Every priority, zero counts included
    pub by_priority: BTreeMap<String, usize>,
    pub estimated_effort: f64,
    pub actual_effort: f64,
    /// COMPLETE stories / all stories
    pub completion_rate: f64,
    /// Unit-weighted progress
    pub feature_progress: f64,
    pub next_story: Option<String>,
}

impl BacklogSummary {
    pub fn count(&self, status: StoryStatus) -> usize {
        self.by_status.get(&status.to_string()).copied().unwrap_or(0)
    }
}

pub fn summarize(backlog: &Backlog) -> BacklogSummary {
    let mut by_status: BTreeMap<String, usize> =
        StoryStatus::ALL.iter().map(|s| (s.to_string(), 0)).collect();
    let mut by_priority: BTreeMap<String, usize> =
        Priority::ALL.iter().map(|p| (p.to_string(), 0)).collect();
    let mut estimated_effort = 0.0;
    let mut actual_effort = 0.0;

    for story in backlog.iter() {
        *by_status.entry(story.status.to_string()).or_default() += 1;
        *by_priority.entry(story.priority.to_string()).or_default() += 1;
        estimated_effort += story.metrics.estimated_effort;
        actual_effort += story.metrics.actual_effort;
    }

    let total = backlog.len();
    let complete = by_status
        .get(&StoryStatus::Complete.to_string())
        .copied()
        .unwrap_or(0);

    BacklogSummary {
        feature_id: backlog.feature_id().to_string(),
        total_stories: total,
        by_status,
        by_priority,
        estimated_effort,
        actual_effort,
        completion_rate: if total > 0 {
            complete as f64 / total as f64
        } else {
            0.0
        },
        feature_progress: feature_progress(backlog),
        next_story: next_story(backlog).map(|s| s.id.clone()),
    }
}
