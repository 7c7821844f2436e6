//! Progress and Variance
//!
//! Pure functions over a single story or a backlog snapshot.

use story_cascade_core::{Backlog, Story};

/// `completed_units / estimated_units`, clamped to `[0, 1]`; 0 when nothing is estimated
pub fn progress(story: &Story) -> f64 {
    let metrics = &story.metrics;
    if metrics.estimated_units == 0 {
        return 0.0;
    }
    (metrics.completed_units as f64 / metrics.estimated_units as f64).clamp(0.0, 1.0)
}

/// `Σ completed_units / Σ estimated_units` across every story.
///
/// Over-reported stories count at their reported value; the total is clamped.
pub fn feature_progress(backlog: &Backlog) -> f64 {
    let (completed, estimated) = backlog.iter().fold((0u64, 0u64), |(c, e), story| {
        (
            c + story.metrics.completed_units as u64,
            e + story.metrics.estimated_units as u64,
        )
    });
    if estimated == 0 {
        return 0.0;
    }
    (completed as f64 / estimated as f64).clamp(0.0, 1.0)
}

/// `(actual - estimated) / estimated`; `None` when no effort was estimated
pub fn estimation_variance(story: &Story) -> Option<f64> {
    let metrics = &story.metrics;
    if metrics.estimated_effort > 0.0 {
        Some((metrics.actual_effort - metrics.estimated_effort) / metrics.estimated_effort)
    } else {
        None
    }
}

/// Units still outstanding across non-COMPLETE stories
pub fn remaining_units(backlog: &Backlog) -> u64 {
    backlog
        .iter()
        .filter(|s| !s.is_complete())
        .map(|s| s.metrics.remaining_units() as u64)
        .sum()
}
