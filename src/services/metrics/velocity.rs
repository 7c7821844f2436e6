//! Velocity and Projection
//!
//! Velocity is measured over a trailing window ending at `now`. Fewer than
//! [`MIN_CONFIDENT_COMPLETIONS`] completions in the window marks the result as
//! low-confidence; an empty window yields zero, never an error.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use story_cascade_core::Backlog;

use super::progress::remaining_units;

/// Completions needed in a window for a confident velocity
pub const MIN_CONFIDENT_COMPLETIONS: usize = 3;

const SECONDS_PER_DAY: f64 = 86_400.0;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// A story reaching COMPLETE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEvent {
    pub story_id: String,
    pub completed_at: DateTime<Utc>,
    /// Estimated units of the story, used for unit velocity
    pub units: u32,
}

/// Completions per day over a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Velocity {
    pub stories_per_day: f64,
    pub units_per_day: f64,
    /// Completions that fell inside the window
    pub completions: usize,
    pub low_confidence: bool,
}

impl Velocity {
    pub fn zero() -> Self {
        Self {
            stories_per_day: 0.0,
            units_per_day: 0.0,
            completions: 0,
            low_confidence: true,
        }
    }
}

/// Completion events of a backlog, oldest first
pub fn completion_history(backlog: &Backlog) -> Vec<CompletionEvent> {
    let mut events: Vec<CompletionEvent> = backlog
        .iter()
        .filter(|s| s.is_complete())
        .filter_map(|s| {
            s.completed_at.map(|at| CompletionEvent {
                story_id: s.id.clone(),
                completed_at: at,
                units: s.metrics.estimated_units,
            })
        })
        .collect();
    events.sort_by(|a, b| {
        a.completed_at
            .cmp(&b.completed_at)
            .then_with(|| a.story_id.cmp(&b.story_id))
    });
    events
}

/// Completions in `(now - window, now]`, per day
pub fn velocity(history: &[CompletionEvent], window: Duration, now: DateTime<Utc>) -> Velocity {
    if window <= Duration::zero() {
        return Velocity::zero();
    }

    let start = now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC);
    let (completions, units) = history
        .iter()
        .filter(|e| e.completed_at > start && e.completed_at <= now)
        .fold((0usize, 0u64), |(n, u), e| (n + 1, u + e.units as u64));

    if completions == 0 {
        return Velocity::zero();
    }

    let days = window.num_milliseconds() as f64 / MILLIS_PER_DAY;
    if days <= 0.0 {
        return Velocity::zero();
    }
    Velocity {
        stories_per_day: completions as f64 / days,
        units_per_day: units as f64 / days,
        completions,
        low_confidence: completions < MIN_CONFIDENT_COMPLETIONS,
    }
}

/// When the remaining units run out at the given velocity.
///
/// `None` when unit velocity is not a positive finite rate. A backlog with nothing left
/// projects to `now`.
pub fn projected_completion(
    backlog: &Backlog,
    velocity: &Velocity,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if !velocity.units_per_day.is_finite() || velocity.units_per_day <= 0.0 {
        return None;
    }
    let remaining = remaining_units(backlog) as f64;
    let seconds = (remaining / velocity.units_per_day * SECONDS_PER_DAY).round();
    if !seconds.is_finite() || seconds >= i64::MAX as f64 {
        return None;
    }
    Duration::try_seconds(seconds as i64).and_then(|ahead| now.checked_add_signed(ahead))
}
