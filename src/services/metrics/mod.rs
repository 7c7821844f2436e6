//! Metrics Engine
//!
//! Side-effect free measurements over backlog snapshots: unit progress,
//! effort variance, velocity, projected completion and summaries.

mod progress;
mod summary;
mod velocity;

pub use progress::{estimation_variance, feature_progress, progress, remaining_units};
pub use summary::{summarize, BacklogSummary};
pub use velocity::{
    completion_history, projected_completion, velocity, CompletionEvent, Velocity,
    MIN_CONFIDENT_COMPLETIONS,
};
