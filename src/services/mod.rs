//! Services
//!
//! The backlog engine: dependency graph, lifecycle, metrics and analysis.
//! Everything here operates on a [`Backlog`](story_cascade_core::Backlog)
//! passed in by the caller; persistence lives in `storage`.

pub mod analysis;
pub mod dependency;
pub mod lifecycle;
pub mod metrics;

pub use analysis::{AnalysisReport, Analyzer};
pub use dependency::DependencyGraph;
pub use lifecycle::{BlockReason, StatusMachine, TransitionOutcome};
