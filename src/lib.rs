//! Story Cascade
//!
//! Dependency-aware backlog engine for decomposing a feature into stories.
//! It includes:
//! - Dependency graph validation, ordering and execution batches
//! - The story lifecycle state machine with completion propagation
//! - Progress, velocity and projection metrics
//! - Bottleneck, critical path and risk analysis
//! - Backlog stores and per-feature serialized sessions
//!
//! The library logs through `tracing` and never installs a subscriber.

pub mod config;
pub mod services;
pub mod state;
pub mod storage;

pub use story_cascade_core::{
    Backlog, Clock, CoreError, CoreResult, ManualClock, Priority, Story, StoryMetrics,
    StoryStatus, SystemClock, UpsertMode,
};

pub use config::AnalysisConfig;
pub use services::analysis::{AnalysisReport, Analyzer};
pub use services::dependency::{DependencyGraph, ExecutionBatch};
pub use services::lifecycle::{BlockReason, ReconcileReport, StatusMachine, TransitionOutcome};
pub use services::metrics::{BacklogSummary, CompletionEvent, Velocity};
pub use state::{BacklogRegistry, FeatureBacklog};
pub use storage::{BacklogStore, JsonFileStore, MemoryStore};
