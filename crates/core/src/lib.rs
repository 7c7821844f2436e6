//! Story Cascade Core
//!
//! Foundational types for the Story Cascade workspace: the story model, the
//! backlog container, the injected clock and the shared error type. This crate
//! has no knowledge of graph algorithms, persistence or analysis.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `clock` - Injected time source (`Clock`, `SystemClock`, `ManualClock`)
//! - `story` - Story record (`Story`, `StoryStatus`, `Priority`, `StoryMetrics`)
//! - `backlog` - Insertion-ordered story collection (`Backlog`, `UpsertMode`)

pub mod backlog;
pub mod clock;
pub mod error;
pub mod story;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Clock ──────────────────────────────────────────────────────────────
pub use clock::{Clock, ManualClock, SystemClock};

// ── Story Model ────────────────────────────────────────────────────────
pub use backlog::{Backlog, UpsertMode};
pub use story::{is_valid_story_id, Priority, Story, StoryMetrics, StoryStatus};
