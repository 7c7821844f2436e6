//! Storage Layer
//!
//! Backlog persistence. A store loads and saves a whole backlog; story-level
//! reads and writes happen on the loaded [`Backlog`].

mod json_store;
mod memory;

use story_cascade_core::{Backlog, CoreResult};

pub use json_store::{JsonFileStore, BACKLOG_FILE, STORIES_DIR};
pub use memory::MemoryStore;

/// Load/save contract for one feature's backlog
pub trait BacklogStore: Send + Sync {
    /// Read the backlog. A store with nothing saved yet returns an empty backlog.
    fn load(&self) -> CoreResult<Backlog>;

    /// Replace the stored backlog. A failed save leaves the previous one loadable.
    fn save(&self, backlog: &Backlog) -> CoreResult<()>;
}
