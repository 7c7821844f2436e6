//! In-memory Store

use std::sync::Mutex;

use story_cascade_core::{Backlog, CoreResult};

use super::BacklogStore;

/// Keeps the last saved backlog in memory
#[derive(Debug)]
pub struct MemoryStore {
    backlog: Mutex<Backlog>,
}

impl MemoryStore {
    pub fn new(feature_id: impl Into<String>) -> Self {
        Self::with_backlog(Backlog::new(feature_id))
    }

    pub fn with_backlog(backlog: Backlog) -> Self {
        Self {
            backlog: Mutex::new(backlog),
        }
    }
}

impl BacklogStore for MemoryStore {
    fn load(&self) -> CoreResult<Backlog> {
        Ok(self.backlog.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, backlog: &Backlog) -> CoreResult<()> {
        *self.backlog.lock().unwrap_or_else(|e| e.into_inner()) = backlog.clone();
        Ok(())
    }
}
