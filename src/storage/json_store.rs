//! JSON File Store
//!
//! One pretty-printed JSON document per feature. Saves write a sibling
//! temporary file and rename it over the target, so a failed save never
//! leaves a partial backlog behind.

use std::fs;
use std::path::{Path, PathBuf};

use story_cascade_core::{Backlog, CoreError, CoreResult};

use super::BacklogStore;

/// Directory under a feature that holds its backlog
pub const STORIES_DIR: &str = "stories";

/// Backlog file name
pub const BACKLOG_FILE: &str = "backlog.json";

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    feature_id: String,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>, feature_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            feature_id: feature_id.into(),
        }
    }

    /// `<specs_dir>/<feature_id>/stories/backlog.json`
    pub fn for_feature(specs_dir: &Path, feature_id: &str) -> Self {
        let path = specs_dir.join(feature_id).join(STORIES_DIR).join(BACKLOG_FILE);
        Self::new(path, feature_id)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn feature_id(&self) -> &str {
        &self.feature_id
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

impl BacklogStore for JsonFileStore {
    fn load(&self) -> CoreResult<Backlog> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no backlog file, starting empty");
            return Ok(Backlog::new(&self.feature_id));
        }

        let content = fs::read_to_string(&self.path)?;
        let backlog: Backlog = serde_json::from_str(&content)?;
        if backlog.feature_id() != self.feature_id {
            return Err(CoreError::validation(format!(
                "Backlog at {} belongs to feature '{}', expected '{}'",
                self.path.display(),
                backlog.feature_id(),
                self.feature_id
            )));
        }
        Ok(backlog)
    }

    fn save(&self, backlog: &Backlog) -> CoreResult<()> {
        if backlog.feature_id() != self.feature_id {
            return Err(CoreError::validation(format!(
                "Cannot save backlog of feature '{}' into store for '{}'",
                backlog.feature_id(),
                self.feature_id
            )));
        }

        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(backlog)?;
        let temp_path = self.temp_path();
        fs::write(&temp_path, content)?;

        // rename replaces the target in one step on every supported platform
        if let Err(err) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(err.into());
        }

        tracing::info!(
            feature = %self.feature_id,
            stories = backlog.len(),
            path = %self.path.display(),
            "backlog saved"
        );
        Ok(())
    }
}
