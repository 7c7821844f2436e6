//! Backlog Sessions
//!
//! A [`FeatureBacklog`] serializes every mutation of one feature's backlog
//! behind an async `RwLock`. Mutations run on a working copy, are saved through
//! the store, and only then replace the in-memory backlog, so a failed save
//! leaves the session unchanged. Reads take a snapshot under the read lock.
//!
//! [`BacklogRegistry`] hands out one session per feature id. Features share
//! nothing, so locks never span features.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Duration;
use story_cascade_core::{Backlog, Clock, CoreResult, Story, StoryStatus, UpsertMode};
use tokio::sync::RwLock;

use crate::services::analysis::{AnalysisReport, Analyzer};
use crate::services::lifecycle::{BlockReason, ReconcileReport, StatusMachine, TransitionOutcome};
use crate::services::metrics::{self, BacklogSummary, Velocity};
use crate::storage::{BacklogStore, JsonFileStore, MemoryStore};

/// One feature's backlog with its store and clock
pub struct FeatureBacklog {
    feature_id: String,
    backlog: Arc<RwLock<Backlog>>,
    store: Arc<dyn BacklogStore>,
    machine: StatusMachine,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for FeatureBacklog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureBacklog")
            .field("feature_id", &self.feature_id)
            .finish_non_exhaustive()
    }
}

impl FeatureBacklog {
    /// Load the backlog from `store`
    pub fn open(store: Arc<dyn BacklogStore>, clock: Arc<dyn Clock>) -> CoreResult<Self> {
        let backlog = store.load()?;
        tracing::info!(
            feature = %backlog.feature_id(),
            stories = backlog.len(),
            "backlog opened"
        );
        Ok(Self {
            feature_id: backlog.feature_id().to_string(),
            backlog: Arc::new(RwLock::new(backlog)),
            store,
            machine: StatusMachine::new(clock.clone()),
            clock,
        })
    }

    pub fn feature_id(&self) -> &str {
        &self.feature_id
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Copy of the current backlog
    pub async fn snapshot(&self) -> Backlog {
        self.backlog.read().await.clone()
    }

    /// Run a read-only query against the current backlog
    pub async fn read<T>(&self, query: impl FnOnce(&Backlog) -> T) -> T {
        let guard = self.backlog.read().await;
        query(&guard)
    }

    pub async fn get(&self, id: &str) -> CoreResult<Story> {
        self.read(|b| b.get(id).cloned()).await
    }

    pub async fn all(&self) -> Vec<Story> {
        self.read(|b| b.all().to_vec()).await
    }

    pub async fn summary(&self) -> BacklogSummary {
        self.read(metrics::summarize).await
    }

    /// Velocity over the trailing `window`
    pub async fn velocity(&self, window: Duration) -> Velocity {
        let history = self.read(metrics::completion_history).await;
        metrics::velocity(&history, window, self.clock.now())
    }

    /// Analyzer report; `previous` enables stall detection
    pub async fn analyze(
        &self,
        analyzer: &Analyzer,
        previous: Option<&Backlog>,
    ) -> CoreResult<AnalysisReport> {
        let now = self.clock.now();
        self.read(|b| analyzer.report(b, previous, now)).await
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Add a DRAFT story
    pub async fn create_story(&self, story: Story) -> CoreResult<()> {
        self.mutate(|b| b.upsert(story, UpsertMode::Create)).await
    }

    /// Replace a story's content; lifecycle fields are kept
    pub async fn update_story(&self, mut story: Story) -> CoreResult<()> {
        story.updated_at = self.clock.now();
        self.mutate(|b| b.upsert(story, UpsertMode::Update)).await
    }

    pub async fn transition(&self, id: &str, to: StoryStatus) -> CoreResult<TransitionOutcome> {
        self.mutate(|b| self.machine.transition(b, id, to)).await
    }

    pub async fn mark_ready(&self, id: &str) -> CoreResult<TransitionOutcome> {
        self.mutate(|b| self.machine.mark_ready(b, id)).await
    }

    pub async fn start(&self, id: &str) -> CoreResult<TransitionOutcome> {
        self.mutate(|b| self.machine.start(b, id)).await
    }

    pub async fn complete(&self, id: &str) -> CoreResult<TransitionOutcome> {
        self.mutate(|b| self.machine.complete(b, id)).await
    }

    pub async fn block(&self, id: &str, reason: BlockReason) -> CoreResult<TransitionOutcome> {
        self.mutate(|b| self.machine.block(b, id, reason)).await
    }

    pub async fn unblock(&self, id: &str) -> CoreResult<TransitionOutcome> {
        self.mutate(|b| self.machine.unblock(b, id)).await
    }

    pub async fn record_progress(
        &self,
        id: &str,
        completed_units: u32,
        actual_effort: Option<f64>,
    ) -> CoreResult<()> {
        self.mutate(|b| {
            self.machine
                .record_progress(b, id, completed_units, actual_effort)
        })
        .await
    }

    pub async fn reconcile_blocked(&self) -> CoreResult<ReconcileReport> {
        self.mutate(|b| self.machine.reconcile_blocked(b)).await
    }

    /// Discard in-memory state and load from the store again
    pub async fn reload(&self) -> CoreResult<()> {
        let mut guard = self.backlog.write().await;
        *guard = self.store.load()?;
        Ok(())
    }

    async fn mutate<T>(&self, op: impl FnOnce(&mut Backlog) -> CoreResult<T>) -> CoreResult<T> {
        let mut guard = self.backlog.write().await;
        let mut working = guard.clone();
        let value = op(&mut working)?;
        self.store.save(&working)?;
        *guard = working;
        Ok(value)
    }
}

type StoreFactory = dyn Fn(&str) -> Arc<dyn BacklogStore> + Send + Sync;

/// Sessions keyed by feature id
pub struct BacklogRegistry {
    sessions: RwLock<HashMap<String, Arc<FeatureBacklog>>>,
    factory: Box<StoreFactory>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for BacklogRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BacklogRegistry").finish_non_exhaustive()
    }
}

impl BacklogRegistry {
    /// Registry with a custom store per feature
    pub fn new(
        factory: impl Fn(&str) -> Arc<dyn BacklogStore> + Send + Sync + 'static,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            factory: Box::new(factory),
            clock,
        }
    }

    /// JSON files under `specs_dir`
    pub fn json(specs_dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        let specs_dir = specs_dir.into();
        Self::new(
            move |feature_id| {
                Arc::new(JsonFileStore::for_feature(&specs_dir, feature_id)) as Arc<dyn BacklogStore>
            },
            clock,
        )
    }

    /// Nothing persisted beyond the process
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self::new(
            |feature_id| Arc::new(MemoryStore::new(feature_id)) as Arc<dyn BacklogStore>,
            clock,
        )
    }

    /// Session for `feature_id`, loading it on first use
    pub async fn open(&self, feature_id: &str) -> CoreResult<Arc<FeatureBacklog>> {
        if let Some(session) = self.sessions.read().await.get(feature_id) {
            return Ok(session.clone());
        }

        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(feature_id) {
            return Ok(session.clone());
        }

        let store = (self.factory)(feature_id);
        let session = Arc::new(FeatureBacklog::open(store, self.clock.clone())?);
        sessions.insert(feature_id.to_string(), session.clone());
        Ok(session)
    }

    /// Already-open session, if any
    pub async fn get(&self, feature_id: &str) -> Option<Arc<FeatureBacklog>> {
        self.sessions.read().await.get(feature_id).cloned()
    }

    pub async fn feature_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Drop a session; the next `open` reloads from the store
    pub async fn close(&self, feature_id: &str) -> bool {
        self.sessions.write().await.remove(feature_id).is_some()
    }
}
