//! Analysis Report
//!
//! One call bundling every analyzer signal for a backlog snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use story_cascade_core::{Backlog, CoreResult};

use super::bottleneck::{detect_bottlenecks, Bottleneck};
use super::critical_path::{critical_path, CriticalPath};
use super::estimation::{estimation_accuracy, EstimationAccuracy};
use super::fanout::{fanout_bottleneck, FanoutBottleneck};
use super::risk::{status_mix_risk, StatusMixRisk};
use super::stalled::{stalled_stories, StalledStory};
use crate::config::AnalysisConfig;
use crate::services::dependency::DependencyGraph;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub feature_id: String,
    pub generated_at: DateTime<Utc>,
    pub fanout: Option<FanoutBottleneck>,
    pub critical_path: CriticalPath,
    /// Longest dependency chain, in stories
    pub chain_depth: usize,
    pub status_mix: StatusMixRisk,
    pub bottlenecks: Vec<Bottleneck>,
    /// Empty when no earlier snapshot was supplied
    pub stalled: Vec<StalledStory>,
    pub estimation: Option<EstimationAccuracy>,
}

impl AnalysisReport {
    /// Whether any signal calls for attention
    pub fn needs_attention(&self) -> bool {
        self.status_mix.at_risk
            || self.fanout.as_ref().map(|f| f.flagged).unwrap_or(false)
            || !self.stalled.is_empty()
            || !self.bottlenecks.is_empty()
    }
}

/// Runs the analyzers with a fixed configuration
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalysisConfig,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze `current`; stall detection runs only when `previous` is given.
    pub fn report(
        &self,
        current: &Backlog,
        previous: Option<&Backlog>,
        now: DateTime<Utc>,
    ) -> CoreResult<AnalysisReport> {
        let graph = DependencyGraph::build_validated(current)?;

        let stalled = match previous {
            Some(previous) => stalled_stories(previous, current, &self.config, now)?,
            None => Vec::new(),
        };

        let report = AnalysisReport {
            feature_id: current.feature_id().to_string(),
            generated_at: now,
            fanout: fanout_bottleneck(current, &self.config)?,
            critical_path: critical_path(current)?,
            chain_depth: graph.max_chain_depth()?,
            status_mix: status_mix_risk(current, &self.config)?,
            bottlenecks: detect_bottlenecks(current)?,
            stalled,
            estimation: estimation_accuracy(current)?,
        };

        tracing::info!(
            feature = %report.feature_id,
            bottlenecks = report.bottlenecks.len(),
            stalled = report.stalled.len(),
            at_risk = report.status_mix.at_risk,
            "analysis complete"
        );
        Ok(report)
    }
}
