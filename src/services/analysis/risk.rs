//! Status-mix Risk

use serde::{Deserialize, Serialize};
use story_cascade_core::{Backlog, CoreResult, StoryStatus};

use crate::config::AnalysisConfig;
use crate::services::dependency::DependencyGraph;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusMixRisk {
    pub blocked: usize,
    pub non_complete: usize,
    /// `blocked / non_complete`, 0 when nothing is open
    pub blocked_fraction: f64,
    pub at_risk: bool,
}

pub fn status_mix_risk(backlog: &Backlog, config: &AnalysisConfig) -> CoreResult<StatusMixRisk> {
    DependencyGraph::build_validated(backlog)?;

    let non_complete = backlog.iter().filter(|s| !s.is_complete()).count();
    let blocked = backlog.stories_by_status(StoryStatus::Blocked).len();
    let blocked_fraction = if non_complete > 0 {
        blocked as f64 / non_complete as f64
    } else {
        0.0
    };

    Ok(StatusMixRisk {
        blocked,
        non_complete,
        blocked_fraction,
        at_risk: non_complete > 0 && blocked_fraction > config.blocked_risk_fraction,
    })
}
