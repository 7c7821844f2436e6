//! Bottleneck & Risk Analyzer
//!
//! Read-only signals over a backlog snapshot: fan-out blockers, the critical
//! path, stalled work, status-mix risk, a rule-based bottleneck catalogue and
//! estimation accuracy. Nothing here mutates the backlog. An invalid graph is
//! reported with the same error the dependency engine raises.

mod bottleneck;
mod critical_path;
mod estimation;
mod fanout;
mod report;
mod risk;
mod stalled;

pub use bottleneck::{detect_bottlenecks, Bottleneck, BottleneckKind};
pub use critical_path::{critical_path, CriticalPath};
pub use estimation::{
    estimation_accuracy, BucketAccuracy, EstimationAccuracy, EstimationPattern,
    EstimationPatternKind, SizeBucket, MIN_ESTIMATED_STORIES,
};
pub use fanout::{fanout_bottleneck, FanoutBottleneck};
pub use report::{AnalysisReport, Analyzer};
pub use risk::{status_mix_risk, StatusMixRisk};
pub use stalled::{stalled_stories, StalledStory};
