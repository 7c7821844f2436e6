//! Estimation Accuracy
//!
//! Compares estimated and actual effort across COMPLETE stories and looks for
//! recurring estimation errors.

use serde::{Deserialize, Serialize};
use story_cascade_core::{Backlog, CoreResult, Story};

use crate::services::dependency::DependencyGraph;

/// COMPLETE stories with an effort estimate needed before anything is reported
pub const MIN_ESTIMATED_STORIES: usize = 3;

const ACCURATE_RANGE: std::ops::RangeInclusive<f64> = 0.8..=1.2;
const UNDER_ESTIMATE_RATIO: f64 = 1.1;
const OVER_ESTIMATE_RATIO: f64 = 0.9;
const SYSTEMATIC_RATIO: f64 = 1.2;
const SYSTEMATIC_MIN_STORIES: usize = 3;
const HIGH_VARIANCE_STDEV: f64 = 0.5;
const COMPLEX_RATIO: f64 = 1.3;
const COMPLEX_MIN_STORIES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeBucket {
    /// Up to 5 units
    Simple,
    /// 6 to 10 units
    Medium,
    /// More than 10 units
    Complex,
}

impl SizeBucket {
    pub fn of(units: u32) -> Self {
        match units {
            0..=5 => SizeBucket::Simple,
            6..=10 => SizeBucket::Medium,
            _ => SizeBucket::Complex,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketAccuracy {
    pub bucket: SizeBucket,
    pub count: usize,
    /// Mean of per-story actual/estimated ratios
    pub average_ratio: f64,
    pub accurate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimationPatternKind {
    SystematicUnderEstimation,
    HighVariance,
    ComplexStoryUnderEstimation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimationPattern {
    pub kind: EstimationPatternKind,
    pub story_ids: Vec<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimationAccuracy {
    pub story_count: usize,
    pub total_estimated_effort: f64,
    pub total_actual_effort: f64,
    /// `Σ actual / Σ estimated`
    pub accuracy_ratio: f64,
    /// Sample standard deviation of per-story ratios
    pub ratio_stdev: f64,
    /// Stories finishing under 90% of their estimate
    pub over_estimated: usize,
    /// Stories finishing over 110% of their estimate
    pub under_estimated: usize,
    /// Mean miss, in percent, over stories outside the ±10% band
    pub average_overrun_pct: f64,
    pub by_size: Vec<BucketAccuracy>,
    pub patterns: Vec<EstimationPattern>,
}

impl EstimationAccuracy {
    pub fn is_accurate(&self) -> bool {
        ACCURATE_RANGE.contains(&self.accuracy_ratio)
    }

    /// Scale an estimate by the history of similarly sized stories, falling
    /// back to the overall ratio when that bucket has no history.
    pub fn predict_effort(&self, estimated_effort: f64, units: u32) -> f64 {
        let bucket = SizeBucket::of(units);
        let ratio = self
            .by_size
            .iter()
            .find(|b| b.bucket == bucket)
            .map(|b| b.average_ratio)
            .unwrap_or(self.accuracy_ratio);
        estimated_effort * ratio
    }
}

struct Sample<'a> {
    story: &'a Story,
    ratio: f64,
}

/// `None` until at least [`MIN_ESTIMATED_STORIES`] stories qualify
pub fn estimation_accuracy(backlog: &Backlog) -> CoreResult<Option<EstimationAccuracy>> {
    DependencyGraph::build_validated(backlog)?;

    let samples: Vec<Sample> = backlog
        .iter()
        .filter(|s| s.is_complete() && s.metrics.estimated_effort > 0.0)
        .map(|story| Sample {
            story,
            ratio: story.metrics.actual_effort / story.metrics.estimated_effort,
        })
        .collect();

    if samples.len() < MIN_ESTIMATED_STORIES {
        return Ok(None);
    }

    let total_estimated_effort: f64 = samples.iter().map(|s| s.story.metrics.estimated_effort).sum();
    let total_actual_effort: f64 = samples.iter().map(|s| s.story.metrics.actual_effort).sum();

    let mut over_estimated = 0;
    let mut under_estimated = 0;
    let mut misses = Vec::new();
    for sample in &samples {
        if sample.ratio > UNDER_ESTIMATE_RATIO {
            under_estimated += 1;
            misses.push((sample.ratio - 1.0) * 100.0);
        } else if sample.ratio < OVER_ESTIMATE_RATIO {
            over_estimated += 1;
            misses.push((1.0 - sample.ratio) * 100.0);
        }
    }

    let ratios: Vec<f64> = samples.iter().map(|s| s.ratio).collect();
    let ratio_stdev = sample_stdev(&ratios);

    Ok(Some(EstimationAccuracy {
        story_count: samples.len(),
        total_estimated_effort,
        total_actual_effort,
        accuracy_ratio: total_actual_effort / total_estimated_effort,
        ratio_stdev,
        over_estimated,
        under_estimated,
        average_overrun_pct: mean(&misses),
        by_size: bucket_accuracy(&samples),
        patterns: detect_patterns(&samples, ratio_stdev),
    }))
}

fn bucket_accuracy(samples: &[Sample]) -> Vec<BucketAccuracy> {
    [SizeBucket::Simple, SizeBucket::Medium, SizeBucket::Complex]
        .into_iter()
        .filter_map(|bucket| {
            let ratios: Vec<f64> = samples
                .iter()
                .filter(|s| SizeBucket::of(s.story.metrics.estimated_units) == bucket)
                .map(|s| s.ratio)
                .collect();
            if ratios.is_empty() {
                return None;
            }
            let average_ratio = mean(&ratios);
            Some(BucketAccuracy {
                bucket,
                count: ratios.len(),
                average_ratio,
                accurate: ACCURATE_RANGE.contains(&average_ratio),
            })
        })
        .collect()
}

fn detect_patterns(samples: &[Sample], ratio_stdev: f64) -> Vec<EstimationPattern> {
    let mut patterns = Vec::new();

    let under: Vec<String> = samples
        .iter()
        .filter(|s| s.ratio > SYSTEMATIC_RATIO)
        .map(|s| s.story.id.clone())
        .collect();
    if under.len() >= SYSTEMATIC_MIN_STORIES {
        patterns.push(EstimationPattern {
            kind: EstimationPatternKind::SystematicUnderEstimation,
            description: format!("{} stories took over 20% longer than estimated", under.len()),
            story_ids: under,
        });
    }

    if ratio_stdev > HIGH_VARIANCE_STDEV {
        patterns.push(EstimationPattern {
            kind: EstimationPatternKind::HighVariance,
            description: format!("Estimation ratios vary widely (stdev {:.2})", ratio_stdev),
            story_ids: samples.iter().map(|s| s.story.id.clone()).collect(),
        });
    }

    let complex: Vec<String> = samples
        .iter()
        .filter(|s| SizeBucket::of(s.story.metrics.estimated_units) == SizeBucket::Complex)
        .filter(|s| s.ratio > COMPLEX_RATIO)
        .map(|s| s.story.id.clone())
        .collect();
    if complex.len() >= COMPLEX_MIN_STORIES {
        patterns.push(EstimationPattern {
            kind: EstimationPatternKind::ComplexStoryUnderEstimation,
            description: format!(
                "{} complex stories took over 30% longer than estimated",
                complex.len()
            ),
            story_ids: complex,
        });
    }

    patterns
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn sample_stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}
