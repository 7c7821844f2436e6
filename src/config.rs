//! Analysis Configuration
//!
//! Thresholds consumed by the bottleneck and risk analyzer. Keys are camelCase;
//! unknown keys are ignored and missing keys fall back to defaults.

use std::fs;
use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use story_cascade_core::{CoreError, CoreResult};

/// Default fan-out fraction above which a blocker is flagged
pub const DEFAULT_FANOUT_THRESHOLD: f64 = 0.2;

/// Default stall threshold, 72 hours
pub const DEFAULT_STALLED_AFTER_SECS: u64 = 72 * 60 * 60;

/// Default BLOCKED fraction of open stories that marks a backlog at risk
pub const DEFAULT_BLOCKED_RISK_FRACTION: f64 = 0.2;

/// Analyzer thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisConfig {
    /// Fraction of all stories a single blocker may hold up before it is flagged
    pub fanout_threshold: f64,
    /// Seconds an IN_PROGRESS story may go without unit progress
    #[serde(rename = "stalledAfter")]
    pub stalled_after_secs: u64,
    /// Fraction of open stories that may be BLOCKED before the backlog is at risk
    pub blocked_risk_fraction: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fanout_threshold: DEFAULT_FANOUT_THRESHOLD,
            stalled_after_secs: DEFAULT_STALLED_AFTER_SECS,
            blocked_risk_fraction: DEFAULT_BLOCKED_RISK_FRACTION,
        }
    }
}

impl AnalysisConfig {
    /// Stall threshold as a duration
    pub fn stalled_after(&self) -> Duration {
        i64::try_from(self.stalled_after_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }

    pub fn with_fanout_threshold(mut self, threshold: f64) -> Self {
        self.fanout_threshold = threshold;
        self
    }

    /// Durations under one second are raised to one second
    pub fn with_stalled_after(mut self, after: Duration) -> Self {
        self.stalled_after_secs = after.num_seconds().max(1) as u64;
        self
    }

    pub fn with_blocked_risk_fraction(mut self, fraction: f64) -> Self {
        self.blocked_risk_fraction = fraction;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> CoreResult<()> {
        check_fraction("fanoutThreshold", self.fanout_threshold)?;
        check_fraction("blockedRiskFraction", self.blocked_risk_fraction)?;
        if self.stalled_after_secs == 0 {
            return Err(CoreError::config("stalledAfter must be greater than zero"));
        }
        Ok(())
    }

    /// Parse and validate JSON configuration
    pub fn from_json_str(content: &str) -> CoreResult<Self> {
        let config: AnalysisConfig = serde_json::from_str(content)
            .map_err(|e| CoreError::config(format!("Invalid JSON config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate TOML configuration
    pub fn from_toml_str(content: &str) -> CoreResult<Self> {
        let config: AnalysisConfig = toml::from_str(content)
            .map_err(|e| CoreError::config(format!("Invalid TOML config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file; `.toml` is read as TOML, anything else as JSON
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);

        let config = if is_toml {
            Self::from_toml_str(&content)?
        } else {
            Self::from_json_str(&content)?
        };
        tracing::debug!(path = %path.display(), "loaded analysis config");
        Ok(config)
    }

    /// Save configuration as pretty JSON
    pub fn save_to_file(&self, path: &Path) -> CoreResult<()> {
        self.validate()?;
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

fn check_fraction(name: &str, value: f64) -> CoreResult<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(CoreError::config(format!(
            "{} must be between 0 and 1, got {}",
            name, value
        )))
    }
}
