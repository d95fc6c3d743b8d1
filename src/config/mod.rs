//! Crate configuration.
//!
//! Every tuning constant the decision engines use lives here as a named,
//! overridable default. None of these exact values is load-bearing; they are
//! the inherited defaults of the system, kept adjustable per deployment.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ─── Top-level config ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub roles: RolesConfig,
    pub alignment: AlignmentConfig,
    pub points: PointsConfig,
    pub scheduler: SchedulerConfig,
    pub router: RouterConfig,
    pub conditions: ConditionsConfig,
}

impl Config {
    /// Parse a TOML document; missing sections and fields fall back to the
    /// defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(raw).map_err(|e| ConfigError::Load(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.alignment.defer_threshold >= self.alignment.proceed_threshold {
            return Err(ConfigError::Validation(format!(
                "alignment defer threshold {} must be below proceed threshold {}",
                self.alignment.defer_threshold, self.alignment.proceed_threshold
            )));
        }
        let w = &self.scheduler.weights;
        let sum = w.role + w.energy + w.condition + w.deadline;
        if (sum - 1.0).abs() > 1e-6 {
            return Err(ConfigError::Validation(format!(
                "scheduler weights must sum to 1.0 (got {sum})"
            )));
        }
        if self.points.neglect_threshold >= self.points.dominance_threshold {
            return Err(ConfigError::Validation(
                "points neglect threshold must be below dominance threshold".into(),
            ));
        }
        if self.conditions.ideal_band_min >= self.conditions.ideal_band_max {
            return Err(ConfigError::Validation(
                "conditions ideal band is inverted".into(),
            ));
        }
        Ok(())
    }
}

// ─── Role engine ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RolesConfig {
    /// Recovery score below which execution postures are softened.
    pub low_recovery: f64,
    /// Minimum history length before the rebalancing rule may fire.
    pub rebalance_min_history: usize,
    /// A role below this share of history is considered neglected.
    pub neglect_share: f64,
}

impl Default for RolesConfig {
    fn default() -> Self {
        Self {
            low_recovery: 40.0,
            rebalance_min_history: 20,
            neglect_share: 0.15,
        }
    }
}

// ─── Alignment gate ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    pub proceed_threshold: f64,
    pub defer_threshold: f64,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            proceed_threshold: 0.40,
            defer_threshold: 0.20,
        }
    }
}

// ─── Point engine ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PointsConfig {
    /// Role share above which awards are dampened.
    pub dominance_threshold: f64,
    /// Role share below which awards are boosted.
    pub neglect_threshold: f64,
    /// Recovery score below which the recovery multiplier applies.
    pub low_recovery: f64,
}

impl Default for PointsConfig {
    fn default() -> Self {
        Self {
            dominance_threshold: 0.45,
            neglect_threshold: 0.15,
            low_recovery: 40.0,
        }
    }
}

// ─── Slot optimizer ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotWeights {
    pub role: f64,
    pub energy: f64,
    pub condition: f64,
    pub deadline: f64,
}

impl Default for SlotWeights {
    fn default() -> Self {
        Self {
            role: 0.3,
            energy: 0.3,
            condition: 0.2,
            deadline: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub weights: SlotWeights,
    /// Composite score below which scheduling is deferred instead.
    pub min_composite: f64,
    /// Search-window horizon when no deadline is given.
    pub default_horizon_hours: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            weights: SlotWeights::default(),
            min_composite: 0.3,
            default_horizon_hours: 48,
        }
    }
}

// ─── Execution router ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Bounded timeout per capability-handler dispatch.
    pub handler_timeout_secs: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            handler_timeout_secs: 10,
        }
    }
}

// ─── Condition advisories ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionsConfig {
    /// Inclusive band of the monitored metric considered ideal; inside it the
    /// compiler appends a high-priority block-calendar-time advisory.
    pub ideal_band_min: f64,
    pub ideal_band_max: f64,
    /// Duration of the advisory time block.
    pub block_duration_minutes: u32,
}

impl Default for ConditionsConfig {
    fn default() -> Self {
        Self {
            ideal_band_min: 15.0,
            ideal_band_max: 25.0,
            block_duration_minutes: 180,
        }
    }
}
