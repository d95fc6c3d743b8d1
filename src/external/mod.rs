//! Collaborator interfaces: everything the core consumes but does not own.
//!
//! Every source here may be absent, stale, or failing. Per the error-handling
//! contract, a fetch failure never raises past the caller: each call site
//! substitutes the documented neutral default (empty busy list, absent goal
//! context, neutral condition fit, recovery 70) and continues the turn.

use crate::alignment::{Goal, Plan};
use crate::points::LedgerEntry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Classification ─────────────────────────────────────────────────────────

/// One classified sub-intent from the black-box classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubIntent {
    /// Coarse category the instruction compiler maps to a capability.
    pub category: String,
    /// Fine-grained intent name, passed through to handlers.
    pub intent: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub role_hint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Classification {
    pub intents: Vec<SubIntent>,
    /// Read-only information domains requested, when no actionable intent
    /// was extracted.
    pub read_domains: Vec<String>,
    pub confidence: f64,
}

impl Classification {
    /// A turn with neither actionable intents nor read domains is a total
    /// classification failure and takes the generic fallback path.
    pub fn is_empty(&self) -> bool {
        self.intents.is_empty() && self.read_domains.is_empty()
    }
}

#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str) -> anyhow::Result<Classification>;
}

// ─── Calendar free/busy ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[async_trait]
pub trait FreeBusySource: Send + Sync {
    /// Busy intervals for the window, in chronological order.
    async fn busy_intervals(
        &self,
        calendar_ref: &str,
        window: TimeWindow,
    ) -> anyhow::Result<Vec<BusyInterval>>;
}

// ─── External conditions ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl RiskLevel {
    pub fn is_elevated(self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::VeryHigh)
    }
}

/// Snapshot of monitored external conditions. May be stale; consumers treat
/// a missing snapshot as neutral.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConditionSnapshot {
    /// Condition fit score in [0, 1] used by the slot optimizer.
    pub fit_score: Option<f64>,
    /// The monitored activity metric (e.g. wind speed in knots); compared
    /// against the configured ideal band for advisory time blocking.
    pub activity_metric: Option<f64>,
    pub risk: RiskLevel,
    pub taken_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait ConditionSource: Send + Sync {
    async fn snapshot(&self) -> anyhow::Result<ConditionSnapshot>;
}

// ─── Goal context ───────────────────────────────────────────────────────────

/// Read-only snapshot of the active goal/plan context, fetched once per turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GoalContext {
    pub goal: Option<Goal>,
    pub plan: Option<Plan>,
}

#[async_trait]
pub trait GoalSource: Send + Sync {
    async fn goal_context(&self) -> anyhow::Result<GoalContext>;
}

// ─── Recovery ───────────────────────────────────────────────────────────────

#[async_trait]
pub trait RecoverySource: Send + Sync {
    /// Physiological recovery score in [0, 100].
    async fn recovery_score(&self) -> anyhow::Result<f64>;
}

// ─── Point ledger ───────────────────────────────────────────────────────────

#[async_trait]
pub trait LedgerSink: Send + Sync {
    /// Persist a ledger entry, returning its id. Fire-and-forget from the
    /// turn's perspective: failure is logged but never fails the turn.
    async fn persist(&self, entry: &LedgerEntry) -> anyhow::Result<String>;
}
