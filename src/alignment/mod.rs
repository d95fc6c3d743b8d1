//! Goal-alignment gate: scores how well a turn's intended actions line up
//! with the active goal/plan context, and recommends whether to proceed.

use crate::config::AlignmentConfig;
use crate::roles::Priority;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ─── Context types ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    #[default]
    InProgress,
    Completed,
    Abandoned,
}

/// A long-horizon objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub purpose: String,
    pub status: GoalStatus,
    pub end_date: Option<NaiveDate>,
    pub point_target: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    Execution,
    Planning,
    #[default]
    Exploration,
}

/// A prioritized sub-plan toward a goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub priority: Priority,
    pub kind: PlanKind,
    pub goal_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskSource {
    Voice,
    #[default]
    Manual,
    Email,
}

/// Task-level signal. A signal, not an authority: it nudges the score but
/// never decides on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSignal {
    pub source: TaskSource,
    pub admin_kind: bool,
    pub priority: Priority,
}

// ─── Result ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Proceed,
    Defer,
    AskClarify,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentResult {
    /// Always within [0.1, 1.0].
    pub score: f64,
    pub recommendation: Recommendation,
    pub reason: String,
}

impl AlignmentResult {
    pub fn proceeds(&self) -> bool {
        self.recommendation == Recommendation::Proceed
    }
}

// ─── Outer block ────────────────────────────────────────────────────────────

/// Caller-level block, checked BEFORE the gate is invoked. This is a distinct
/// outer decision, never a gate return value: an expired goal with zero
/// alignment signal short-circuits instruction compilation entirely and
/// issues zero points.
pub fn outer_block(
    goal: Option<&Goal>,
    plan: Option<&Plan>,
    task: Option<&TaskSignal>,
    today: NaiveDate,
) -> Option<String> {
    let goal = goal?;
    let expired = goal.end_date.is_some_and(|end| end < today);
    if expired && plan.is_none() && task.is_none() {
        return Some(format!(
            "goal '{}' expired on {} with no active plan or task signal",
            goal.purpose,
            goal.end_date.map(|d| d.to_string()).unwrap_or_default()
        ));
    }
    None
}

// ─── Gate ───────────────────────────────────────────────────────────────────

/// Pure, deterministic alignment scoring. Recomputed every turn.
///
/// Starts from a neutral 0.5 and applies independent additive contributions;
/// the final score is clamped to [0.1, 1.0] so a single missing context can
/// never zero the whole turn out.
pub fn assess(
    goal: Option<&Goal>,
    plan: Option<&Plan>,
    task: Option<&TaskSignal>,
    now: DateTime<Utc>,
    config: &AlignmentConfig,
) -> AlignmentResult {
    let mut score: f64 = 0.5;
    let mut reasons: Vec<String> = vec!["Default baseline score".into()];

    // Goal (purpose).
    if let Some(goal) = goal {
        if goal.status == GoalStatus::InProgress {
            score += 0.30;
            reasons.push("Linked to active goal".into());
        } else {
            score -= 0.10;
            reasons.push("Goal is not active".into());
        }

        if let Some(end_date) = goal.end_date {
            if end_date >= now.date_naive() {
                score += 0.15;
            } else {
                score -= 0.20;
                reasons.push(format!("Goal expired on {end_date}"));
            }
        }

        if goal.point_target > 0 {
            score += 0.10;
        }
    } else {
        score -= 0.05;
        reasons.push("No goal linked".into());
    }

    // Plan (strategy).
    if let Some(plan) = plan {
        score += match plan.priority {
            Priority::High => 0.25,
            Priority::Medium => 0.15,
            Priority::Low => 0.05,
        };
        score += match plan.kind {
            PlanKind::Execution | PlanKind::Planning => 0.15,
            PlanKind::Exploration => 0.08,
        };
        reasons.push("Aligned with plan strategy".into());
    } else {
        score -= 0.03;
        reasons.push("No plan context".into());
    }

    // Task (signal, not authority).
    if let Some(task) = task {
        match task.source {
            TaskSource::Voice | TaskSource::Manual => {
                score += 0.08;
                reasons.push("User-initiated task".into());
            }
            TaskSource::Email => {
                score += 0.03;
                reasons.push("Email-originated task".into());
            }
        }

        score += if task.admin_kind { 0.02 } else { 0.05 };

        if task.priority == Priority::High {
            score += 0.08;
        }
    }

    let score = (score.clamp(0.1, 1.0) * 100.0).round() / 100.0;

    let (recommendation, prefix) = if score >= config.proceed_threshold {
        (Recommendation::Proceed, "")
    } else if score >= config.defer_threshold {
        (Recommendation::Defer, "Weak alignment: ")
    } else {
        (Recommendation::AskClarify, "Very low alignment: ")
    };

    AlignmentResult {
        score,
        recommendation,
        reason: format!("{prefix}{}", reasons.join("; ")),
    }
}
