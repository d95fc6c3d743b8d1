//! Point engine: deterministic reward calculation for completed actions.
//!
//! The single authority for point math. Pure: same request, same award.

use crate::config::PointsConfig;
use crate::error::PointError;
use crate::roles::{Priority, Role};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ─── Closed action-type set ─────────────────────────────────────────────────

/// Rewardable action types. Unknown strings are a hard validation failure,
/// never a silent default.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActionType {
    TaskComplete,
    MeetingComplete,
    DeepWorkBlock,
    HabitStreak,
    Reflection,
    ReportViewed,
}

impl ActionType {
    fn base_points(self) -> u32 {
        match self {
            ActionType::TaskComplete => 5,
            ActionType::MeetingComplete => 3,
            ActionType::DeepWorkBlock => 8,
            ActionType::HabitStreak => 10,
            ActionType::Reflection => 4,
            ActionType::ReportViewed => 2,
        }
    }

    /// Parse with a typed error so callers surface the offending input.
    pub fn parse(raw: &str) -> Result<Self, PointError> {
        raw.parse()
            .map_err(|_| PointError::UnknownActionType(raw.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

const DURATION_UNIT_MINUTES: u32 = 30;
const MAX_DURATION_BONUS: u32 = 5;

fn role_multiplier(role: Role) -> f64 {
    match role {
        Role::Producer => 1.2,
        Role::Administrator => 1.0,
        Role::Entrepreneur => 1.3,
        Role::Integrator => 1.1,
    }
}

// ─── Request / award ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRequest {
    pub action_type: ActionType,
    pub role: Role,
    pub difficulty: Option<Difficulty>,
    pub duration_minutes: Option<u32>,
    pub priority: Option<Priority>,
    /// Share of recent role assignments, from the session's rolling history.
    pub role_distribution: Option<HashMap<Role, f64>>,
    /// Physiological recovery score in [0, 100].
    pub recovery_score: Option<f64>,
}

impl PointRequest {
    pub fn new(action_type: ActionType, role: Role) -> Self {
        Self {
            action_type,
            role,
            difficulty: None,
            duration_minutes: None,
            priority: None,
            role_distribution: None,
            recovery_score: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointAward {
    /// Final award; always ≥ 1 for a valid request.
    pub points: u32,
    pub category: String,
    pub bonus: u32,
    pub reason: String,
}

/// Point/reward record persisted by an external collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub amount: u32,
    pub role: Role,
    pub reason: String,
    pub category: String,
    pub bonus: u32,
    pub task_id: Option<String>,
    pub plan_id: Option<String>,
    pub goal_id: Option<String>,
}

// ─── Calculation ────────────────────────────────────────────────────────────

/// Calculate the award for a completed action.
pub fn calculate(request: &PointRequest, config: &PointsConfig) -> Result<PointAward, PointError> {
    let base = f64::from(request.action_type.base_points()) * role_multiplier(request.role);

    let mut bonus: u32 = 0;

    if let Some(difficulty) = request.difficulty {
        bonus += match difficulty {
            Difficulty::Easy => 0,
            Difficulty::Medium => 2,
            Difficulty::Hard => 5,
        };
    }

    if let Some(minutes) = request.duration_minutes
        && minutes > 0
    {
        bonus += (minutes / DURATION_UNIT_MINUTES).min(MAX_DURATION_BONUS);
    }

    match request.priority {
        Some(Priority::High) => bonus += 1,
        Some(Priority::Low) => bonus = bonus.saturating_sub(1),
        _ => {}
    }

    // Balance: dampen a dominant role, boost a neglected one.
    let balance_multiplier = match request
        .role_distribution
        .as_ref()
        .and_then(|dist| dist.get(&request.role))
    {
        Some(&share) if share > config.dominance_threshold => 0.7,
        Some(&share) if share < config.neglect_threshold => 1.3,
        _ => 1.0,
    };

    // Recovery: low recovery punishes pushing (Producer) and rewards
    // restorative work (Integrator).
    let recovery_multiplier = match request.recovery_score {
        Some(score) if score < config.low_recovery && request.role == Role::Producer => 0.6,
        Some(score) if score < config.low_recovery && request.role == Role::Integrator => 1.2,
        _ => 1.0,
    };

    let total = ((base + f64::from(bonus)) * balance_multiplier * recovery_multiplier).round();
    let points = (total as u32).max(1);

    Ok(PointAward {
        points,
        category: infer_category(request.action_type, request.role),
        bonus,
        reason: build_reason(request),
    })
}

fn infer_category(action_type: ActionType, role: Role) -> String {
    match action_type {
        ActionType::DeepWorkBlock => "deep_work".into(),
        ActionType::MeetingComplete => "collaboration".into(),
        ActionType::HabitStreak => "consistency".into(),
        ActionType::Reflection => "self_awareness".into(),
        ActionType::TaskComplete | ActionType::ReportViewed => {
            format!("{}_execution", role.letter().to_lowercase())
        }
    }
}

fn build_reason(request: &PointRequest) -> String {
    let mut parts = vec![title_case(&request.action_type.to_string())];
    if let Some(difficulty) = request.difficulty {
        let label = match difficulty {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        };
        parts.push(format!("({label})"));
    }
    if let Some(minutes) = request.duration_minutes {
        parts.push(format!("{minutes} min"));
    }
    parts.push(format!("[role={}]", request.role.letter()));
    parts.join(" ")
}

fn title_case(snake: &str) -> String {
    snake
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
