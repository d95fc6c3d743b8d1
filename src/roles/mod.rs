//! Role-decision engine: which behavioral posture the assistant adopts for
//! one turn, and the execution style that follows from it.

mod engine;
mod history;

pub use engine::{DecisionContext, DeadlinePressure, Morale, RoleDecision, decide};
pub use history::RoleHistory;

use serde::{Deserialize, Serialize};

use crate::error::PointError;

/// The four behavioral postures, in fixed priority order (ties in the base
/// scoring are broken Producer > Administrator > Entrepreneur > Integrator).
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
pub enum Role {
    #[serde(rename = "P")]
    #[strum(serialize = "P", serialize = "Producer")]
    Producer,
    #[serde(rename = "A")]
    #[strum(serialize = "A", serialize = "Administrator")]
    Administrator,
    #[serde(rename = "E")]
    #[strum(serialize = "E", serialize = "Entrepreneur")]
    Entrepreneur,
    #[serde(rename = "I")]
    #[strum(serialize = "I", serialize = "Integrator")]
    Integrator,
}

impl Role {
    /// All roles in tie-break priority order.
    pub const ALL: [Role; 4] = [
        Role::Producer,
        Role::Administrator,
        Role::Entrepreneur,
        Role::Integrator,
    ];

    /// Parse with a typed error so callers surface the offending input.
    pub fn parse(raw: &str) -> Result<Self, PointError> {
        raw.parse()
            .map_err(|_| PointError::UnknownRole(raw.to_string()))
    }

    /// Single-letter code used in summaries and ledger entries.
    pub fn letter(self) -> &'static str {
        match self {
            Role::Producer => "P",
            Role::Administrator => "A",
            Role::Entrepreneur => "E",
            Role::Integrator => "I",
        }
    }
}

/// Priority level attached to instructions and plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// Execution style knobs derived from the final role. Downstream capability
/// payloads copy the pieces they care about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleStyle {
    /// Communication tone for drafted messages.
    pub tone: String,
    pub task_approach: String,
    /// Buffer kept around scheduled events.
    pub calendar_buffer_minutes: u32,
    pub priority: Priority,
    pub reasoning: String,
    pub notes: Vec<String>,
}
