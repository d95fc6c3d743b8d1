use super::history::RoleHistory;
use super::{Priority, Role, RoleStyle};
use crate::config::RolesConfig;
use crate::signals::SignalMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Team-morale flag supplied by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Morale {
    #[default]
    Stable,
    Fragile,
}

/// Deadline pressure level, usually derived from open high-priority tasks
/// (see [`crate::signals::assess_deadline_pressure`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeadlinePressure {
    #[default]
    Low,
    High,
    Critical,
}

/// Per-turn context the role engine weighs against the intent signals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionContext {
    /// Physiological recovery score in [0, 100].
    pub recovery: f64,
    pub morale: Morale,
    pub deadline_pressure: DeadlinePressure,
}

impl Default for DecisionContext {
    fn default() -> Self {
        Self {
            recovery: 70.0,
            morale: Morale::Stable,
            deadline_pressure: DeadlinePressure::Low,
        }
    }
}

/// The concrete, immutable decision for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleDecision {
    pub role: Role,
    pub style: RoleStyle,
    /// Base point award for actions completed under this role.
    pub point_base: u32,
}

/// Decide the role posture for one turn.
///
/// Pure with respect to its inputs: identical (signals, context, history
/// snapshot) always yield an identical decision. The only side effect is the
/// final role being appended to `history`.
pub fn decide(
    signals: &SignalMap,
    ctx: &DecisionContext,
    history: &mut RoleHistory,
    config: &RolesConfig,
) -> RoleDecision {
    let base_role = score_base_role(signals);
    let role = apply_context_overrides(base_role, ctx, history, config);

    debug!(base = %base_role, chosen = %role, recovery = ctx.recovery, "role decided");

    let style = style_for(role, ctx);
    let point_base = point_base_for(role, signals, ctx, config);

    history.push(role);

    RoleDecision {
        role,
        style,
        point_base,
    }
}

/// Weighted base-role scoring over the boolean signal map. Arg-max with ties
/// broken in `Role::ALL` priority order (strict `>` keeps the earlier role).
fn score_base_role(signals: &SignalMap) -> Role {
    let mut scores = [0.0f64; 4];

    let add = |scores: &mut [f64; 4], role: Role, flag: bool, weight: f64| {
        if flag {
            scores[role as usize] += weight;
        }
    };

    // Producer: fast execution.
    add(&mut scores, Role::Producer, signals.urgency, 0.8);
    add(&mut scores, Role::Producer, signals.deadline, 0.6);
    add(&mut scores, Role::Producer, signals.execution_focus, 0.7);

    // Administrator: structure and process.
    add(&mut scores, Role::Administrator, signals.administrative, 0.9);
    add(&mut scores, Role::Administrator, signals.structured, 0.7);
    add(&mut scores, Role::Administrator, signals.documentation, 0.6);

    // Entrepreneur: vision and strategy.
    add(&mut scores, Role::Entrepreneur, signals.exploratory, 0.8);
    add(&mut scores, Role::Entrepreneur, signals.strategic, 0.9);
    add(&mut scores, Role::Entrepreneur, signals.creative, 0.7);

    // Integrator: people and relationships.
    add(&mut scores, Role::Integrator, signals.involves_people, 0.8);
    add(&mut scores, Role::Integrator, signals.emotional_tone, 0.9);
    add(&mut scores, Role::Integrator, signals.relationship_focus, 0.8);

    let mut best = Role::Producer;
    for role in Role::ALL {
        if scores[role as usize] > scores[best as usize] {
            best = role;
        }
    }
    best
}

/// Context overrides, applied in fixed precedence. Critical deadline pressure
/// overrides everything, including the low-recovery adjustment.
fn apply_context_overrides(
    base_role: Role,
    ctx: &DecisionContext,
    history: &RoleHistory,
    config: &RolesConfig,
) -> Role {
    if ctx.deadline_pressure == DeadlinePressure::Critical {
        return Role::Producer;
    }

    // Low recovery: do not push execution when the body says rest.
    if ctx.recovery < config.low_recovery && base_role == Role::Producer {
        return Role::Integrator;
    }

    if ctx.morale == Morale::Fragile {
        return Role::Integrator;
    }

    // Rebalance: once enough history exists, pull neglected postures back in.
    if history.len() >= config.rebalance_min_history {
        let (neglected, share) = history.least_represented();
        if share < config.neglect_share {
            debug!(role = %neglected, share, "rebalancing toward neglected role");
            return neglected;
        }
    }

    base_role
}

fn style_for(role: Role, ctx: &DecisionContext) -> RoleStyle {
    match role {
        Role::Producer => RoleStyle {
            tone: "bullet_points".into(),
            task_approach: "time-boxed execution".into(),
            calendar_buffer_minutes: 5,
            priority: Priority::High,
            reasoning: format!(
                "Fast execution required (deadline: {})",
                pressure_label(ctx.deadline_pressure)
            ),
            notes: vec![
                "Time-box to 15min".into(),
                "Skip documentation".into(),
                "Focus on shipping".into(),
            ],
        },
        Role::Administrator => RoleStyle {
            tone: "structured".into(),
            task_approach: "follow process".into(),
            calendar_buffer_minutes: 10,
            priority: Priority::Medium,
            reasoning: "Systematic work required".into(),
            notes: vec![
                "Document thoroughly".into(),
                "Follow established protocols".into(),
                "Include all stakeholders".into(),
            ],
        },
        Role::Entrepreneur => RoleStyle {
            tone: "visionary".into(),
            task_approach: "creative exploration".into(),
            calendar_buffer_minutes: 20,
            priority: Priority::Medium,
            reasoning: "Strategic/visionary focus".into(),
            notes: vec![
                "Think big picture".into(),
                "Challenge assumptions".into(),
                "Focus on long-term impact".into(),
            ],
        },
        Role::Integrator => RoleStyle {
            tone: "empathetic".into(),
            task_approach: "include team check-ins".into(),
            calendar_buffer_minutes: 15,
            priority: Priority::Medium,
            reasoning: format!("Team harmony focus (morale: {})", morale_label(ctx.morale)),
            notes: vec![
                "Acknowledge team effort".into(),
                "Show leadership responsibility".into(),
                "Schedule 1:1 check-ins if needed".into(),
            ],
        },
    }
}

fn point_base_for(
    role: Role,
    signals: &SignalMap,
    ctx: &DecisionContext,
    config: &RolesConfig,
) -> u32 {
    let mut points: u32 = match role {
        Role::Producer => 5,
        Role::Administrator => 8,
        Role::Entrepreneur => 10,
        Role::Integrator => 7,
    };

    if ctx.recovery < config.low_recovery && role == Role::Integrator {
        points += 3;
    }
    if ctx.deadline_pressure == DeadlinePressure::Critical && role == Role::Producer {
        points += 5;
    }
    if signals.urgency && role == Role::Producer {
        points += 2;
    }

    points.max(1)
}

fn pressure_label(pressure: DeadlinePressure) -> &'static str {
    match pressure {
        DeadlinePressure::Low => "low",
        DeadlinePressure::High => "high",
        DeadlinePressure::Critical => "critical",
    }
}

fn morale_label(morale: Morale) -> &'static str {
    match morale {
        Morale::Stable => "stable",
        Morale::Fragile => "fragile",
    }
}
