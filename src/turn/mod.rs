//! Per-turn orchestration: the full pipeline from one user utterance to an
//! ordered, executed instruction batch.
//!
//! Flow: slot-filler gate → classify → signals and context → role decision →
//! goal context → outer block check → alignment gate → compile → route →
//! slot-filler outcome scan. One session at a time per `Session` value; the
//! host may run many sessions concurrently, each with its own state.

use crate::alignment::{self, AlignmentResult, TaskSignal, TaskSource};
use crate::capability::{Capability, Instruction};
use crate::compiler::{self, CompileContext};
use crate::config::Config;
use crate::conversation::{self, ConversationState, GateAction};
use crate::external::{
    Classification, Classifier, ConditionSource, GoalSource, LedgerSink, RecoverySource,
};
use crate::points::PointAward;
use crate::roles::{
    decide, DecisionContext, Morale, Priority, Role, RoleDecision, RoleHistory,
};
use crate::router::{ExecutionSummary, HandlerRegistry, Outcome, Router};
use crate::signals::{self, SignalMap};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Neutral recovery assumed when the wearable source is unavailable.
const NEUTRAL_RECOVERY: f64 = 70.0;

// ─── Session ────────────────────────────────────────────────────────────────

/// Per-session mutable state. Never shared across sessions: the rolling role
/// history and the slot-filling state belong to exactly one user session.
pub struct Session {
    pub id: String,
    pub history: RoleHistory,
    pub conversation: ConversationState,
    /// Host-supplied context, refreshed between turns.
    pub morale: Morale,
    pub urgent_open_tasks: usize,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            history: RoleHistory::default(),
            conversation: ConversationState::Idle,
            morale: Morale::Stable,
            urgent_open_tasks: 0,
        }
    }
}

// ─── Turn output ────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct TurnOutput {
    pub instructions: Vec<Instruction>,
    pub outcomes: Vec<Outcome>,
    pub unified_summary: String,
    pub execution: ExecutionSummary,
    pub conversation: ConversationState,
    pub alignment: Option<AlignmentResult>,
    pub decision: Option<RoleDecision>,
    pub award: Option<PointAward>,
}

impl TurnOutput {
    fn acknowledgement(summary: impl Into<String>, conversation: &ConversationState) -> Self {
        Self {
            unified_summary: summary.into(),
            conversation: conversation.clone(),
            ..Self::default()
        }
    }
}

// ─── Engine ─────────────────────────────────────────────────────────────────

pub struct TurnEngine {
    classifier: Arc<dyn Classifier>,
    goals: Arc<dyn GoalSource>,
    recovery: Arc<dyn RecoverySource>,
    conditions: Arc<dyn ConditionSource>,
    ledger: Arc<dyn LedgerSink>,
    registry: HandlerRegistry,
    config: Config,
}

impl TurnEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        classifier: Arc<dyn Classifier>,
        goals: Arc<dyn GoalSource>,
        recovery: Arc<dyn RecoverySource>,
        conditions: Arc<dyn ConditionSource>,
        ledger: Arc<dyn LedgerSink>,
        registry: HandlerRegistry,
        config: Config,
    ) -> Self {
        Self {
            classifier,
            goals,
            recovery,
            conditions,
            ledger,
            registry,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Process one user utterance for one session. Failures of external
    /// collaborators are contained here: each substitutes its documented
    /// neutral default and the turn continues.
    pub async fn process_turn(&self, session: &mut Session, text: &str) -> TurnOutput {
        // Slot-filler gate. While awaiting input the decision pipeline is
        // skipped entirely for the turn.
        match conversation::on_turn_entry(&mut session.conversation, text) {
            GateAction::FieldCaptured { field, remaining } => {
                debug!(session = %session.id, %field, remaining, "slot answer captured");
                return TurnOutput::acknowledgement(
                    format!("Got it. {remaining} more detail(s) needed."),
                    &session.conversation,
                );
            }
            GateAction::CycleComplete { capability, .. } => {
                info!(session = %session.id, %capability, "slot-filling cycle complete");
                return TurnOutput::acknowledgement(
                    format!("All details collected for {capability}. Ready to continue."),
                    &session.conversation,
                );
            }
            GateAction::PassThrough => {}
        }

        let classification = match self.classifier.classify(text).await {
            Ok(classification) => classification,
            Err(err) => {
                warn!(error = %err, "classifier unavailable");
                Classification::default()
            }
        };
        if classification.is_empty() {
            // Total classification failure takes the generic fallback path.
            return TurnOutput::acknowledgement(
                "Noted. Nothing actionable this turn.",
                &session.conversation,
            );
        }

        let recovery = match self.recovery.recovery_score().await {
            Ok(score) => score,
            Err(err) => {
                warn!(error = %err, "recovery source unavailable, assuming neutral");
                NEUTRAL_RECOVERY
            }
        };

        let signal_map = SignalMap::extract(&classification.intents, text);
        let context = DecisionContext {
            recovery,
            morale: session.morale,
            deadline_pressure: signals::assess_deadline_pressure(session.urgent_open_tasks),
        };
        let decision = decide(
            &signal_map,
            &context,
            &mut session.history,
            &self.config.roles,
        );

        let goal_context = match self.goals.goal_context().await {
            Ok(goal_context) => Some(goal_context),
            Err(err) => {
                warn!(error = %err, "goal source unavailable, proceeding without context");
                None
            }
        };
        let goal = goal_context.as_ref().and_then(|g| g.goal.as_ref());
        let plan = goal_context.as_ref().and_then(|g| g.plan.as_ref());
        let task_signal = task_signal(&classification, &signal_map);

        let now = Utc::now();
        if let Some(reason) =
            alignment::outer_block(goal, plan, task_signal.as_ref(), now.date_naive())
        {
            info!(session = %session.id, %reason, "turn blocked before the gate");
            return TurnOutput {
                unified_summary: format!("Holding off: {reason}."),
                conversation: session.conversation.clone(),
                decision: Some(decision),
                ..TurnOutput::default()
            };
        }

        let alignment_result = alignment::assess(
            goal,
            plan,
            task_signal.as_ref(),
            now,
            &self.config.alignment,
        );
        if !alignment_result.proceeds() {
            info!(
                session = %session.id,
                score = alignment_result.score,
                "alignment gate did not pass, compiling nothing"
            );
            return TurnOutput {
                unified_summary: format!("Parked for now: {}", alignment_result.reason),
                conversation: session.conversation.clone(),
                alignment: Some(alignment_result),
                decision: Some(decision),
                ..TurnOutput::default()
            };
        }

        let conditions = self.conditions.snapshot().await.ok();
        let role_distribution = (session.history.len()
            >= self.config.roles.rebalance_min_history)
            .then(|| session.history.distribution());

        let compile_cx = CompileContext {
            decision: &decision,
            context: &context,
            goal: goal_context.as_ref(),
            conditions: conditions.as_ref(),
            role_distribution,
            now,
        };
        let instructions = compiler::compile(
            &classification,
            text,
            &compile_cx,
            &self.config.conditions,
        );

        let router = Router::new(&self.registry, self.ledger.as_ref(), &self.config.router);
        let route_result = router.route(&instructions, &self.config.points).await;

        conversation::scan_outcomes(&mut session.conversation, &route_result.outcomes);

        let unified_summary = unified_summary(
            &route_result.summary,
            &route_result.outcomes,
            route_result.award.as_ref(),
            decision.role,
        );

        TurnOutput {
            instructions,
            outcomes: route_result.outcomes,
            unified_summary,
            execution: route_result.summary,
            conversation: session.conversation.clone(),
            alignment: Some(alignment_result),
            decision: Some(decision),
            award: route_result.award,
        }
    }
}

/// A turn's utterance is itself the task signal: direct user input, flagged
/// administrative or urgent from the extracted signals.
fn task_signal(classification: &Classification, signals: &SignalMap) -> Option<TaskSignal> {
    if classification.intents.is_empty() {
        return None;
    }
    Some(TaskSignal {
        source: TaskSource::Voice,
        admin_kind: signals.administrative,
        priority: if signals.urgency {
            Priority::High
        } else {
            Priority::Medium
        },
    })
}

// ─── Response summary ───────────────────────────────────────────────────────

fn unified_summary(
    execution: &ExecutionSummary,
    outcomes: &[Outcome],
    award: Option<&PointAward>,
    role: Role,
) -> String {
    let mut summary = match execution.total {
        0 => "Nothing to do this turn.".to_string(),
        1 => {
            let capability = outcomes
                .first()
                .map(|o| o.capability)
                .unwrap_or(Capability::Task);
            single_action_summary(capability).to_string()
        }
        n if execution.successful == n => format!("{n} actions coordinated."),
        n => format!("{}/{n} actions completed.", execution.successful),
    };
    if let Some(award) = award {
        summary.push_str(&format!(" +{} {} points.", award.points, role.letter()));
    }
    summary
}

fn single_action_summary(capability: Capability) -> &'static str {
    match capability {
        Capability::Task => "Task captured.",
        Capability::Calendar => "Calendar updated.",
        Capability::Meeting => "Meeting scheduled.",
        Capability::Focus => "Focus block planned.",
        Capability::Email => "Email drafted.",
        Capability::EmailSend => "Email sent.",
        Capability::Goal => "Goal updated.",
        Capability::Plan => "Plan updated.",
        Capability::Contact => "Contact saved.",
        Capability::Research => "Research queued.",
        Capability::Report | Capability::PlanReport => "Report ready.",
        Capability::Finance => "Finances updated.",
        Capability::Transcripts => "Transcript pulled.",
        Capability::Conditions => "Conditions checked.",
        Capability::Points => "Points recorded.",
    }
}
