//! Instruction compiler: turns classified sub-intents into an ordered,
//! typed instruction batch.
//!
//! Ordering invariant: primary instructions first, condition-derived
//! advisory instructions next, the single point instruction always last.

use crate::capability::{
    CalendarPayload, Capability, CapabilityPayload, ConditionsPayload, EmailPayload,
    EmailSendPayload, EnergyAdjustments, FocusPayload, GenericPayload, Instruction, LinkRefs,
    MeetingPayload, PointsPayload, ResearchKind, ResearchPayload, RoleContext, TaskPayload,
};
use crate::config::ConditionsConfig;
use crate::external::{Classification, ConditionSnapshot, GoalContext, SubIntent};
use crate::points::{ActionType, PointRequest};
use crate::roles::{DecisionContext, Role, RoleDecision};
use crate::timeparse::{self, ParsedTime};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

/// Below this recovery score the user is treated as low-capacity and
/// scheduled work is softened.
const LOW_CAPACITY_RECOVERY: f64 = 30.0;
const LOW_CAPACITY_DURATION_MULTIPLIER: f64 = 1.5;

const DEFAULT_FOCUS_MINUTES: u32 = 90;

/// Everything the compiler needs beyond the classification itself.
pub struct CompileContext<'a> {
    pub decision: &'a RoleDecision,
    pub context: &'a DecisionContext,
    pub goal: Option<&'a GoalContext>,
    pub conditions: Option<&'a ConditionSnapshot>,
    /// Session role shares for the balance multiplier, once the rolling
    /// history is deep enough to be meaningful.
    pub role_distribution: Option<HashMap<Role, f64>>,
    pub now: DateTime<Utc>,
}

/// Compile one turn's classification into the ordered instruction batch.
pub fn compile(
    classification: &Classification,
    raw_text: &str,
    cx: &CompileContext,
    config: &ConditionsConfig,
) -> Vec<Instruction> {
    let role_context = role_context(cx.decision);
    let parsed_time = timeparse::parse(raw_text, cx.now);

    let mut batch: Vec<Instruction> = Vec::new();

    if classification.intents.is_empty() {
        for domain in &classification.read_domains {
            match map_read_domain(domain) {
                Some(instruction_payload) => batch.push(Instruction {
                    intent: format!("read_{domain}"),
                    payload: instruction_payload,
                    role_context: role_context.clone(),
                }),
                None => warn!(%domain, "unknown read domain, skipping"),
            }
        }
    } else {
        for sub_intent in &classification.intents {
            let Some(capability) = map_category(&sub_intent.category) else {
                warn!(category = %sub_intent.category, "unknown intent category, skipping");
                continue;
            };
            let payload = build_payload(capability, sub_intent, raw_text, parsed_time.as_ref(), cx);
            batch.push(Instruction {
                intent: sub_intent.intent.clone(),
                payload,
                role_context: role_context.clone(),
            });
        }
    }

    advisory_pass(&mut batch, cx, &role_context, config);
    append_point_instruction(&mut batch, cx, &role_context, parsed_time.as_ref());

    debug!(instructions = batch.len(), "compiled instruction batch");
    batch
}

fn role_context(decision: &RoleDecision) -> RoleContext {
    RoleContext {
        role: decision.role,
        tone: decision.style.tone.clone(),
        task_approach: decision.style.task_approach.clone(),
        notes: decision.style.notes.clone(),
    }
}

// ─── Capability resolution ──────────────────────────────────────────────────

/// Closed category→capability map. Unknown categories are skipped by the
/// caller, never dispatched.
fn map_category(category: &str) -> Option<Capability> {
    let capability = match category {
        "task" => Capability::Task,
        "calendar" => Capability::Calendar,
        "email" => Capability::Email,
        "email_send" => Capability::EmailSend,
        "focus" => Capability::Focus,
        "goal" => Capability::Goal,
        "plan" => Capability::Plan,
        "contact" => Capability::Contact,
        "meeting" => Capability::Meeting,
        "transcripts" => Capability::Transcripts,
        "research" => Capability::Research,
        "finance" => Capability::Finance,
        "conditions" => Capability::Conditions,
        "points" => Capability::Points,
        _ => return None,
    };
    Some(capability)
}

/// Read-only information domains, used when a turn carries no actionable
/// intent.
fn map_read_domain(domain: &str) -> Option<CapabilityPayload> {
    let payload = match domain {
        "report" => CapabilityPayload::Report(GenericPayload::default()),
        "plan_report" => CapabilityPayload::PlanReport(GenericPayload::default()),
        "research" => CapabilityPayload::Research(ResearchPayload::default()),
        "conditions" => CapabilityPayload::Conditions(ConditionsPayload::default()),
        "finance_status" => CapabilityPayload::Finance(GenericPayload::default()),
        "goal_status" => CapabilityPayload::Goal(GenericPayload::default()),
        "meeting_summary" => CapabilityPayload::Transcripts(GenericPayload::default()),
        _ => return None,
    };
    Some(payload)
}

// ─── Payload assembly ───────────────────────────────────────────────────────

fn build_payload(
    capability: Capability,
    sub_intent: &SubIntent,
    raw_text: &str,
    parsed_time: Option<&ParsedTime>,
    cx: &CompileContext,
) -> CapabilityPayload {
    let style = &cx.decision.style;
    let role = cx.decision.role;
    let energy = energy_adjustments(cx.context.recovery);
    let token = capability
        .is_create_effect()
        .then(Uuid::new_v4);

    let mut payload = match capability {
        Capability::Task => CapabilityPayload::Task(TaskPayload {
            title: extract_title(sub_intent),
            deadline: parsed_time.map(|t| t.start),
            approach: style.task_approach.clone(),
            priority: style.priority,
            include_team_context: role == Role::Integrator,
            timebox_minutes: timebox_minutes(role),
            energy,
            links: LinkRefs::default(),
            idempotency_token: token,
            extra: sub_intent.payload.clone(),
        }),
        Capability::Calendar => CapabilityPayload::Calendar(CalendarPayload {
            title: extract_title(sub_intent),
            time: parsed_time.cloned(),
            duration_minutes: parsed_time.map(duration_minutes),
            buffer_minutes: style.calendar_buffer_minutes,
            allow_back_to_back: role == Role::Producer,
            include_focus_blocks: role == Role::Administrator,
            prefer_virtual: false,
            auto_reschedule_conflicts: false,
            priority: style.priority,
            reason: None,
            energy,
            links: LinkRefs::default(),
            idempotency_token: token,
            extra: sub_intent.payload.clone(),
        }),
        Capability::Email => CapabilityPayload::Email(EmailPayload {
            tone: style.tone.clone(),
            include_acknowledgement: role == Role::Integrator,
            use_bullet_points: role == Role::Producer,
            vision_context: role == Role::Entrepreneur,
            structured_format: role == Role::Administrator,
            extra: sub_intent.payload.clone(),
        }),
        Capability::EmailSend => CapabilityPayload::EmailSend(EmailSendPayload {
            tone: style.tone.clone(),
            idempotency_token: token,
            extra: sub_intent.payload.clone(),
        }),
        Capability::Focus => CapabilityPayload::Focus(FocusPayload {
            duration_minutes: parsed_time
                .map(duration_minutes)
                .unwrap_or(DEFAULT_FOCUS_MINUTES),
            time: parsed_time.cloned(),
            prefer_virtual: false,
            priority: style.priority,
            energy,
            links: LinkRefs::default(),
            idempotency_token: token,
            extra: sub_intent.payload.clone(),
        }),
        Capability::Meeting => CapabilityPayload::Meeting(MeetingPayload {
            title: extract_title(sub_intent),
            time: parsed_time.cloned(),
            buffer_minutes: style.calendar_buffer_minutes,
            prefer_virtual: false,
            auto_transcribe: true,
            priority: style.priority,
            energy,
            links: LinkRefs::default(),
            idempotency_token: token,
            extra: sub_intent.payload.clone(),
        }),
        Capability::Research => CapabilityPayload::Research(ResearchPayload {
            query: extract_title(sub_intent).unwrap_or_else(|| raw_text.to_string()),
            kind: research_kind(raw_text),
            detailed: raw_text.contains("detailed") || raw_text.contains("deep"),
        }),
        Capability::Conditions => CapabilityPayload::Conditions(ConditionsPayload {
            query: extract_title(sub_intent),
            detailed: false,
        }),
        Capability::Points => CapabilityPayload::Points(PointsPayload {
            request: point_request(ActionType::ReportViewed, cx, None),
            links: goal_links(cx),
        }),
        Capability::Goal => CapabilityPayload::Goal(generic(sub_intent, token)),
        Capability::Plan => CapabilityPayload::Plan(generic(sub_intent, token)),
        Capability::Contact => CapabilityPayload::Contact(generic(sub_intent, token)),
        Capability::Transcripts => CapabilityPayload::Transcripts(generic(sub_intent, token)),
        Capability::Report => CapabilityPayload::Report(generic(sub_intent, token)),
        Capability::PlanReport => CapabilityPayload::PlanReport(generic(sub_intent, token)),
        Capability::Finance => CapabilityPayload::Finance(generic(sub_intent, token)),
    };

    if capability.supports_linking()
        && let Some(links) = payload.links_mut()
        && links.is_empty()
    {
        *links = goal_links(cx);
    }

    payload
}

fn generic(sub_intent: &SubIntent, token: Option<Uuid>) -> GenericPayload {
    GenericPayload {
        links: LinkRefs::default(),
        idempotency_token: token,
        extra: sub_intent.payload.clone(),
    }
}

fn extract_title(sub_intent: &SubIntent) -> Option<String> {
    sub_intent
        .payload
        .get("title")
        .or_else(|| sub_intent.payload.get("query"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

fn duration_minutes(time: &ParsedTime) -> u32 {
    (time.end - time.start).num_minutes().max(0) as u32
}

fn timebox_minutes(role: Role) -> u32 {
    match role {
        Role::Producer => 25,
        Role::Administrator => 50,
        Role::Entrepreneur => 45,
        Role::Integrator => 40,
    }
}

fn energy_adjustments(recovery: f64) -> EnergyAdjustments {
    if recovery < LOW_CAPACITY_RECOVERY {
        EnergyAdjustments {
            duration_multiplier: LOW_CAPACITY_DURATION_MULTIPLIER,
            allow_extra_breaks: true,
        }
    } else {
        EnergyAdjustments::default()
    }
}

fn goal_links(cx: &CompileContext) -> LinkRefs {
    match cx.goal {
        Some(goal_cx) => LinkRefs {
            goal_id: goal_cx.goal.as_ref().map(|g| g.id.clone()),
            plan_id: goal_cx.plan.as_ref().map(|p| p.id.clone()),
        },
        None => LinkRefs::default(),
    }
}

fn research_kind(text: &str) -> ResearchKind {
    let lower = text.to_lowercase();
    if lower.contains("competitor") || lower.contains("competitive") {
        ResearchKind::CompetitiveAnalysis
    } else if lower.contains("content") || lower.contains("article") {
        ResearchKind::ContentCuration
    } else if lower.contains("price") || lower.contains("pricing") {
        ResearchKind::PriceMonitoring
    } else if lower.contains("market") || lower.contains("trend") {
        ResearchKind::MarketResearch
    } else {
        ResearchKind::GeneralResearch
    }
}

// ─── Advisory pass ──────────────────────────────────────────────────────────

/// Condition-derived adjustments. An ideal metric band appends one
/// block-calendar-time instruction; elevated risk only mutates schedule-like
/// instructions already in the batch.
fn advisory_pass(
    batch: &mut Vec<Instruction>,
    cx: &CompileContext,
    role_context: &RoleContext,
    config: &ConditionsConfig,
) {
    let Some(snapshot) = cx.conditions else {
        return;
    };

    if let Some(metric) = snapshot.activity_metric
        && metric >= config.ideal_band_min
        && metric <= config.ideal_band_max
    {
        debug!(metric, "conditions in ideal band, blocking calendar time");
        batch.push(Instruction {
            intent: "block_time".to_string(),
            payload: CapabilityPayload::Calendar(CalendarPayload {
                title: Some("Protected time block".to_string()),
                time: None,
                duration_minutes: Some(config.block_duration_minutes),
                buffer_minutes: 0,
                allow_back_to_back: false,
                include_focus_blocks: false,
                prefer_virtual: false,
                auto_reschedule_conflicts: true,
                priority: crate::roles::Priority::High,
                reason: Some(format!("conditions ideal ({metric:.0})")),
                energy: EnergyAdjustments::default(),
                links: goal_links(cx),
                idempotency_token: Some(Uuid::new_v4()),
                extra: serde_json::Value::Null,
            }),
            role_context: role_context.clone(),
        });
    }

    if snapshot.risk.is_elevated() {
        for instruction in batch.iter_mut() {
            if let Some(flag) = instruction.payload.prefer_virtual_mut() {
                *flag = true;
            }
        }
    }
}

// ─── Point instruction ──────────────────────────────────────────────────────

fn point_request(
    action_type: ActionType,
    cx: &CompileContext,
    duration: Option<u32>,
) -> PointRequest {
    PointRequest {
        action_type,
        role: cx.decision.role,
        difficulty: None,
        duration_minutes: duration,
        priority: Some(cx.decision.style.priority),
        role_distribution: cx.role_distribution.clone(),
        recovery_score: Some(cx.context.recovery),
    }
}

/// Append exactly one point instruction when the batch holds at least one
/// non-advisory capability and none exists yet.
fn append_point_instruction(
    batch: &mut Vec<Instruction>,
    cx: &CompileContext,
    role_context: &RoleContext,
    parsed_time: Option<&ParsedTime>,
) {
    if batch.iter().any(|i| i.capability().is_point()) {
        return;
    }
    let capabilities: Vec<Capability> = batch
        .iter()
        .map(Instruction::capability)
        .filter(|c| !c.is_advisory())
        .collect();
    if capabilities.is_empty() {
        return;
    }

    let action_type = point_action(&capabilities);
    let duration = parsed_time.map(duration_minutes);
    batch.push(Instruction {
        intent: "award_points".to_string(),
        payload: CapabilityPayload::Points(PointsPayload {
            request: point_request(action_type, cx, duration),
            links: goal_links(cx),
        }),
        role_context: role_context.clone(),
    });
}

/// Most decision-relevant activated capability wins.
fn point_action(capabilities: &[Capability]) -> ActionType {
    let has = |c: Capability| capabilities.contains(&c);
    if has(Capability::Calendar) || has(Capability::Meeting) {
        ActionType::MeetingComplete
    } else if has(Capability::Focus) {
        ActionType::DeepWorkBlock
    } else if has(Capability::Report) || has(Capability::PlanReport) {
        ActionType::ReportViewed
    } else {
        ActionType::TaskComplete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::{Goal, GoalStatus};
    use crate::external::RiskLevel;
    use crate::roles::{RoleHistory, decide};
    use crate::signals::SignalMap;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap()
    }

    fn producer_decision() -> RoleDecision {
        let signals = SignalMap {
            urgency: true,
            execution_focus: true,
            ..SignalMap::default()
        };
        decide(
            &signals,
            &DecisionContext::default(),
            &mut RoleHistory::default(),
            &crate::config::RolesConfig::default(),
        )
    }

    fn sub(category: &str, intent: &str) -> SubIntent {
        SubIntent {
            category: category.to_string(),
            intent: intent.to_string(),
            payload: serde_json::Value::Null,
            role_hint: None,
        }
    }

    fn classification(intents: Vec<SubIntent>) -> Classification {
        Classification {
            intents,
            read_domains: Vec::new(),
            confidence: 0.9,
        }
    }

    #[test]
    fn unknown_category_is_skipped_not_fatal() {
        let decision = producer_decision();
        let cx = CompileContext {
            decision: &decision,
            context: &DecisionContext::default(),
            goal: None,
            conditions: None,
            role_distribution: None,
            now: now(),
        };
        let classification =
            classification(vec![sub("task", "create_task"), sub("teleport", "beam_up")]);
        let batch = compile(&classification, "finish the report", &cx, &ConditionsConfig::default());

        // Task plus the point instruction; the unknown category vanished.
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].capability(), Capability::Task);
        assert!(batch[1].capability().is_point());
    }

    #[test]
    fn point_instruction_is_always_last_and_unique() {
        let decision = producer_decision();
        let cx = CompileContext {
            decision: &decision,
            context: &DecisionContext::default(),
            goal: None,
            conditions: None,
            role_distribution: None,
            now: now(),
        };
        let classification = classification(vec![
            sub("calendar", "schedule_event"),
            sub("email", "draft_reply"),
            sub("task", "create_task"),
        ]);
        let batch = compile(&classification, "meeting tomorrow at 3pm", &cx, &ConditionsConfig::default());

        let point_positions: Vec<usize> = batch
            .iter()
            .enumerate()
            .filter(|(_, i)| i.capability().is_point())
            .map(|(n, _)| n)
            .collect();
        assert_eq!(point_positions, vec![batch.len() - 1]);

        // Calendar outranks email and task in the action priority table.
        let CapabilityPayload::Points(ref p) = batch.last().unwrap().payload else {
            panic!("expected point payload");
        };
        assert_eq!(p.request.action_type, ActionType::MeetingComplete);
    }

    #[test]
    fn empty_batch_gets_no_point_instruction() {
        let decision = producer_decision();
        let cx = CompileContext {
            decision: &decision,
            context: &DecisionContext::default(),
            goal: None,
            conditions: None,
            role_distribution: None,
            now: now(),
        };
        let batch = compile(
            &classification(vec![sub("nonsense", "x")]),
            "gibberish",
            &cx,
            &ConditionsConfig::default(),
        );
        assert!(batch.is_empty());
    }

    #[test]
    fn elevated_risk_flags_only_schedule_like_instructions() {
        let decision = producer_decision();
        let snapshot = ConditionSnapshot {
            fit_score: Some(0.4),
            activity_metric: Some(60.0),
            risk: RiskLevel::High,
            taken_at: Some(now()),
        };
        let cx = CompileContext {
            decision: &decision,
            context: &DecisionContext::default(),
            goal: None,
            conditions: Some(&snapshot),
            role_distribution: None,
            now: now(),
        };
        let classification = classification(vec![
            sub("meeting", "schedule_meeting"),
            sub("email", "draft_reply"),
        ]);
        let batch = compile(&classification, "sync at 10:00am", &cx, &ConditionsConfig::default());

        let CapabilityPayload::Meeting(ref meeting) = batch[0].payload else {
            panic!("expected meeting payload");
        };
        assert!(meeting.prefer_virtual);
        // Email has no prefer-virtual knob and the metric is outside the
        // ideal band, so no block-time instruction was added.
        assert_eq!(batch.len(), 3);
    }

    #[test]
    fn ideal_conditions_append_high_priority_block() {
        let decision = producer_decision();
        let snapshot = ConditionSnapshot {
            fit_score: Some(0.9),
            activity_metric: Some(18.0),
            risk: RiskLevel::Low,
            taken_at: Some(now()),
        };
        let cx = CompileContext {
            decision: &decision,
            context: &DecisionContext::default(),
            goal: None,
            conditions: Some(&snapshot),
            role_distribution: None,
            now: now(),
        };
        let config = ConditionsConfig::default();
        let batch = compile(
            &classification(vec![sub("task", "create_task")]),
            "write the brief",
            &cx,
            &config,
        );

        // task, block-time calendar, point.
        assert_eq!(batch.len(), 3);
        let CapabilityPayload::Calendar(ref block) = batch[1].payload else {
            panic!("expected calendar payload");
        };
        assert!(block.auto_reschedule_conflicts);
        assert_eq!(block.duration_minutes, Some(config.block_duration_minutes));
        assert_eq!(block.priority, crate::roles::Priority::High);
        assert!(batch[2].capability().is_point());
    }

    #[test]
    fn low_recovery_softens_scheduled_work() {
        let decision = producer_decision();
        let context = DecisionContext {
            recovery: 25.0,
            ..DecisionContext::default()
        };
        let cx = CompileContext {
            decision: &decision,
            context: &context,
            goal: None,
            conditions: None,
            role_distribution: None,
            now: now(),
        };
        let batch = compile(
            &classification(vec![sub("focus", "deep_work")]),
            "deep work today for 2 hours",
            &cx,
            &ConditionsConfig::default(),
        );
        let CapabilityPayload::Focus(ref focus) = batch[0].payload else {
            panic!("expected focus payload");
        };
        assert_eq!(focus.energy.duration_multiplier, 1.5);
        assert!(focus.energy.allow_extra_breaks);
        assert_eq!(focus.duration_minutes, 120);
    }

    #[test]
    fn goal_and_plan_ids_attach_to_linkable_payloads() {
        let decision = producer_decision();
        let goal_cx = GoalContext {
            goal: Some(Goal {
                id: "g-1".to_string(),
                purpose: "ship it".to_string(),
                status: GoalStatus::InProgress,
                end_date: None,
                point_target: 500,
            }),
            plan: None,
        };
        let cx = CompileContext {
            decision: &decision,
            context: &DecisionContext::default(),
            goal: Some(&goal_cx),
            conditions: None,
            role_distribution: None,
            now: now(),
        };
        let batch = compile(
            &classification(vec![sub("task", "create_task"), sub("email", "draft_reply")]),
            "draft the update",
            &cx,
            &ConditionsConfig::default(),
        );
        let CapabilityPayload::Task(ref task) = batch[0].payload else {
            panic!("expected task payload");
        };
        assert_eq!(task.links.goal_id.as_deref(), Some("g-1"));
        assert!(task.idempotency_token.is_some());
    }

    #[test]
    fn read_only_turn_compiles_read_domains() {
        let decision = producer_decision();
        let cx = CompileContext {
            decision: &decision,
            context: &DecisionContext::default(),
            goal: None,
            conditions: None,
            role_distribution: None,
            now: now(),
        };
        let classification = Classification {
            intents: Vec::new(),
            read_domains: vec!["plan_report".to_string(), "unknown_domain".to_string()],
            confidence: 0.8,
        };
        let batch = compile(&classification, "how is my plan going", &cx, &ConditionsConfig::default());

        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].capability(), Capability::PlanReport);
        let CapabilityPayload::Points(ref p) = batch[1].payload else {
            panic!("expected point payload");
        };
        assert_eq!(p.request.action_type, ActionType::ReportViewed);
    }
}
