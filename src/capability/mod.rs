//! The closed capability set and its typed payloads.
//!
//! Capabilities are a tagged union, exhaustively matched at compile time.
//! There is no string-keyed dispatch anywhere in the core: a payload variant
//! IS the capability, so an instruction can never name a capability whose
//! payload shape it does not carry.

use crate::points::PointRequest;
use crate::roles::{Priority, Role};
use crate::timeparse::ParsedTime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Capability kinds ───────────────────────────────────────────────────────

/// Closed set of external-effect handlers the router can dispatch to.
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
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    Task,
    Calendar,
    Email,
    EmailSend,
    Focus,
    Goal,
    Plan,
    Contact,
    Meeting,
    Transcripts,
    Research,
    Report,
    PlanReport,
    Finance,
    Conditions,
    Points,
}

impl Capability {
    /// Capabilities whose payloads carry time metadata and scheduling
    /// directives.
    pub fn is_schedule_like(self) -> bool {
        matches!(self, Capability::Calendar | Capability::Meeting | Capability::Focus)
    }

    /// Advisory capabilities run best-effort after the primary batch and
    /// never count toward the execution summary.
    pub fn is_advisory(self) -> bool {
        matches!(self, Capability::Conditions | Capability::Transcripts)
    }

    pub fn is_point(self) -> bool {
        self == Capability::Points
    }

    /// Create-type side effects carry an idempotency token so a retried
    /// dispatch never duplicates the external effect.
    pub fn is_create_effect(self) -> bool {
        matches!(
            self,
            Capability::Task
                | Capability::Calendar
                | Capability::EmailSend
                | Capability::Focus
                | Capability::Goal
                | Capability::Plan
                | Capability::Contact
                | Capability::Meeting
                | Capability::Finance
        )
    }

    /// Capabilities whose records can carry goal/plan links.
    pub fn supports_linking(self) -> bool {
        matches!(
            self,
            Capability::Task
                | Capability::Calendar
                | Capability::Focus
                | Capability::Meeting
                | Capability::Goal
                | Capability::Plan
                | Capability::Finance
        )
    }
}

// ─── Shared payload fragments ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LinkRefs {
    pub goal_id: Option<String>,
    pub plan_id: Option<String>,
}

impl LinkRefs {
    pub fn is_empty(&self) -> bool {
        self.goal_id.is_none() && self.plan_id.is_none()
    }
}

/// Adjustments applied when recovery capacity is low.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyAdjustments {
    pub duration_multiplier: f64,
    pub allow_extra_breaks: bool,
}

impl Default for EnergyAdjustments {
    fn default() -> Self {
        Self {
            duration_multiplier: 1.0,
            allow_extra_breaks: false,
        }
    }
}

// ─── Per-capability payloads ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TaskPayload {
    pub title: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub approach: String,
    pub priority: Priority,
    pub include_team_context: bool,
    pub timebox_minutes: u32,
    pub energy: EnergyAdjustments,
    pub links: LinkRefs,
    pub idempotency_token: Option<Uuid>,
    #[serde(default)]
    pub extra: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CalendarPayload {
    pub title: Option<String>,
    pub time: Option<ParsedTime>,
    pub duration_minutes: Option<u32>,
    pub buffer_minutes: u32,
    pub allow_back_to_back: bool,
    pub include_focus_blocks: bool,
    pub prefer_virtual: bool,
    pub auto_reschedule_conflicts: bool,
    pub priority: Priority,
    pub reason: Option<String>,
    pub energy: EnergyAdjustments,
    pub links: LinkRefs,
    pub idempotency_token: Option<Uuid>,
    #[serde(default)]
    pub extra: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EmailPayload {
    pub tone: String,
    pub include_acknowledgement: bool,
    pub use_bullet_points: bool,
    pub vision_context: bool,
    pub structured_format: bool,
    #[serde(default)]
    pub extra: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EmailSendPayload {
    pub tone: String,
    pub idempotency_token: Option<Uuid>,
    #[serde(default)]
    pub extra: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FocusPayload {
    pub duration_minutes: u32,
    pub time: Option<ParsedTime>,
    pub prefer_virtual: bool,
    pub priority: Priority,
    pub energy: EnergyAdjustments,
    pub links: LinkRefs,
    pub idempotency_token: Option<Uuid>,
    #[serde(default)]
    pub extra: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MeetingPayload {
    pub title: Option<String>,
    pub time: Option<ParsedTime>,
    pub buffer_minutes: u32,
    pub prefer_virtual: bool,
    pub auto_transcribe: bool,
    pub priority: Priority,
    pub energy: EnergyAdjustments,
    pub links: LinkRefs,
    pub idempotency_token: Option<Uuid>,
    #[serde(default)]
    pub extra: serde_json::Value,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResearchKind {
    CompetitiveAnalysis,
    ContentCuration,
    PriceMonitoring,
    MarketResearch,
    #[default]
    GeneralResearch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ResearchPayload {
    pub query: String,
    pub kind: ResearchKind,
    pub detailed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConditionsPayload {
    pub query: Option<String>,
    pub detailed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsPayload {
    pub request: PointRequest,
    pub links: LinkRefs,
}

/// Thin pass-through record for capabilities whose parameters the core does
/// not interpret beyond forwarding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GenericPayload {
    pub links: LinkRefs,
    pub idempotency_token: Option<Uuid>,
    #[serde(default)]
    pub extra: serde_json::Value,
}

// ─── The tagged union ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "capability", rename_all = "snake_case")]
pub enum CapabilityPayload {
    Task(TaskPayload),
    Calendar(CalendarPayload),
    Email(EmailPayload),
    EmailSend(EmailSendPayload),
    Focus(FocusPayload),
    Goal(GenericPayload),
    Plan(GenericPayload),
    Contact(GenericPayload),
    Meeting(MeetingPayload),
    Transcripts(GenericPayload),
    Research(ResearchPayload),
    Report(GenericPayload),
    PlanReport(GenericPayload),
    Finance(GenericPayload),
    Conditions(ConditionsPayload),
    Points(PointsPayload),
}

impl CapabilityPayload {
    pub fn capability(&self) -> Capability {
        match self {
            CapabilityPayload::Task(_) => Capability::Task,
            CapabilityPayload::Calendar(_) => Capability::Calendar,
            CapabilityPayload::Email(_) => Capability::Email,
            CapabilityPayload::EmailSend(_) => Capability::EmailSend,
            CapabilityPayload::Focus(_) => Capability::Focus,
            CapabilityPayload::Goal(_) => Capability::Goal,
            CapabilityPayload::Plan(_) => Capability::Plan,
            CapabilityPayload::Contact(_) => Capability::Contact,
            CapabilityPayload::Meeting(_) => Capability::Meeting,
            CapabilityPayload::Transcripts(_) => Capability::Transcripts,
            CapabilityPayload::Research(_) => Capability::Research,
            CapabilityPayload::Report(_) => Capability::Report,
            CapabilityPayload::PlanReport(_) => Capability::PlanReport,
            CapabilityPayload::Finance(_) => Capability::Finance,
            CapabilityPayload::Conditions(_) => Capability::Conditions,
            CapabilityPayload::Points(_) => Capability::Points,
        }
    }

    /// Goal/plan link refs, for payloads that support linking.
    pub fn links_mut(&mut self) -> Option<&mut LinkRefs> {
        match self {
            CapabilityPayload::Task(p) => Some(&mut p.links),
            CapabilityPayload::Calendar(p) => Some(&mut p.links),
            CapabilityPayload::Focus(p) => Some(&mut p.links),
            CapabilityPayload::Meeting(p) => Some(&mut p.links),
            CapabilityPayload::Goal(p)
            | CapabilityPayload::Plan(p)
            | CapabilityPayload::Finance(p) => Some(&mut p.links),
            _ => None,
        }
    }

    /// The prefer-virtual directive, for schedule-like payloads.
    pub fn prefer_virtual_mut(&mut self) -> Option<&mut bool> {
        match self {
            CapabilityPayload::Calendar(p) => Some(&mut p.prefer_virtual),
            CapabilityPayload::Meeting(p) => Some(&mut p.prefer_virtual),
            CapabilityPayload::Focus(p) => Some(&mut p.prefer_virtual),
            _ => None,
        }
    }
}

// ─── Instruction ────────────────────────────────────────────────────────────

/// Role context attached to every instruction so handlers can honor the
/// turn's posture without reaching back into the decision engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleContext {
    pub role: Role,
    pub tone: String,
    pub task_approach: String,
    pub notes: Vec<String>,
}

/// One routable unit of work: the fine-grained intent name, the typed
/// payload (which fixes the capability), and the turn's role context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub intent: String,
    pub payload: CapabilityPayload,
    pub role_context: RoleContext,
}

impl Instruction {
    pub fn capability(&self) -> Capability {
        self.payload.capability()
    }
}
