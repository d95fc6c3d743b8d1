//! Execution router: dispatches a compiled instruction batch to capability
//! handlers in three sequential phases and aggregates the outcomes.
//!
//! Phase order is fixed: primary instructions, then advisory, then the point
//! instruction. Handler failures and timeouts are captured at this boundary
//! and become failed outcomes; nothing propagates, and a failure never stops
//! the siblings queued behind it.

use crate::capability::{Capability, CapabilityPayload, Instruction};
use crate::config::{PointsConfig, RouterConfig};
use crate::external::LedgerSink;
use crate::points::{self, LedgerEntry, PointAward};
use crate::roles::Role;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

// ─── Handler contract ───────────────────────────────────────────────────────

/// What a handler reports back without failing.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerReply {
    Done(serde_json::Value),
    /// The payload lacks fields only the user can supply. Not an error;
    /// drives the conversation slot-filler.
    MissingFields(Vec<String>),
}

#[async_trait]
pub trait CapabilityHandler: Send + Sync {
    async fn handle(&self, instruction: &Instruction) -> anyhow::Result<HandlerReply>;
}

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<Capability, Arc<dyn CapabilityHandler>>,
}

impl HandlerRegistry {
    pub fn register(&mut self, capability: Capability, handler: Arc<dyn CapabilityHandler>) {
        self.handlers.insert(capability, handler);
    }

    pub fn get(&self, capability: Capability) -> Option<&Arc<dyn CapabilityHandler>> {
        self.handlers.get(&capability)
    }
}

// ─── Outcomes ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeError {
    HandlerFailed { message: String },
    Timeout,
    Unregistered,
    MissingFields { fields: Vec<String> },
}

/// Result of dispatching one instruction. Every attempted instruction is
/// represented, failed or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub capability: Capability,
    pub intent: String,
    pub role: Role,
    pub success: bool,
    #[serde(default)]
    pub data: serde_json::Value,
    pub error: Option<OutcomeError>,
}

impl Outcome {
    pub fn missing_fields(&self) -> Option<&[String]> {
        match &self.error {
            Some(OutcomeError::MissingFields { fields }) => Some(fields),
            _ => None,
        }
    }
}

/// Counts from the primary phase only; advisory and point dispatches are
/// best-effort and never alter these numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExecutionSummary {
    pub total: usize,
    pub successful: usize,
    /// Fraction of primary outcomes handled under each role.
    pub role_distribution: HashMap<Role, f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RouteResult {
    pub outcomes: Vec<Outcome>,
    pub summary: ExecutionSummary,
    pub award: Option<PointAward>,
}

// ─── Router ─────────────────────────────────────────────────────────────────

pub struct Router<'a> {
    registry: &'a HandlerRegistry,
    ledger: &'a dyn LedgerSink,
    config: &'a RouterConfig,
}

impl<'a> Router<'a> {
    pub fn new(
        registry: &'a HandlerRegistry,
        ledger: &'a dyn LedgerSink,
        config: &'a RouterConfig,
    ) -> Self {
        Self {
            registry,
            ledger,
            config,
        }
    }

    /// Run the batch through the three phases. Strictly sequential; no
    /// cancellation mid-batch.
    pub async fn route(
        &self,
        batch: &[Instruction],
        points_config: &PointsConfig,
    ) -> RouteResult {
        let mut result = RouteResult::default();

        let primary: Vec<&Instruction> = batch
            .iter()
            .filter(|i| !i.capability().is_advisory() && !i.capability().is_point())
            .collect();
        let advisory: Vec<&Instruction> =
            batch.iter().filter(|i| i.capability().is_advisory()).collect();
        let point: Vec<&Instruction> = batch.iter().filter(|i| i.capability().is_point()).collect();

        for instruction in &primary {
            let outcome = self.dispatch(instruction).await;
            result.outcomes.push(outcome);
        }
        result.summary = summarize(&result.outcomes);

        for instruction in advisory {
            let outcome = self.dispatch(instruction).await;
            if !outcome.success {
                debug!(capability = %outcome.capability, "advisory dispatch failed, continuing");
            }
            result.outcomes.push(outcome);
        }

        for instruction in point {
            let (outcome, award) = self.award_points(instruction, points_config).await;
            result.award = award;
            result.outcomes.push(outcome);
        }

        result
    }

    async fn dispatch(&self, instruction: &Instruction) -> Outcome {
        let capability = instruction.capability();
        let base = |success, data, error| Outcome {
            capability,
            intent: instruction.intent.clone(),
            role: instruction.role_context.role,
            success,
            data,
            error,
        };

        let Some(handler) = self.registry.get(capability) else {
            warn!(%capability, "no handler registered");
            return base(
                false,
                serde_json::Value::Null,
                Some(OutcomeError::Unregistered),
            );
        };

        let timeout = Duration::from_secs(self.config.handler_timeout_secs);
        match tokio::time::timeout(timeout, handler.handle(instruction)).await {
            Ok(Ok(HandlerReply::Done(data))) => base(true, data, None),
            Ok(Ok(HandlerReply::MissingFields(fields))) => base(
                false,
                serde_json::Value::Null,
                Some(OutcomeError::MissingFields { fields }),
            ),
            Ok(Err(err)) => {
                warn!(%capability, error = %err, "handler failed");
                base(
                    false,
                    serde_json::Value::Null,
                    Some(OutcomeError::HandlerFailed {
                        message: err.to_string(),
                    }),
                )
            }
            Err(_) => {
                warn!(%capability, timeout_secs = self.config.handler_timeout_secs, "handler timed out");
                base(false, serde_json::Value::Null, Some(OutcomeError::Timeout))
            }
        }
    }

    /// The point phase computes the award internally and persists it through
    /// the ledger sink. It never reads another outcome's data, and nothing
    /// reads its outcome in turn.
    async fn award_points(
        &self,
        instruction: &Instruction,
        points_config: &PointsConfig,
    ) -> (Outcome, Option<PointAward>) {
        let CapabilityPayload::Points(payload) = &instruction.payload else {
            // Payload variant and capability cannot disagree.
            unreachable!("point instruction without a point payload");
        };

        match points::calculate(&payload.request, points_config) {
            Ok(award) => {
                let entry = LedgerEntry {
                    amount: award.points,
                    role: payload.request.role,
                    reason: award.reason.clone(),
                    category: award.category.clone(),
                    bonus: award.bonus,
                    task_id: None,
                    plan_id: payload.links.plan_id.clone(),
                    goal_id: payload.links.goal_id.clone(),
                };
                if let Err(err) = self.ledger.persist(&entry).await {
                    warn!(error = %err, "ledger persist failed, award still reported");
                }
                let outcome = Outcome {
                    capability: Capability::Points,
                    intent: instruction.intent.clone(),
                    role: instruction.role_context.role,
                    success: true,
                    data: serde_json::to_value(&award).unwrap_or(serde_json::Value::Null),
                    error: None,
                };
                (outcome, Some(award))
            }
            Err(err) => {
                warn!(error = %err, "point calculation rejected");
                let outcome = Outcome {
                    capability: Capability::Points,
                    intent: instruction.intent.clone(),
                    role: instruction.role_context.role,
                    success: false,
                    data: serde_json::Value::Null,
                    error: Some(OutcomeError::HandlerFailed {
                        message: err.to_string(),
                    }),
                };
                (outcome, None)
            }
        }
    }
}

fn summarize(primary_outcomes: &[Outcome]) -> ExecutionSummary {
    let total = primary_outcomes.len();
    let successful = primary_outcomes.iter().filter(|o| o.success).count();
    let mut role_distribution = HashMap::new();
    if total > 0 {
        let mut counts: HashMap<Role, usize> = HashMap::new();
        for outcome in primary_outcomes {
            *counts.entry(outcome.role).or_default() += 1;
        }
        for (role, count) in counts {
            role_distribution.insert(role, count as f64 / total as f64);
        }
    }
    ExecutionSummary {
        total,
        successful,
        role_distribution,
    }
}
