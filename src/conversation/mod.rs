//! Multi-turn slot filling: a small per-session state machine that collects
//! missing instruction fields directly from the user.
//!
//! Answers are stored verbatim. No inference, no validation: whatever the
//! user typed for a field is that field's value.

use crate::capability::Capability;
use crate::router::Outcome;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::VecDeque;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConversationState {
    #[default]
    Idle,
    AwaitingUser {
        capability: Capability,
        missing: VecDeque<String>,
        filled: HashMap<String, String>,
    },
    /// Terminal per cycle; collapses to Idle at the next turn entry.
    Complete {
        capability: Capability,
        filled: HashMap<String, String>,
    },
}

impl ConversationState {
    pub fn is_awaiting(&self) -> bool {
        matches!(self, ConversationState::AwaitingUser { .. })
    }
}

/// What the turn-entry gate decided for this message.
#[derive(Debug, Clone, PartialEq)]
pub enum GateAction {
    /// Not slot filling; run the full decision pipeline.
    PassThrough,
    /// The message answered one missing field; more remain.
    FieldCaptured { field: String, remaining: usize },
    /// The message answered the last missing field.
    CycleComplete {
        capability: Capability,
        filled: HashMap<String, String>,
    },
}

/// Turn-entry gate. A completed cycle from the previous turn collapses back
/// to Idle before anything else happens; while awaiting, the raw message is
/// consumed as the next field's value and the decision pipeline is skipped.
pub fn on_turn_entry(state: &mut ConversationState, raw_message: &str) -> GateAction {
    if matches!(state, ConversationState::Complete { .. }) {
        *state = ConversationState::Idle;
    }

    let ConversationState::AwaitingUser {
        capability,
        missing,
        filled,
    } = state
    else {
        return GateAction::PassThrough;
    };

    let Some(field) = missing.pop_front() else {
        // An awaiting state with an empty queue cannot be entered through
        // begin_awaiting; recover by resetting.
        *state = ConversationState::Idle;
        return GateAction::PassThrough;
    };

    filled.insert(field.clone(), raw_message.to_string());
    debug!(%field, remaining = missing.len(), "captured slot value");

    if missing.is_empty() {
        let capability = *capability;
        let filled = std::mem::take(filled);
        *state = ConversationState::Complete {
            capability,
            filled: filled.clone(),
        };
        GateAction::CycleComplete { capability, filled }
    } else {
        GateAction::FieldCaptured {
            field,
            remaining: missing.len(),
        }
    }
}

/// Post-execution scan: the first outcome reporting missing required fields
/// starts an awaiting cycle for its capability. Later signals in the same
/// batch are ignored; one cycle at a time.
pub fn scan_outcomes(state: &mut ConversationState, outcomes: &[Outcome]) {
    if state.is_awaiting() {
        return;
    }
    for outcome in outcomes {
        if let Some(fields) = outcome.missing_fields()
            && !fields.is_empty()
        {
            debug!(capability = %outcome.capability, ?fields, "entering slot-filling cycle");
            *state = ConversationState::AwaitingUser {
                capability: outcome.capability,
                missing: fields.iter().cloned().collect(),
                filled: HashMap::new(),
            };
            return;
        }
    }
}
