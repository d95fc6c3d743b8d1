//! Signal extraction: named boolean flags derived from classified sub-intents
//! and the raw utterance. Ephemeral, one map per turn.

use crate::external::SubIntent;
use crate::roles::DeadlinePressure;
use serde::{Deserialize, Serialize};

/// Boolean decision signals consumed by the role engine. Keyword-driven on
/// the lowercased utterance plus structural checks on sub-intent categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SignalMap {
    pub urgency: bool,
    pub deadline: bool,
    pub administrative: bool,
    pub structured: bool,
    pub exploratory: bool,
    pub strategic: bool,
    pub creative: bool,
    pub involves_people: bool,
    pub emotional_tone: bool,
    pub relationship_focus: bool,
    pub execution_focus: bool,
    pub documentation: bool,
    pub gamification: bool,
    pub financial: bool,
}

const URGENCY_WORDS: &[&str] = &["urgent", "asap", "immediately", "now"];
const DEADLINE_WORDS: &[&str] = &["by", "due", "deadline", "tomorrow"];
const EXPLORATORY_WORDS: &[&str] = &["research", "explore", "learn", "discover", "brainstorm"];
const STRATEGIC_WORDS: &[&str] = &["strategy", "plan", "vision", "goal"];
const EMOTIONAL_WORDS: &[&str] = &[
    "sorry",
    "apologize",
    "thank",
    "appreciate",
    "frustrated",
    "stress",
    "overwhelmed",
];
const RELATIONSHIP_WORDS: &[&str] = &["team", "everyone", "together", "collaborate", "partner"];
const EXECUTION_WORDS: &[&str] = &["do", "complete", "finish", "execute"];
const DOCUMENTATION_WORDS: &[&str] = &["document", "note", "record", "track"];
const CREATIVE_WORDS: &[&str] = &["creative", "brainstorm", "idea", "innovate"];
const GAMIFICATION_WORDS: &[&str] = &["points", "level", "reward", "streak"];
const FINANCIAL_WORDS: &[&str] = &["bill", "pay", "money", "budget"];

const ADMIN_CATEGORIES: &[&str] = &["task", "plan", "finance"];
const PEOPLE_CATEGORIES: &[&str] = &["email", "calendar", "meeting", "contact", "transcripts"];

impl SignalMap {
    pub fn extract(intents: &[SubIntent], raw_text: &str) -> Self {
        let text = raw_text.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| text.contains(w));
        let category_in =
            |set: &[&str]| intents.iter().any(|i| set.contains(&i.category.as_str()));

        Self {
            urgency: has(URGENCY_WORDS),
            deadline: has(DEADLINE_WORDS),
            administrative: category_in(ADMIN_CATEGORIES),
            structured: text.contains("block") || text.contains("schedule"),
            exploratory: has(EXPLORATORY_WORDS),
            strategic: has(STRATEGIC_WORDS),
            creative: has(CREATIVE_WORDS),
            involves_people: category_in(PEOPLE_CATEGORIES),
            emotional_tone: has(EMOTIONAL_WORDS),
            relationship_focus: has(RELATIONSHIP_WORDS),
            execution_focus: has(EXECUTION_WORDS),
            documentation: has(DOCUMENTATION_WORDS),
            gamification: has(GAMIFICATION_WORDS),
            financial: has(FINANCIAL_WORDS),
        }
    }
}

/// Deadline pressure from the count of open high-priority tasks.
pub fn assess_deadline_pressure(urgent_open_tasks: usize) -> DeadlinePressure {
    match urgent_open_tasks {
        0 => DeadlinePressure::Low,
        1..=2 => DeadlinePressure::High,
        _ => DeadlinePressure::Critical,
    }
}
