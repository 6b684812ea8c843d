use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::stage::{Stage, required_jobs};

/// An idea record as stored by the backend.
///
/// The orchestrator only ever holds a transient, possibly stale, in-memory
/// copy of this — the record store owns the durable version. The `status`
/// field is always one of the five lifecycle stages; the type makes a null
/// or out-of-range status unrepresentable.
///
/// The analysis payloads (`deep_dive`, `iterating`, `considering`,
/// `closure`) are opaque to the orchestrator: the jobs populate them and
/// the only question ever asked here is "is it there yet".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Idea {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub hook: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub score: Option<i32>,
    #[serde(default)]
    pub mvp_effort: Option<i32>,
    pub status: Stage,
    /// Set by the store once a deep-dive job has been accepted. Distinguishes
    /// "fired but not yet observed" from "never requested".
    #[serde(default)]
    pub deep_dive_requested: bool,
    #[serde(default)]
    pub deep_dive: Option<serde_json::Value>,
    #[serde(default)]
    pub iterating: Option<serde_json::Value>,
    #[serde(default)]
    pub considering: Option<serde_json::Value>,
    #[serde(default)]
    pub closure: Option<serde_json::Value>,
    #[serde(default)]
    pub closure_reason: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Idea {
    /// Create a fresh idea in the `suggested` stage.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            hook: None,
            value: None,
            score: None,
            mvp_effort: None,
            status: Stage::Suggested,
            deep_dive_requested: false,
            deep_dive: None,
            iterating: None,
            considering: None,
            closure: None,
            closure_reason: None,
            created_at: Some(Utc::now()),
            updated_at: None,
        }
    }

    /// True once the deep-dive job has produced a non-empty result.
    ///
    /// This is the poll predicate that unblocks jobs depending on deep-dive
    /// output.
    pub fn has_deep_dive(&self) -> bool {
        payload_filled(self.deep_dive.as_ref())
    }
}

// A payload counts as filled when it is present and carries actual content:
// null, `{}`, `[]` and `""` all mean "not produced yet".
fn payload_filled(value: Option<&serde_json::Value>) -> bool {
    match value {
        None | Some(serde_json::Value::Null) => false,
        Some(serde_json::Value::Object(map)) => !map.is_empty(),
        Some(serde_json::Value::Array(items)) => !items.is_empty(),
        Some(serde_json::Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// A single requested stage move, immutable for the whole orchestration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub idea_id: String,
    pub from: Stage,
    pub to: Stage,
}

impl TransitionRequest {
    pub fn new(idea_id: impl Into<String>, from: Stage, to: Stage) -> Self {
        Self {
            idea_id: idea_id.into(),
            from,
            to,
        }
    }

    /// The ordered jobs this move requires (empty for backward moves).
    pub fn required_jobs(&self) -> Vec<super::stage::JobKind> {
        required_jobs(self.from, self.to)
    }

    /// Whether this move targets the terminal `closed` stage and therefore
    /// passes through the closure-confirmation gate.
    pub fn is_closure(&self) -> bool {
        self.to == Stage::Closed
    }
}
