//! Optimistic status changes with exact, snapshot-based rollback.
//!
//! A transition tentatively moves the local idea copy to its destination
//! stage before the backing jobs have confirmed it. [`StatusSnapshot`]
//! captures the literal prior value at apply time, so a rollback restores
//! exactly what was there (never a recomputation) no matter which other
//! fields changed while the cascade ran.

use crate::lifecycle::{Idea, Stage};

/// Undo token for one applied status change.
///
/// For any `apply` followed by either `commit` or `rollback`, the idea's
/// status afterward is either the new value or byte-identical to the value
/// immediately before `apply`, never a mixed state. The `#[must_use]` makes
/// dropping an undecided snapshot a compiler warning.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "an applied optimistic change must be committed or rolled back"]
pub struct StatusSnapshot {
    idea_id: String,
    prior: Stage,
}

impl StatusSnapshot {
    /// Tentatively set `idea.status = to`, capturing the prior value.
    pub fn apply(idea: &mut Idea, to: Stage) -> StatusSnapshot {
        let snapshot = StatusSnapshot {
            idea_id: idea.id.clone(),
            prior: idea.status,
        };
        idea.status = to;
        snapshot
    }

    /// Restore the captured prior status, consuming the token.
    pub fn rollback(self, idea: &mut Idea) -> Stage {
        idea.status = self.prior;
        self.prior
    }

    /// Discard the captured value, making the applied change permanent.
    pub fn commit(self) {}

    /// The status the idea had immediately before `apply`.
    pub fn prior(&self) -> Stage {
        self.prior
    }

    pub fn idea_id(&self) -> &str {
        &self.idea_id
    }
}
