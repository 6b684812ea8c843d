use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The five ordered stages of the idea lifecycle.
///
/// An idea flows forward: suggested → deep_dive → iterating → considering → closed.
/// The derived `Ord` follows declaration order and is what "forward" means
/// throughout the crate: stages ahead of an idea's current status are locked
/// until their backing jobs have run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Suggested,
    DeepDive,
    Iterating,
    Considering,
    Closed,
}

/// The four background analysis jobs that back-fill stage data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    DeepDive,
    Iterating,
    Considering,
    Closure,
}

impl Stage {
    /// All stages in lifecycle order.
    pub const ALL: [Stage; 5] = [
        Stage::Suggested,
        Stage::DeepDive,
        Stage::Iterating,
        Stage::Considering,
        Stage::Closed,
    ];

    /// The analysis job whose output this stage depends on.
    ///
    /// `Suggested` is the entry stage and needs no backing job.
    pub fn backing_job(self) -> Option<JobKind> {
        match self {
            Stage::Suggested => None,
            Stage::DeepDive => Some(JobKind::DeepDive),
            Stage::Iterating => Some(JobKind::Iterating),
            Stage::Considering => Some(JobKind::Considering),
            Stage::Closed => Some(JobKind::Closure),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Suggested => write!(f, "suggested"),
            Stage::DeepDive => write!(f, "deep_dive"),
            Stage::Iterating => write!(f, "iterating"),
            Stage::Considering => write!(f, "considering"),
            Stage::Closed => write!(f, "closed"),
        }
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "suggested" => Ok(Stage::Suggested),
            "deep_dive" => Ok(Stage::DeepDive),
            "iterating" => Ok(Stage::Iterating),
            "considering" => Ok(Stage::Considering),
            "closed" => Ok(Stage::Closed),
            other => Err(format!("unknown stage: {other}")),
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::DeepDive => write!(f, "deep_dive"),
            JobKind::Iterating => write!(f, "iterating"),
            JobKind::Considering => write!(f, "considering"),
            JobKind::Closure => write!(f, "closure"),
        }
    }
}

/// The ordered list of jobs required to move an idea from `from` to `to`.
///
/// Each stage's data depends on the stage before it, so skipping forward
/// must back-fill every intermediate job exactly once, in dependency order.
/// Any pair that is not strictly forward yields an empty list: backward
/// moves and no-ops need no backing work.
pub fn required_jobs(from: Stage, to: Stage) -> Vec<JobKind> {
    if to <= from {
        return Vec::new();
    }
    Stage::ALL
        .iter()
        .copied()
        .filter(|stage| *stage > from && *stage <= to)
        .filter_map(Stage::backing_job)
        .collect()
}
