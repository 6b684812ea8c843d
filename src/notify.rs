//! User-facing progress notifications emitted by the cascade executor.
//!
//! The sink is fire-and-forget: implementations must return promptly and
//! never block the orchestrator. The terminal implementation lives in
//! [`crate::ui`]; tests plug in recording notifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::lifecycle::JobKind;

/// What happened to a job, from the user's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyKind {
    Started,
    Completed,
    #[serde(rename = "timeout")]
    TimedOut,
    Failed,
}

impl fmt::Display for NotifyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyKind::Started => write!(f, "started"),
            NotifyKind::Completed => write!(f, "completed"),
            NotifyKind::TimedOut => write!(f, "timeout"),
            NotifyKind::Failed => write!(f, "failed"),
        }
    }
}

/// One progress event for one job kind on one idea.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotifyKind,
    pub job: JobKind,
    pub idea_title: String,
}

impl Notification {
    pub fn new(kind: NotifyKind, job: JobKind, idea_title: impl Into<String>) -> Self {
        Self {
            kind,
            job,
            idea_title: idea_title.into(),
        }
    }
}

/// Sink for progress notifications. Synchronous and non-blocking.
pub trait Notifier {
    fn notify(&self, notification: Notification);
}

/// Discards every notification. Used where progress output is unwanted.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _notification: Notification) {}
}
