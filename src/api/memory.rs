use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use super::client::IdeaStore;
use super::error::ApiError;
use crate::lifecycle::{Idea, JobKind, Stage};

/// In-process idea store with scriptable job behavior.
///
/// Backs the `demo` command and integration-style tests: the deep-dive job
/// "completes" after a configurable number of record fetches, mirroring how
/// the real backend's completion is only observable by re-reading the idea.
/// Other job kinds populate their payload on acceptance, since nothing in
/// the system ever waits on them.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    ideas: HashMap<String, Idea>,
    // Fetches remaining before a fired deep-dive produces its payload.
    deep_dive_countdown: HashMap<String, u32>,
    deep_dive_delay: u32,
    failing: HashSet<JobKind>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make fired deep-dive jobs complete only after `fetches` re-reads.
    pub fn with_deep_dive_delay(self, fetches: u32) -> Self {
        self.inner.lock().unwrap().deep_dive_delay = fetches;
        self
    }

    /// Make every fire of `kind` fail with a request-level error.
    pub fn with_failing_job(self, kind: JobKind) -> Self {
        self.inner.lock().unwrap().failing.insert(kind);
        self
    }

    /// Seed the store with an idea, returning its id.
    pub fn insert(&self, idea: Idea) -> String {
        let id = idea.id.clone();
        self.inner.lock().unwrap().ideas.insert(id.clone(), idea);
        id
    }

    /// Remove an idea, simulating deletion behind the orchestrator's back.
    pub fn remove(&self, id: &str) {
        self.inner.lock().unwrap().ideas.remove(id);
    }
}

fn stub_payload(kind: JobKind) -> serde_json::Value {
    serde_json::json!({ "generated_by": kind.to_string(), "stub": true })
}

impl IdeaStore for InMemoryStore {
    async fn fetch_idea(&self, id: &str) -> Result<Idea, ApiError> {
        let mut inner = self.inner.lock().unwrap();
        let countdown_hit_zero = match inner.deep_dive_countdown.get_mut(id) {
            Some(remaining) if *remaining > 1 => {
                *remaining -= 1;
                false
            }
            Some(_) => true,
            None => false,
        };
        if countdown_hit_zero {
            inner.deep_dive_countdown.remove(id);
            if let Some(idea) = inner.ideas.get_mut(id) {
                idea.deep_dive = Some(stub_payload(JobKind::DeepDive));
            }
        }
        inner
            .ideas
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(id.to_string()))
    }

    async fn fetch_ideas(&self) -> Result<Vec<Idea>, ApiError> {
        Ok(self.inner.lock().unwrap().ideas.values().cloned().collect())
    }

    async fn set_status(&self, id: &str, status: Stage) -> Result<Idea, ApiError> {
        let mut inner = self.inner.lock().unwrap();
        let idea = inner
            .ideas
            .get_mut(id)
            .ok_or_else(|| ApiError::NotFound(id.to_string()))?;
        idea.status = status;
        Ok(idea.clone())
    }

    async fn fire_job(&self, kind: JobKind, id: &str) -> Result<(), ApiError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.failing.contains(&kind) {
            return Err(ApiError::Request {
                status: 500,
                message: format!("{kind} trigger rejected"),
            });
        }
        if !inner.ideas.contains_key(id) {
            return Err(ApiError::NotFound(id.to_string()));
        }
        match kind {
            JobKind::DeepDive => {
                let delay = inner.deep_dive_delay;
                inner.deep_dive_countdown.insert(id.to_string(), delay.max(1));
                if let Some(idea) = inner.ideas.get_mut(id) {
                    idea.deep_dive_requested = true;
                }
            }
            JobKind::Iterating => {
                if let Some(idea) = inner.ideas.get_mut(id) {
                    idea.iterating = Some(stub_payload(kind));
                }
            }
            JobKind::Considering => {
                if let Some(idea) = inner.ideas.get_mut(id) {
                    idea.considering = Some(stub_payload(kind));
                }
            }
            JobKind::Closure => {
                if let Some(idea) = inner.ideas.get_mut(id) {
                    idea.closure = Some(stub_payload(kind));
                }
            }
        }
        Ok(())
    }
}
