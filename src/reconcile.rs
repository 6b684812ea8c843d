//! Periodic reconciliation of a local idea view against the record store.
//!
//! Runs independently of per-transition workflows on a fixed period. Reads
//! for ids currently transitioning are superseded by that transition's
//! pending commit or rollback: the reconciler never overwrites an
//! optimistic snapshot.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::api::IdeaStore;
use crate::lifecycle::{Idea, Stage};

/// Default reconciliation period: 10 seconds.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(10);

/// Keeps a local map of ideas in sync with the full record store.
pub struct Reconciler<S> {
    store: S,
    period: Duration,
    in_flight: Arc<Mutex<HashSet<String>>>,
    view: Arc<Mutex<HashMap<String, Idea>>>,
}

impl<S: IdeaStore> Reconciler<S> {
    /// `in_flight` is the orchestrator's handle
    /// ([`crate::orchestrator::TransitionOrchestrator::in_flight_handle`]).
    pub fn new(store: S, period: Duration, in_flight: Arc<Mutex<HashSet<String>>>) -> Self {
        Self {
            store,
            period,
            in_flight,
            view: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Reconcile on every period tick until cancelled. Cancellation takes
    /// effect at the next suspension point; no tick is scheduled after it.
    pub async fn run(&self, cancel: &CancellationToken) {
        loop {
            self.reconcile_once().await;
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(self.period) => {}
            }
        }
    }

    /// One full-store read merged into the view.
    ///
    /// A fetch failure skips the pass — the view simply stays stale until
    /// the next tick. Ids with a transition in flight are left untouched,
    /// both for updates and removals.
    pub async fn reconcile_once(&self) {
        let Ok(ideas) = self.store.fetch_ideas().await else {
            return;
        };

        let in_flight = self.in_flight.lock().unwrap().clone();
        let store_ids: HashSet<&str> = ideas.iter().map(|i| i.id.as_str()).collect();

        let mut view = self.view.lock().unwrap();
        view.retain(|id, _| in_flight.contains(id) || store_ids.contains(id.as_str()));
        for idea in ideas {
            if in_flight.contains(&idea.id) {
                continue;
            }
            view.insert(idea.id.clone(), idea);
        }
    }

    /// The current view, ordered by stage then title for stable display.
    pub fn snapshot(&self) -> Vec<Idea> {
        let mut ideas: Vec<Idea> = self.view.lock().unwrap().values().cloned().collect();
        ideas.sort_by(|a, b| a.status.cmp(&b.status).then_with(|| a.title.cmp(&b.title)));
        ideas
    }

    /// Idea count per stage, in lifecycle order.
    pub fn counts_by_stage(&self) -> Vec<(Stage, usize)> {
        let view = self.view.lock().unwrap();
        Stage::ALL
            .iter()
            .map(|&stage| (stage, view.values().filter(|i| i.status == stage).count()))
            .collect()
    }
}
