//! Entry point for a single requested stage transition.
//!
//! Ties the transition table, the optimistic state manager and the cascade
//! executor together: `Idle → Transitioning → {Committed, RolledBack}`.
//! Transitions are single-flight per idea id: a second request for an id
//! already transitioning is rejected outright, never queued. Transitions
//! for different ids run fully concurrently.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::api::{ApiError, IdeaStore};
use crate::cascade::{CascadeExecutor, CascadeOutcome};
use crate::error::FunilError;
use crate::lifecycle::{Idea, TransitionRequest};
use crate::notify::Notifier;
use crate::optimistic::StatusSnapshot;
use crate::poller::Poller;

/// Where a transition is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionState {
    Idle,
    Transitioning,
    Committed,
    RolledBack,
}

impl fmt::Display for TransitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionState::Idle => write!(f, "IDLE"),
            TransitionState::Transitioning => write!(f, "TRANSITIONING"),
            TransitionState::Committed => write!(f, "COMMITTED"),
            TransitionState::RolledBack => write!(f, "ROLLED_BACK"),
        }
    }
}

/// Structured result of one transition attempt.
///
/// `message` is the user-facing summary: it names the failed job and how
/// many jobs completed, never a raw internal error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionReport {
    pub request: TransitionRequest,
    pub state: TransitionState,
    pub outcome: CascadeOutcome,
    pub closure_reason: Option<String>,
    pub message: String,
}

// Removes the idea id from the in-flight set on every exit path, including
// cancellation unwinds.
struct InFlightGuard {
    ids: Arc<Mutex<HashSet<String>>>,
    id: String,
}

impl InFlightGuard {
    fn acquire(ids: &Arc<Mutex<HashSet<String>>>, id: &str) -> Option<Self> {
        if !ids.lock().unwrap().insert(id.to_string()) {
            return None;
        }
        Some(Self {
            ids: ids.clone(),
            id: id.to_string(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.ids.lock().unwrap().remove(&self.id);
    }
}

/// Drives stage transitions end to end.
#[derive(Debug, Clone)]
pub struct TransitionOrchestrator<S, N> {
    store: S,
    notifier: N,
    poller: Poller,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl<S: IdeaStore, N: Notifier> TransitionOrchestrator<S, N> {
    pub fn new(store: S, notifier: N, poller: Poller) -> Self {
        Self {
            store,
            notifier,
            poller,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// The set of idea ids currently transitioning. Shared with the
    /// reconciler so periodic reads never fight an optimistic snapshot.
    pub fn in_flight_handle(&self) -> Arc<Mutex<HashSet<String>>> {
        self.in_flight.clone()
    }

    /// Run one requested transition to a committed or rolled-back end state.
    ///
    /// A request targeting `closed` must arrive with a collected closure
    /// reason; declining the confirmation aborts before any state is
    /// touched. Cancellation of `cancel` mid-cascade ends in the same
    /// rolled-back state as a job failure.
    pub async fn transition(
        &self,
        request: TransitionRequest,
        closure_reason: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<TransitionReport, FunilError> {
        if request.is_closure() && closure_reason.is_none() {
            return Err(FunilError::ClosureDeclined(request.idea_id.clone()));
        }

        let _guard = InFlightGuard::acquire(&self.in_flight, &request.idea_id)
            .ok_or_else(|| FunilError::ConcurrentTransition(request.idea_id.clone()))?;

        // Transitioning from here on. The local copy is transient and
        // possibly stale; the snapshot captures whatever status it truly had.
        let mut idea = match self.store.fetch_idea(&request.idea_id).await {
            Ok(idea) => idea,
            Err(ApiError::NotFound(id)) => return Err(FunilError::IdeaVanished(id)),
            Err(e) => return Err(e.into()),
        };

        let snapshot = StatusSnapshot::apply(&mut idea, request.to);
        debug_assert_eq!(snapshot.idea_id(), request.idea_id);
        match self.store.set_status(&request.idea_id, request.to).await {
            Ok(_) => {}
            Err(ApiError::NotFound(id)) => {
                // The record is gone; there is nothing valid to roll back to.
                snapshot.commit();
                return Err(FunilError::IdeaVanished(id));
            }
            Err(e) => {
                snapshot.rollback(&mut idea);
                return Err(e.into());
            }
        }

        let jobs = request.required_jobs();
        let executor = CascadeExecutor::new(&self.store, &self.notifier, self.poller);
        let outcome = executor.run(&idea, &request, &jobs, cancel).await;

        if outcome.is_success() {
            // Final re-fetch so the caller sees the job-populated fields.
            match self.store.fetch_idea(&request.idea_id).await {
                Ok(fresh) => idea = fresh,
                Err(ApiError::NotFound(id)) => {
                    snapshot.commit();
                    return Err(FunilError::IdeaVanished(id));
                }
                // A failed refresh is not worth failing a finished
                // transition over; the local copy stands in.
                Err(_) => {}
            }
            snapshot.commit();
            let message = describe(&idea, &request, &outcome);
            return Ok(TransitionReport {
                request,
                state: TransitionState::Committed,
                outcome,
                closure_reason,
                message,
            });
        }

        let prior = snapshot.rollback(&mut idea);
        match self.store.set_status(&request.idea_id, prior).await {
            Ok(_) => {}
            Err(ApiError::NotFound(id)) => return Err(FunilError::IdeaVanished(id)),
            // Best-effort restore; reconciliation surfaces any divergence.
            Err(_) => {}
        }

        let message = describe(&idea, &request, &outcome);
        Ok(TransitionReport {
            request,
            state: TransitionState::RolledBack,
            outcome,
            closure_reason,
            message,
        })
    }
}

fn describe(idea: &Idea, request: &TransitionRequest, outcome: &CascadeOutcome) -> String {
    let total = request.required_jobs().len();
    match outcome.failed_job {
        None => format!(
            "\"{}\" moved from {} to {} ({} backing job{} completed)",
            idea.title,
            request.from,
            request.to,
            outcome.completed_jobs.len(),
            if outcome.completed_jobs.len() == 1 { "" } else { "s" },
        ),
        Some(failed) => format!(
            "\"{}\" stayed in {}: {} did not finish ({} of {} backing jobs completed)",
            idea.title,
            outcome.final_status,
            failed,
            outcome.completed_jobs.len(),
            total,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use crate::api::{ApiError, InMemoryStore};
    use crate::lifecycle::{JobKind, Stage};
    use crate::notify::NullNotifier;

    fn fast_orchestrator(
        store: InMemoryStore,
    ) -> TransitionOrchestrator<InMemoryStore, NullNotifier> {
        TransitionOrchestrator::new(
            store,
            NullNotifier,
            Poller::new(Duration::from_millis(1), 30),
        )
    }

    #[tokio::test]
    async fn commits_when_the_cascade_succeeds() {
        let store = InMemoryStore::new().with_deep_dive_delay(3);
        let id = store.insert(Idea::new("Repo health dashboard"));
        let orch = fast_orchestrator(store.clone());

        let report = orch
            .transition(
                TransitionRequest::new(&id, Stage::Suggested, Stage::Iterating),
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(report.state, TransitionState::Committed);
        assert_eq!(
            report.outcome.completed_jobs,
            vec![JobKind::DeepDive, JobKind::Iterating]
        );
        assert_eq!(report.outcome.failed_job, None);
        assert_eq!(report.outcome.final_status, Stage::Iterating);

        let stored = store.fetch_idea(&id).await.unwrap();
        assert_eq!(stored.status, Stage::Iterating);
    }

    #[tokio::test]
    async fn rolls_back_when_the_deep_dive_times_out() {
        let store = InMemoryStore::new().with_deep_dive_delay(100);
        let id = store.insert(Idea::new("Repo health dashboard"));
        let orch = fast_orchestrator(store.clone());

        let report = orch
            .transition(
                TransitionRequest::new(&id, Stage::Suggested, Stage::Iterating),
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(report.state, TransitionState::RolledBack);
        assert!(report.outcome.completed_jobs.is_empty());
        assert_eq!(report.outcome.failed_job, Some(JobKind::DeepDive));
        assert_eq!(report.outcome.final_status, Stage::Suggested);
        assert!(report.message.contains("deep_dive"));
        assert!(report.message.contains("0 of 2"));

        let stored = store.fetch_idea(&id).await.unwrap();
        assert_eq!(stored.status, Stage::Suggested);
    }

    #[tokio::test]
    async fn rejects_a_second_transition_for_the_same_idea() {
        let store = InMemoryStore::new();
        let id = store.insert(Idea::new("Repo health dashboard"));
        let orch = fast_orchestrator(store);

        // Simulate an in-flight transition for this id.
        orch.in_flight_handle().lock().unwrap().insert(id.clone());

        let err = orch
            .transition(
                TransitionRequest::new(&id, Stage::Suggested, Stage::DeepDive),
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, FunilError::ConcurrentTransition(ref e) if *e == id));
    }

    #[tokio::test]
    async fn concurrent_requests_race_one_winner() {
        let store = InMemoryStore::new().with_deep_dive_delay(5);
        let id = store.insert(Idea::new("Repo health dashboard"));
        let orch = TransitionOrchestrator::new(
            store,
            NullNotifier,
            Poller::new(Duration::from_millis(20), 30),
        );

        let first = {
            let orch = orch.clone();
            let id = id.clone();
            tokio::spawn(async move {
                orch.transition(
                    TransitionRequest::new(&id, Stage::Suggested, Stage::DeepDive),
                    None,
                    &CancellationToken::new(),
                )
                .await
            })
        };

        // Give the first request time to enter the poll loop.
        tokio::time::sleep(Duration::from_millis(30)).await;

        let second = orch
            .transition(
                TransitionRequest::new(&id, Stage::Suggested, Stage::DeepDive),
                None,
                &CancellationToken::new(),
            )
            .await;
        assert!(matches!(second, Err(FunilError::ConcurrentTransition(_))));

        let report = first.await.unwrap().unwrap();
        assert_eq!(report.state, TransitionState::Committed);
    }

    #[tokio::test]
    async fn different_ideas_transition_concurrently() {
        let store = InMemoryStore::new().with_deep_dive_delay(3);
        let first_id = store.insert(Idea::new("First idea"));
        let second_id = store.insert(Idea::new("Second idea"));
        let orch = fast_orchestrator(store);

        let first_token = CancellationToken::new();
        let second_token = CancellationToken::new();
        let (first, second) = tokio::join!(
            orch.transition(
                TransitionRequest::new(&first_id, Stage::Suggested, Stage::DeepDive),
                None,
                &first_token,
            ),
            orch.transition(
                TransitionRequest::new(&second_id, Stage::Suggested, Stage::DeepDive),
                None,
                &second_token,
            ),
        );

        assert_eq!(first.unwrap().state, TransitionState::Committed);
        assert_eq!(second.unwrap().state, TransitionState::Committed);
    }

    #[tokio::test]
    async fn the_in_flight_entry_is_released_after_completion() {
        let store = InMemoryStore::new();
        let id = store.insert(Idea::new("Repo health dashboard"));
        let orch = fast_orchestrator(store);

        for to in [Stage::DeepDive, Stage::Iterating] {
            let from = if to == Stage::DeepDive {
                Stage::Suggested
            } else {
                Stage::DeepDive
            };
            let report = orch
                .transition(
                    TransitionRequest::new(&id, from, to),
                    None,
                    &CancellationToken::new(),
                )
                .await
                .unwrap();
            assert_eq!(report.state, TransitionState::Committed);
        }
        assert!(orch.in_flight_handle().lock().unwrap().is_empty());
    }

    /// Store whose `set_status` always reports the idea as gone, counting
    /// how often it was asked.
    #[derive(Clone)]
    struct VanishingStore {
        set_status_calls: Arc<AtomicU32>,
    }

    impl IdeaStore for VanishingStore {
        async fn fetch_idea(&self, id: &str) -> Result<Idea, ApiError> {
            let mut idea = Idea::new("Ghost idea");
            idea.id = id.to_string();
            Ok(idea)
        }

        async fn fetch_ideas(&self) -> Result<Vec<Idea>, ApiError> {
            Ok(Vec::new())
        }

        async fn set_status(&self, id: &str, _status: Stage) -> Result<Idea, ApiError> {
            self.set_status_calls.fetch_add(1, Ordering::SeqCst);
            Err(ApiError::NotFound(id.to_string()))
        }

        async fn fire_job(&self, _kind: JobKind, _id: &str) -> Result<(), ApiError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn vanished_idea_is_fatal_with_no_rollback() {
        let store = VanishingStore {
            set_status_calls: Arc::new(AtomicU32::new(0)),
        };
        let orch = TransitionOrchestrator::new(
            store.clone(),
            NullNotifier,
            Poller::new(Duration::from_millis(1), 30),
        );

        let err = orch
            .transition(
                TransitionRequest::new("ghost", Stage::Suggested, Stage::DeepDive),
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, FunilError::IdeaVanished(ref id) if id == "ghost"));
        // Exactly one set_status call was made: the optimistic persist.
        // No rollback write follows a vanish.
        assert_eq!(store.set_status_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn closing_without_a_reason_is_declined_before_any_mutation() {
        let store = InMemoryStore::new();
        let id = store.insert(Idea::new("Repo health dashboard"));
        let orch = fast_orchestrator(store.clone());

        let err = orch
            .transition(
                TransitionRequest::new(&id, Stage::Considering, Stage::Closed),
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, FunilError::ClosureDeclined(_)));
        assert_eq!(
            store.fetch_idea(&id).await.unwrap().status,
            Stage::Suggested
        );
        assert!(orch.in_flight_handle().lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn closing_with_a_reason_commits() {
        let store = InMemoryStore::new();
        let id = store.insert(Idea::new("Repo health dashboard"));
        let orch = fast_orchestrator(store.clone());

        let report = orch
            .transition(
                TransitionRequest::new(&id, Stage::Considering, Stage::Closed),
                Some("no viable market".into()),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(report.state, TransitionState::Committed);
        assert_eq!(report.outcome.completed_jobs, vec![JobKind::Closure]);
        assert_eq!(report.closure_reason.as_deref(), Some("no viable market"));
        assert_eq!(store.fetch_idea(&id).await.unwrap().status, Stage::Closed);
    }

    #[tokio::test]
    async fn backward_move_needs_no_cascade() {
        let store = InMemoryStore::new();
        let mut idea = Idea::new("Repo health dashboard");
        idea.status = Stage::Considering;
        let id = store.insert(idea);
        let orch = fast_orchestrator(store.clone());

        let report = orch
            .transition(
                TransitionRequest::new(&id, Stage::Considering, Stage::Suggested),
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(report.state, TransitionState::Committed);
        assert!(report.outcome.completed_jobs.is_empty());
        assert_eq!(
            store.fetch_idea(&id).await.unwrap().status,
            Stage::Suggested
        );
    }

    #[tokio::test]
    async fn cancellation_ends_rolled_back() {
        let store = InMemoryStore::new();
        let id = store.insert(Idea::new("Repo health dashboard"));
        let orch = fast_orchestrator(store.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = orch
            .transition(
                TransitionRequest::new(&id, Stage::Suggested, Stage::DeepDive),
                None,
                &cancel,
            )
            .await
            .unwrap();

        assert_eq!(report.state, TransitionState::RolledBack);
        assert_eq!(report.outcome.failed_job, Some(JobKind::DeepDive));
        assert_eq!(
            store.fetch_idea(&id).await.unwrap().status,
            Stage::Suggested
        );
    }

    #[test]
    fn transition_state_display() {
        assert_eq!(TransitionState::Idle.to_string(), "IDLE");
        assert_eq!(TransitionState::Transitioning.to_string(), "TRANSITIONING");
        assert_eq!(TransitionState::Committed.to_string(), "COMMITTED");
        assert_eq!(TransitionState::RolledBack.to_string(), "ROLLED_BACK");
    }
}
