//! Ordered execution of the background jobs backing one stage transition.
//!
//! Jobs run strictly sequentially in table order: later jobs may depend on
//! artifacts produced by earlier ones, so no two job kinds for the same
//! transition ever run concurrently. The first failure stops the cascade —
//! remaining jobs are not attempted and the outcome reports exactly how far
//! execution got.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::api::{ApiError, IdeaStore};
use crate::lifecycle::{Idea, JobKind, Stage, TransitionRequest};
use crate::notify::{Notification, Notifier, NotifyKind};
use crate::poller::{PollError, Poller};

/// Result of one cascade run, partitioned into what finished and what broke.
///
/// `failed_job == None` iff the transition fully succeeded. `final_status`
/// is the destination stage on success and the origin stage otherwise (the
/// orchestrator rolls the optimistic change back to it).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeOutcome {
    pub completed_jobs: Vec<JobKind>,
    pub failed_job: Option<JobKind>,
    pub final_status: Stage,
}

impl CascadeOutcome {
    pub fn success(completed_jobs: Vec<JobKind>, to: Stage) -> Self {
        Self {
            completed_jobs,
            failed_job: None,
            final_status: to,
        }
    }

    pub fn failure(completed_jobs: Vec<JobKind>, failed: JobKind, from: Stage) -> Self {
        Self {
            completed_jobs,
            failed_job: Some(failed),
            final_status: from,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed_job.is_none()
    }
}

// Why one job stopped the cascade. Fire errors and poll timeouts are
// recovered here into the outcome, never propagated past the executor.
enum JobFailure {
    Fire(ApiError),
    TimedOut,
    Cancelled,
}

impl From<ApiError> for JobFailure {
    fn from(err: ApiError) -> Self {
        JobFailure::Fire(err)
    }
}

impl From<PollError> for JobFailure {
    fn from(err: PollError) -> Self {
        match err {
            PollError::TimedOut { .. } => JobFailure::TimedOut,
            PollError::Cancelled => JobFailure::Cancelled,
        }
    }
}

/// Runs the ordered job list for one transition against the record store.
pub struct CascadeExecutor<'a, S, N> {
    store: &'a S,
    notifier: &'a N,
    poller: Poller,
}

impl<'a, S: IdeaStore, N: Notifier> CascadeExecutor<'a, S, N> {
    pub fn new(store: &'a S, notifier: &'a N, poller: Poller) -> Self {
        Self {
            store,
            notifier,
            poller,
        }
    }

    /// Execute `jobs` in order for `idea`, stopping on the first failure.
    ///
    /// Emits one `started` and one terminal notification per job attempted.
    /// Cancellation between jobs aborts before the next job starts; the
    /// aborted job is reported as the failure with no notifications of its
    /// own.
    pub async fn run(
        &self,
        idea: &Idea,
        request: &TransitionRequest,
        jobs: &[JobKind],
        cancel: &CancellationToken,
    ) -> CascadeOutcome {
        let mut completed: Vec<JobKind> = Vec::new();

        for &job in jobs {
            if cancel.is_cancelled() {
                return CascadeOutcome::failure(completed, job, request.from);
            }

            self.notify(NotifyKind::Started, job, idea);

            match self.execute_job(idea, job, cancel).await {
                Ok(()) => {
                    self.notify(NotifyKind::Completed, job, idea);
                    completed.push(job);
                }
                Err(JobFailure::TimedOut) => {
                    self.notify(NotifyKind::TimedOut, job, idea);
                    return CascadeOutcome::failure(completed, job, request.from);
                }
                Err(JobFailure::Fire(_) | JobFailure::Cancelled) => {
                    self.notify(NotifyKind::Failed, job, idea);
                    return CascadeOutcome::failure(completed, job, request.from);
                }
            }
        }

        CascadeOutcome::success(completed, request.to)
    }

    // Deep-dive output is a hard prerequisite the user must see before the
    // dependent jobs make sense, so it is fired and then awaited through the
    // poller. Every other kind is fire-and-forget: the cascade proceeds as
    // soon as the trigger is accepted, without waiting for the payload.
    async fn execute_job(
        &self,
        idea: &Idea,
        job: JobKind,
        cancel: &CancellationToken,
    ) -> Result<(), JobFailure> {
        match job {
            JobKind::DeepDive => {
                // An already-requested deep dive is still in flight on the
                // backend; go straight to waiting for its payload.
                if !idea.deep_dive_requested {
                    self.store.fire_job(JobKind::DeepDive, &idea.id).await?;
                }
                self.poller
                    .poll(self.store, &idea.id, Idea::has_deep_dive, cancel)
                    .await?;
                Ok(())
            }
            other => {
                self.store.fire_job(other, &idea.id).await?;
                Ok(())
            }
        }
    }

    fn notify(&self, kind: NotifyKind, job: JobKind, idea: &Idea) {
        self.notifier
            .notify(Notification::new(kind, job, idea.title.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::api::InMemoryStore;

    #[derive(Default)]
    struct RecordingNotifier {
        events: Mutex<Vec<Notification>>,
    }

    impl RecordingNotifier {
        fn events(&self) -> Vec<Notification> {
            self.events.lock().unwrap().clone()
        }

        fn kinds(&self) -> Vec<(NotifyKind, JobKind)> {
            self.events()
                .into_iter()
                .map(|n| (n.kind, n.job))
                .collect()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, notification: Notification) {
            self.events.lock().unwrap().push(notification);
        }
    }

    fn fast_poller() -> Poller {
        Poller::new(Duration::from_millis(1), 30)
    }

    fn request(store: &InMemoryStore, from: Stage, to: Stage) -> (Idea, TransitionRequest) {
        let idea = Idea::new("Repo health dashboard");
        let id = store.insert(idea.clone());
        (idea, TransitionRequest::new(id, from, to))
    }

    #[tokio::test]
    async fn deep_dive_then_iterating_completes() {
        let store = InMemoryStore::new().with_deep_dive_delay(3);
        let notifier = RecordingNotifier::default();
        let (idea, req) = request(&store, Stage::Suggested, Stage::Iterating);
        let jobs = req.required_jobs();

        let executor = CascadeExecutor::new(&store, &notifier, fast_poller());
        let outcome = executor
            .run(&idea, &req, &jobs, &CancellationToken::new())
            .await;

        assert!(outcome.is_success());
        assert_eq!(
            outcome.completed_jobs,
            vec![JobKind::DeepDive, JobKind::Iterating]
        );
        assert_eq!(outcome.final_status, Stage::Iterating);
        assert_eq!(
            notifier.kinds(),
            vec![
                (NotifyKind::Started, JobKind::DeepDive),
                (NotifyKind::Completed, JobKind::DeepDive),
                (NotifyKind::Started, JobKind::Iterating),
                (NotifyKind::Completed, JobKind::Iterating),
            ]
        );
    }

    #[tokio::test]
    async fn deep_dive_timeout_stops_the_cascade() {
        // Never completes within the poller's 30-attempt budget.
        let store = InMemoryStore::new().with_deep_dive_delay(100);
        let notifier = RecordingNotifier::default();
        let (idea, req) = request(&store, Stage::Suggested, Stage::Iterating);
        let jobs = req.required_jobs();

        let executor = CascadeExecutor::new(&store, &notifier, fast_poller());
        let outcome = executor
            .run(&idea, &req, &jobs, &CancellationToken::new())
            .await;

        assert!(outcome.completed_jobs.is_empty());
        assert_eq!(outcome.failed_job, Some(JobKind::DeepDive));
        assert_eq!(outcome.final_status, Stage::Suggested);
        assert_eq!(
            notifier.kinds(),
            vec![
                (NotifyKind::Started, JobKind::DeepDive),
                (NotifyKind::TimedOut, JobKind::DeepDive),
            ]
        );
    }

    #[tokio::test]
    async fn fire_error_aborts_remaining_jobs() {
        let store = InMemoryStore::new()
            .with_deep_dive_delay(1)
            .with_failing_job(JobKind::Iterating);
        let notifier = RecordingNotifier::default();
        let (idea, req) = request(&store, Stage::Suggested, Stage::Considering);
        let jobs = req.required_jobs();
        assert_eq!(jobs.len(), 3);

        let executor = CascadeExecutor::new(&store, &notifier, fast_poller());
        let outcome = executor
            .run(&idea, &req, &jobs, &CancellationToken::new())
            .await;

        assert_eq!(outcome.completed_jobs, vec![JobKind::DeepDive]);
        assert_eq!(outcome.failed_job, Some(JobKind::Iterating));
        // The considering job was never attempted.
        assert!(
            !notifier
                .kinds()
                .iter()
                .any(|(_, job)| *job == JobKind::Considering)
        );
    }

    #[tokio::test]
    async fn already_requested_deep_dive_is_not_refired() {
        // A re-fire would fail; the cascade must go straight to polling.
        let store = InMemoryStore::new().with_failing_job(JobKind::DeepDive);
        let notifier = RecordingNotifier::default();
        let mut idea = Idea::new("Repo health dashboard");
        idea.deep_dive_requested = true;
        idea.deep_dive = Some(serde_json::json!({"overall_score": 9}));
        let id = store.insert(idea.clone());
        let req = TransitionRequest::new(id, Stage::Suggested, Stage::DeepDive);

        let executor = CascadeExecutor::new(&store, &notifier, fast_poller());
        let outcome = executor
            .run(&idea, &req, &req.required_jobs(), &CancellationToken::new())
            .await;

        assert!(outcome.is_success());
        assert_eq!(outcome.completed_jobs, vec![JobKind::DeepDive]);
    }

    #[tokio::test]
    async fn pre_cancelled_cascade_attempts_nothing() {
        let store = InMemoryStore::new();
        let notifier = RecordingNotifier::default();
        let (idea, req) = request(&store, Stage::Suggested, Stage::Iterating);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let executor = CascadeExecutor::new(&store, &notifier, fast_poller());
        let outcome = executor.run(&idea, &req, &req.required_jobs(), &cancel).await;

        assert_eq!(outcome.failed_job, Some(JobKind::DeepDive));
        assert_eq!(outcome.final_status, Stage::Suggested);
        assert!(notifier.events().is_empty());
    }

    #[tokio::test]
    async fn empty_job_list_succeeds_immediately() {
        let store = InMemoryStore::new();
        let notifier = RecordingNotifier::default();
        let (idea, req) = request(&store, Stage::Considering, Stage::Suggested);

        let executor = CascadeExecutor::new(&store, &notifier, fast_poller());
        let outcome = executor
            .run(&idea, &req, &req.required_jobs(), &CancellationToken::new())
            .await;

        assert!(outcome.is_success());
        assert!(outcome.completed_jobs.is_empty());
        assert_eq!(outcome.final_status, Stage::Suggested);
        assert!(notifier.events().is_empty());
    }
}
