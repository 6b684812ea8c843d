//! Bounded-retry completion polling.
//!
//! Background jobs signal completion only through the idea record itself,
//! so the cascade waits by re-fetching the record and testing a predicate.
//! The loop is bounded by `max_attempts` and cancellable at every tick;
//! a cancelled poll schedules no further fetches.

use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::api::IdeaStore;
use crate::lifecycle::Idea;

/// Default re-fetch interval: 2 seconds.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(2000);
/// Default attempt budget: 30 fetches, roughly a one-minute wait.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PollError {
    /// The predicate never held within the attempt budget.
    #[error("gave up after {attempts} fetch attempts")]
    TimedOut { attempts: u32 },

    /// The enclosing workflow was cancelled mid-wait.
    #[error("poll cancelled")]
    Cancelled,
}

/// Re-fetches an idea until a predicate holds, up to `max_attempts` times.
#[derive(Debug, Clone, Copy)]
pub struct Poller {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for Poller {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl Poller {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Fetch the idea every `interval` until `predicate` holds.
    ///
    /// Returns the first record satisfying the predicate, or
    /// [`PollError::TimedOut`] after exactly `max_attempts` fetches. A fetch
    /// error counts as one unsatisfied attempt — a one-minute completion
    /// wait should survive a transient backend hiccup, and the attempt
    /// budget bounds the loop either way.
    pub async fn poll<S: IdeaStore>(
        &self,
        store: &S,
        id: &str,
        predicate: impl Fn(&Idea) -> bool,
        cancel: &CancellationToken,
    ) -> Result<Idea, PollError> {
        for attempt in 1..=self.max_attempts {
            if cancel.is_cancelled() {
                return Err(PollError::Cancelled);
            }

            match store.fetch_idea(id).await {
                Ok(idea) if predicate(&idea) => return Ok(idea),
                Ok(_) | Err(_) => {}
            }

            if attempt < self.max_attempts {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(PollError::Cancelled),
                    _ = sleep(self.interval) => {}
                }
            }
        }

        Err(PollError::TimedOut {
            attempts: self.max_attempts,
        })
    }
}
