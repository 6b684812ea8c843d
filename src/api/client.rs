use std::time::Duration;

use reqwest::Client;

use super::error::ApiError;
use super::types::IdeasOut;
use crate::lifecycle::{Idea, JobKind, Stage};

/// Uniform async interface over the idea record store and the four
/// background analysis job triggers.
///
/// Implementations back the orchestrator, the poller and the reconciler;
/// tests substitute purpose-built mocks.
pub trait IdeaStore {
    /// Read the latest committed record for one idea. No side effects.
    async fn fetch_idea(&self, id: &str) -> Result<Idea, ApiError>;

    /// Read every idea in the store. Used by reconciliation and listings.
    async fn fetch_ideas(&self) -> Result<Vec<Idea>, ApiError>;

    /// Persist a status change, returning the updated record.
    /// A missing idea surfaces as [`ApiError::NotFound`].
    async fn set_status(&self, id: &str, status: Stage) -> Result<Idea, ApiError>;

    /// Trigger a background analysis job for the idea.
    ///
    /// Returns as soon as the job is *accepted*, not completed, and is safe
    /// to call again while a prior invocation is outstanding — deduplication
    /// is the job system's responsibility. Errors here are request-level
    /// only; job-internal failure is observable solely through re-fetching
    /// the record.
    async fn fire_job(&self, kind: JobKind, id: &str) -> Result<(), ApiError>;
}

/// HTTP client for the idea backend REST surface.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

// Endpoint segment per job kind, matching the backend's trigger routes.
fn job_path(kind: JobKind) -> &'static str {
    match kind {
        JobKind::DeepDive => "deep-dive",
        JobKind::Iterating => "iterate",
        JobKind::Considering => "consider",
        JobKind::Closure => "post-mortem",
    }
}

impl ApiClient {
    /// Create a client for the backend at `base_url` (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn ideas_url(&self, suffix: &str) -> String {
        format!("{}/ideas{suffix}", self.base_url)
    }

    async fn expect_success(
        response: reqwest::Response,
        id: &str,
    ) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(id.to_string()));
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ApiError::Request {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

impl IdeaStore for ApiClient {
    async fn fetch_idea(&self, id: &str) -> Result<Idea, ApiError> {
        let response = self.client.get(self.ideas_url(&format!("/{id}"))).send().await?;
        let response = Self::expect_success(response, id).await?;
        let idea = response
            .json::<Idea>()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        Ok(idea)
    }

    async fn fetch_ideas(&self) -> Result<Vec<Idea>, ApiError> {
        let response = self.client.get(self.ideas_url("/all")).send().await?;
        let response = Self::expect_success(response, "*").await?;
        let out = response
            .json::<IdeasOut>()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        Ok(out.ideas)
    }

    async fn set_status(&self, id: &str, status: Stage) -> Result<Idea, ApiError> {
        // The backend takes the bare stage name as the JSON body.
        let response = self
            .client
            .post(self.ideas_url(&format!("/{id}/status")))
            .json(&status)
            .send()
            .await?;
        let response = Self::expect_success(response, id).await?;
        let idea = response
            .json::<Idea>()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        Ok(idea)
    }

    async fn fire_job(&self, kind: JobKind, id: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.ideas_url(&format!("/{id}/{}", job_path(kind))))
            .send()
            .await?;
        // Acceptance is all that matters; the response body is not useful
        // for completion detection.
        Self::expect_success(response, id).await?;
        Ok(())
    }
}
