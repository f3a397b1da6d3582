//! REST client for the Replicate-style prediction API.
//!
//! Wraps job creation (`POST /predictions`) and status retrieval
//! (`GET /predictions/{id}`) using [`reqwest`], authenticated with a
//! bearer token.

use std::sync::Arc;

use async_trait::async_trait;

use crate::job::{Job, JobSubmission};

/// Default base URL of the hosted prediction API.
pub const DEFAULT_API_URL: &str = "https://api.replicate.com/v1";

/// Errors from the prediction API layer.
#[derive(Debug, thiserror::Error)]
pub enum JobApiError {
    /// The HTTP request itself failed (network, DNS, TLS, body decode).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service answered with a non-2xx status code.
    #[error("{message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Remote `detail`/`error` text, or a generic message.
        message: String,
    },
}

impl JobApiError {
    /// HTTP status of a rejected call, if the service answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            Self::Status { status, .. } => Some(*status),
        }
    }
}

/// The two calls the bridge needs from the remote job service.
#[async_trait]
pub trait JobApi: Send + Sync {
    /// Create a job. The returned snapshot carries the job id.
    async fn submit(&self, submission: &JobSubmission) -> Result<Job, JobApiError>;

    /// Fetch the current snapshot of a job.
    async fn get(&self, job_id: &str) -> Result<Job, JobApiError>;
}

#[async_trait]
impl<T: JobApi + ?Sized> JobApi for Arc<T> {
    async fn submit(&self, submission: &JobSubmission) -> Result<Job, JobApiError> {
        (**self).submit(submission).await
    }

    async fn get(&self, job_id: &str) -> Result<Job, JobApiError> {
        (**self).get(job_id).await
    }
}

/// HTTP client for the prediction service.
pub struct ReplicateApi {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

impl ReplicateApi {
    /// * `api_url` - Base URL without trailing slash, e.g. [`DEFAULT_API_URL`].
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url, token)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        api_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        let api_url: String = api_url.into();
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    // ---- private helpers ----

    /// Turn a non-2xx response into [`JobApiError::Status`], surfacing the
    /// remote `detail` or `error` field when the body carries one.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, JobApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(JobApiError::Status {
            status: status.as_u16(),
            message: remote_message(&body)
                .unwrap_or_else(|| format!("Replicate API error: {}", status.as_u16())),
        })
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, JobApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl JobApi for ReplicateApi {
    async fn submit(&self, submission: &JobSubmission) -> Result<Job, JobApiError> {
        let response = self
            .client
            .post(format!("{}/predictions", self.api_url))
            .bearer_auth(&self.token)
            .json(submission)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn get(&self, job_id: &str) -> Result<Job, JobApiError> {
        let response = self
            .client
            .get(format!("{}/predictions/{}", self.api_url, job_id))
            .bearer_auth(&self.token)
            .send()
            .await?;

        Self::parse_response(response).await
    }
}

/// Extract a human-readable message from an error body.
fn remote_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["detail", "error", "message"]
        .iter()
        .filter_map(|key| value.get(*key))
        .find_map(|v| v.as_str().map(str::trim).filter(|s| !s.is_empty()))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_wins_over_error() {
        let body = r#"{"detail":"Invalid version","error":"other"}"#;
        assert_eq!(remote_message(body).as_deref(), Some("Invalid version"));
    }

    #[test]
    fn error_field_is_used() {
        assert_eq!(
            remote_message(r#"{"error":"quota exceeded"}"#).as_deref(),
            Some("quota exceeded")
        );
    }

    #[test]
    fn unparseable_body_has_no_message() {
        assert_eq!(remote_message("<html>bad gateway</html>"), None);
        assert_eq!(remote_message(r#"{"detail":""}"#), None);
        assert_eq!(remote_message(""), None);
    }
}
