//! Job-submission-and-poll bridge.
//!
//! Converts the remote service's asynchronous job protocol into one
//! awaitable call: submit once, poll on a schedule until the job reaches a
//! terminal state or the attempt budget runs out, then map the final
//! snapshot to a [`GenerationResult`] or a [`GenerationError`].
//!
//! The bridge never retries a failed job and never cancels a remote job.
//! Cancelling the [`CancellationToken`] only releases the local wait.

use std::time::{Duration, Instant};

use muse_core::error::CoreError;
use muse_core::image_request::GenerationRequest;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::job::{Job, JobStatus, JobSubmission};
use crate::replicate::{JobApi, JobApiError};

/// Default model version sent with each submission.
pub const DEFAULT_MODEL_VERSION: &str = "google/imagen-4";

/// Default model name reported in result metadata.
pub const DEFAULT_MODEL_NAME: &str = "imagen-4";

/// Default display label used in assistant replies.
pub const DEFAULT_MODEL_LABEL: &str = "Imagen-4";

// ---------------------------------------------------------------------------
// Poll schedule
// ---------------------------------------------------------------------------

/// Polling schedule of the bridge.
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    /// Delay before the first poll.
    pub interval: Duration,
    /// Maximum number of status checks per job.
    pub max_attempts: u32,
    /// Factor applied to the delay after each poll. `1.0` keeps it fixed.
    pub backoff_multiplier: f64,
    /// Upper bound on the delay between polls.
    pub max_interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 60,
            backoff_multiplier: 1.0,
            max_interval: Duration::from_secs(30),
        }
    }
}

/// Calculate the delay before the next poll.
///
/// The result never drops below the current delay and is clamped to
/// [`PollConfig::max_interval`] once backoff is enabled.
pub fn next_interval(current: Duration, config: &PollConfig) -> Duration {
    if config.backoff_multiplier <= 1.0 {
        return current;
    }
    let next_ms = (current.as_millis() as f64 * config.backoff_multiplier) as u64;
    Duration::from_millis(next_ms)
        .max(current)
        .min(config.max_interval.max(current))
}

/// Model selection for submissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    /// Version identifier sent to the service.
    pub version: String,
    /// Name echoed back as `model_used`.
    pub name: String,
    /// Human-readable label for replies.
    pub label: String,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            version: DEFAULT_MODEL_VERSION.to_string(),
            name: DEFAULT_MODEL_NAME.to_string(),
            label: DEFAULT_MODEL_LABEL.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Results and errors
// ---------------------------------------------------------------------------

/// Echo of the request parameters plus the model that served them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageMetadata {
    pub prompt: String,
    pub aspect_ratio: String,
    pub safety_filter_level: String,
    pub output_format: String,
    pub model_used: String,
}

impl ImageMetadata {
    pub fn from_request(request: &GenerationRequest, model_used: &str) -> Self {
        Self {
            prompt: request.prompt.clone(),
            aspect_ratio: request.aspect_ratio.to_string(),
            safety_filter_level: request.safety_filter_level.to_string(),
            output_format: request.output_format.to_string(),
            model_used: model_used.to_string(),
        }
    }
}

/// Successful outcome of one generation.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub image_url: String,
    pub prediction_id: String,
    /// Number of status checks made after submission.
    pub attempts: u32,
    /// Wall time from submission to terminal state.
    pub elapsed: Duration,
    pub metadata: ImageMetadata,
}

impl GenerationResult {
    pub fn generation_time_ms(&self) -> i64 {
        i64::try_from(self.elapsed.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Stable machine-readable name of a [`GenerationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationErrorKind {
    Configuration,
    Validation,
    Submission,
    PollTransport,
    RemoteFailure,
    Canceled,
    MissingOutput,
    Timeout,
    Abandoned,
}

impl GenerationErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Validation => "validation",
            Self::Submission => "submission",
            Self::PollTransport => "poll_transport",
            Self::RemoteFailure => "remote_failure",
            Self::Canceled => "canceled",
            Self::MissingOutput => "missing_output",
            Self::Timeout => "timeout",
            Self::Abandoned => "abandoned",
        }
    }
}

/// Why a generation did not produce an image. Every variant is terminal
/// for the current request.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// A required credential is missing.
    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    Validation(String),

    /// The service rejected the job creation.
    #[error("{message}")]
    Submission { status: Option<u16>, message: String },

    /// A status check failed; polling stopped.
    #[error("Failed to check prediction status: {detail}")]
    PollTransport {
        prediction_id: String,
        status: Option<u16>,
        detail: String,
    },

    /// The job reached `failed`.
    #[error("{message}")]
    RemoteFailure {
        prediction_id: String,
        message: String,
    },

    #[error("Image generation was canceled")]
    Canceled { prediction_id: String },

    /// The job succeeded without an output URL.
    #[error("No image URL returned by the image service")]
    MissingOutput { prediction_id: String },

    #[error("Image generation timed out. Please try again.")]
    Timeout { prediction_id: String, attempts: u32 },

    /// The local wait was cancelled; the remote job was left running.
    #[error("Image generation was abandoned before completion")]
    Abandoned { prediction_id: Option<String> },
}

impl GenerationError {
    pub fn kind(&self) -> GenerationErrorKind {
        match self {
            Self::Configuration(_) => GenerationErrorKind::Configuration,
            Self::Validation(_) => GenerationErrorKind::Validation,
            Self::Submission { .. } => GenerationErrorKind::Submission,
            Self::PollTransport { .. } => GenerationErrorKind::PollTransport,
            Self::RemoteFailure { .. } => GenerationErrorKind::RemoteFailure,
            Self::Canceled { .. } => GenerationErrorKind::Canceled,
            Self::MissingOutput { .. } => GenerationErrorKind::MissingOutput,
            Self::Timeout { .. } => GenerationErrorKind::Timeout,
            Self::Abandoned { .. } => GenerationErrorKind::Abandoned,
        }
    }

    /// Remote job id, once one was assigned.
    pub fn prediction_id(&self) -> Option<&str> {
        match self {
            Self::Configuration(_) | Self::Validation(_) | Self::Submission { .. } => None,
            Self::PollTransport { prediction_id, .. }
            | Self::RemoteFailure { prediction_id, .. }
            | Self::Canceled { prediction_id }
            | Self::MissingOutput { prediction_id }
            | Self::Timeout { prediction_id, .. } => Some(prediction_id),
            Self::Abandoned { prediction_id } => prediction_id.as_deref(),
        }
    }

    fn submission(err: JobApiError) -> Self {
        let status = err.status();
        let message = match err {
            JobApiError::Status { message, .. } => message,
            JobApiError::Request(e) => format!("Failed to create prediction: {e}"),
        };
        Self::Submission { status, message }
    }

    fn poll_transport(prediction_id: &str, err: JobApiError) -> Self {
        let status = err.status();
        let detail = match err {
            JobApiError::Status { status, .. } => status.to_string(),
            JobApiError::Request(e) => e.to_string(),
        };
        Self::PollTransport {
            prediction_id: prediction_id.to_string(),
            status,
            detail,
        }
    }
}

/// Request building only fails validation.
impl From<CoreError> for GenerationError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(msg) => Self::Validation(msg),
            other => Self::Validation(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Bridge
// ---------------------------------------------------------------------------

/// Submits one job per call and waits for its terminal state.
pub struct JobBridge<A> {
    api: A,
    model: ModelSpec,
    poll: PollConfig,
}

impl<A: JobApi> JobBridge<A> {
    pub fn new(api: A, model: ModelSpec, poll: PollConfig) -> Self {
        Self { api, model, poll }
    }

    pub fn model(&self) -> &ModelSpec {
        &self.model
    }

    pub fn poll_config(&self) -> &PollConfig {
        &self.poll
    }

    /// Run one generation to completion.
    ///
    /// Identical requests are never merged: every call submits a new job.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult, GenerationError> {
        if cancel.is_cancelled() {
            return Err(GenerationError::Abandoned {
                prediction_id: None,
            });
        }

        let started = Instant::now();
        let submission = JobSubmission {
            version: self.model.version.clone(),
            input: request.clone(),
        };

        tracing::info!(
            model = %self.model.name,
            aspect_ratio = %request.aspect_ratio,
            "Submitting image generation",
        );
        let mut job = tokio::select! {
            _ = cancel.cancelled() => {
                return Err(GenerationError::Abandoned { prediction_id: None });
            }
            submitted = self.api.submit(&submission) => {
                submitted.map_err(|e| {
                    tracing::warn!(error = %e, "Prediction submission rejected");
                    GenerationError::submission(e)
                })?
            }
        };
        tracing::info!(prediction_id = %job.id, status = %job.status, "Prediction created");

        let mut attempts = 0u32;
        let mut delay = self.poll.interval;
        while job.status.is_in_flight() && attempts < self.poll.max_attempts {
            tokio::select! {
                _ = cancel.cancelled() => return Err(self.abandoned(&job, attempts)),
                _ = tokio::time::sleep(delay) => {}
            }

            let prediction_id = job.id.clone();
            job = tokio::select! {
                _ = cancel.cancelled() => return Err(self.abandoned(&job, attempts)),
                polled = self.api.get(&prediction_id) => {
                    polled.map_err(|e| {
                        tracing::warn!(
                            prediction_id = %prediction_id,
                            attempt = attempts + 1,
                            error = %e,
                            "Prediction status check failed",
                        );
                        GenerationError::poll_transport(&prediction_id, e)
                    })?
                }
            };
            attempts += 1;
            tracing::debug!(
                prediction_id = %job.id,
                status = %job.status,
                attempt = attempts,
                "Polled prediction",
            );

            delay = next_interval(delay, &self.poll);
        }

        let elapsed = started.elapsed();
        self.finish(request, job, attempts, elapsed)
    }

    fn finish(
        &self,
        request: &GenerationRequest,
        job: Job,
        attempts: u32,
        elapsed: Duration,
    ) -> Result<GenerationResult, GenerationError> {
        let prediction_id = job.id;
        match job.status {
            JobStatus::Succeeded => match job.output {
                Some(image_url) => {
                    tracing::info!(
                        prediction_id = %prediction_id,
                        attempts,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Prediction succeeded",
                    );
                    Ok(GenerationResult {
                        image_url,
                        prediction_id,
                        attempts,
                        elapsed,
                        metadata: ImageMetadata::from_request(request, &self.model.name),
                    })
                }
                None => {
                    tracing::warn!(prediction_id = %prediction_id, "Prediction succeeded without output");
                    Err(GenerationError::MissingOutput { prediction_id })
                }
            },
            JobStatus::Failed => {
                let message = job
                    .error
                    .unwrap_or_else(|| "Image generation failed".to_string());
                tracing::warn!(prediction_id = %prediction_id, error = %message, "Prediction failed");
                Err(GenerationError::RemoteFailure {
                    prediction_id,
                    message,
                })
            }
            JobStatus::Canceled => {
                tracing::warn!(prediction_id = %prediction_id, "Prediction canceled remotely");
                Err(GenerationError::Canceled { prediction_id })
            }
            JobStatus::Starting | JobStatus::Processing | JobStatus::Unknown => {
                tracing::warn!(
                    prediction_id = %prediction_id,
                    attempts,
                    "Prediction did not finish within the poll budget",
                );
                Err(GenerationError::Timeout {
                    prediction_id,
                    attempts,
                })
            }
        }
    }

    fn abandoned(&self, job: &Job, attempts: u32) -> GenerationError {
        tracing::info!(
            prediction_id = %job.id,
            attempts,
            "Generation abandoned, remote job left running",
        );
        GenerationError::Abandoned {
            prediction_id: Some(job.id.clone()),
        }
    }
}
