//! Job entity of the asynchronous image service.
//!
//! A job is created by a submission and then only ever mutated by the
//! remote service; the bridge observes it by polling.

use std::fmt;

use muse_core::image_request::GenerationRequest;
use serde::{Deserialize, Deserializer, Serialize};

/// Remote lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    #[serde(alias = "cancelled", alias = "aborted")]
    Canceled,
    /// Any status string this client does not know; treated as in flight.
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// `succeeded`, `failed` and `canceled` end the job; nothing else does.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }

    pub fn is_in_flight(self) -> bool {
        !self.is_terminal()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a remote job as returned by submit or status calls.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    /// Output URL. Only meaningful once the job has succeeded.
    #[serde(default, deserialize_with = "deserialize_output")]
    pub output: Option<String>,
    /// Failure description. Only meaningful once the job has failed.
    #[serde(default, deserialize_with = "deserialize_error")]
    pub error: Option<String>,
}

impl Job {
    pub fn new(id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            id: id.into(),
            status,
            output: None,
            error: None,
        }
    }

    pub fn with_output(mut self, url: impl Into<String>) -> Self {
        self.output = Some(url.into());
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }
}

/// Body of a job creation request.
#[derive(Debug, Clone, Serialize)]
pub struct JobSubmission {
    /// Model version identifier selecting the remote model.
    pub version: String,
    pub input: GenerationRequest,
}

/// Accepts either a bare URL string or an array whose first string is the URL.
fn deserialize_output<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let url = match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Array(items)) => items.into_iter().find_map(|v| match v {
            serde_json::Value::String(s) => Some(s),
            _ => None,
        }),
        _ => None,
    };
    Ok(url.filter(|s| !s.trim().is_empty()))
}

fn deserialize_error<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
