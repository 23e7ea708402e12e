//! Job records and their lifecycle.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::JobStatus;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID (UUIDv4, hex without hyphens).
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Source the job's script is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobMode {
    Text,
    Pdf,
    Audio,
}

impl JobMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobMode::Text => "text",
            JobMode::Pdf => "pdf",
            JobMode::Audio => "audio",
        }
    }
}

impl fmt::Display for JobMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Mode-specific input of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum JobPayload {
    /// Raw script text
    Text { text: String },
    /// PDF document to extract the script from
    Pdf { pdf_url: String },
    /// Audio source, or a transcript that replaces transcription
    Audio {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        audio_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        transcript: Option<String>,
    },
}

impl JobPayload {
    pub fn mode(&self) -> JobMode {
        match self {
            JobPayload::Text { .. } => JobMode::Text,
            JobPayload::Pdf { .. } => JobMode::Pdf,
            JobPayload::Audio { .. } => JobMode::Audio,
        }
    }
}

/// Rejected lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid transition for job {job_id}: {from} -> {to}")]
pub struct TransitionError {
    pub job_id: JobId,
    pub from: JobStatus,
    pub to: JobStatus,
}

/// One unit of work and its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JobRecord {
    /// Unique job ID
    pub id: JobId,

    /// Current status
    pub status: JobStatus,

    /// Input data
    pub payload: JobPayload,

    /// Human-readable description
    pub label: String,

    /// Recipient of the outcome notification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_address: Option<String>,

    /// Location of the produced video (completed only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,

    /// Safe-to-display failure description (failed only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Started at timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// Completed at timestamp (set for both terminal states)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    /// Create a queued record.
    pub fn new(
        id: JobId,
        payload: JobPayload,
        label: impl Into<String>,
        notify_address: Option<String>,
    ) -> Self {
        Self {
            id,
            status: JobStatus::Queued,
            payload,
            label: label.into(),
            notify_address,
            result_url: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn mode(&self) -> JobMode {
        self.payload.mode()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move `queued -> running` and stamp `started_at`.
    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.transition(JobStatus::Running)?;
        self.started_at = Some(not_before(self.created_at));
        Ok(())
    }

    /// Move `running -> completed` with the produced URL.
    pub fn complete(&mut self, result_url: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(JobStatus::Completed)?;
        self.result_url = Some(result_url.into());
        self.completed_at = Some(not_before(self.started_at.unwrap_or(self.created_at)));
        Ok(())
    }

    /// Move `running -> failed` with a display-safe message.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(JobStatus::Failed)?;
        self.error = Some(error.into());
        self.completed_at = Some(not_before(self.started_at.unwrap_or(self.created_at)));
        Ok(())
    }

    fn transition(&mut self, next: JobStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError {
                job_id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

/// Wall-clock time, clamped so timestamps never run backwards.
fn not_before(earlier: DateTime<Utc>) -> DateTime<Utc> {
    Utc::now().max(earlier)
}
