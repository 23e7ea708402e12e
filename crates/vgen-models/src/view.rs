//! Public, read-only view of a job.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{JobId, JobMode, JobRecord, JobStatus};

/// Everything a caller may see about a job; the raw payload is never exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct JobView {
    pub id: JobId,
    pub status: JobStatus,
    pub mode: JobMode,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&JobRecord> for JobView {
    fn from(record: &JobRecord) -> Self {
        Self {
            id: record.id.clone(),
            status: record.status,
            mode: record.mode(),
            label: record.label.clone(),
            notify_address: record.notify_address.clone(),
            result_url: record.result_url.clone(),
            error: record.error.clone(),
            created_at: record.created_at,
            started_at: record.started_at,
            completed_at: record.completed_at,
        }
    }
}

impl From<JobRecord> for JobView {
    fn from(record: JobRecord) -> Self {
        Self::from(&record)
    }
}

impl JobView {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
