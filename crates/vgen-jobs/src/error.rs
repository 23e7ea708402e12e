//! Job subsystem error types.

use std::time::Duration;

use thiserror::Error;

use crate::sanitize::sanitize_error_message;

pub type JobsResult<T> = Result<T, JobsError>;

/// Errors returned synchronously to submitters and readers.
#[derive(Debug, Error)]
pub enum JobsError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job queue is full ({capacity} pending jobs)")]
    QueueFull { capacity: usize },

    #[error("Dispatcher is shutting down")]
    ShuttingDown,
}

impl JobsError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    /// HTTP status a transport boundary should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            JobsError::Validation(_) => 400,
            JobsError::NotFound(_) => 404,
            JobsError::QueueFull { .. } | JobsError::ShuttingDown => 503,
        }
    }
}

/// Failures inside an execution unit. Always recorded as a failed job.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Job timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Unexpected internal error")]
    Panicked(String),
}

impl ExecutionError {
    pub fn extraction(err: impl std::fmt::Display) -> Self {
        Self::Extraction(err.to_string())
    }

    pub fn generation(err: impl std::fmt::Display) -> Self {
        Self::Generation(err.to_string())
    }

    /// Message stored on the job record.
    pub fn public_message(&self) -> String {
        sanitize_error_message(&self.to_string())
    }

    /// Short tag for logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionError::Extraction(_) => "extraction",
            ExecutionError::Generation(_) => "generation",
            ExecutionError::TimedOut(_) => "timeout",
            ExecutionError::Panicked(_) => "panic",
        }
    }
}
