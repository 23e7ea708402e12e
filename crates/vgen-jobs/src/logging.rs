//! Per-job structured logging.

use std::time::Duration;

use tracing::{error, info, Span};

use vgen_models::{JobId, JobMode, JobRecord, JobStatus};

use crate::error::ExecutionError;

/// Logger bound to one execution unit.
///
/// Every event carries `job_id` and `mode`, so one job's lifecycle can be
/// followed through interleaved output from many execution units.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: JobId,
    mode: JobMode,
}

impl JobLogger {
    pub fn new(job_id: &JobId, mode: JobMode) -> Self {
        Self {
            job_id: job_id.clone(),
            mode,
        }
    }

    pub fn log_start(&self, label: &str) {
        info!(job_id = %self.job_id, mode = self.mode.as_str(), label, "Job started");
    }

    pub fn log_progress(&self, message: &str) {
        info!(job_id = %self.job_id, mode = self.mode.as_str(), "Job progress: {}", message);
    }

    /// Log the finalized record. `cause` carries the internal detail behind
    /// the stored public message and is only ever written to the log.
    pub fn log_outcome(&self, record: &JobRecord, cause: Option<&ExecutionError>, elapsed: Duration) {
        let elapsed_ms = elapsed.as_millis() as u64;
        match record.status {
            JobStatus::Completed => info!(
                job_id = %self.job_id,
                mode = self.mode.as_str(),
                elapsed_ms,
                result_url = record.result_url.as_deref().unwrap_or_default(),
                "Job completed"
            ),
            JobStatus::Failed => error!(
                job_id = %self.job_id,
                mode = self.mode.as_str(),
                elapsed_ms,
                kind = cause.map(ExecutionError::kind).unwrap_or("unknown"),
                detail = ?cause,
                "Job failed: {}",
                record.error.as_deref().unwrap_or_default()
            ),
            status => error!(
                job_id = %self.job_id,
                mode = self.mode.as_str(),
                %status,
                "Job finalized in a non-terminal state"
            ),
        }
    }

    /// Log a finalization that the store refused.
    pub fn log_finalize_error(&self, reason: &dyn std::fmt::Display) {
        error!(job_id = %self.job_id, mode = self.mode.as_str(), "Could not finalize job: {}", reason);
    }

    pub fn span(&self) -> Span {
        tracing::info_span!("job", job_id = %self.job_id, mode = self.mode.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vgen_models::JobPayload;

    fn running_record() -> JobRecord {
        let mut record = JobRecord::new(
            JobId::new(),
            JobPayload::Text {
                text: "Hello".into(),
            },
            "Hello",
            None,
        );
        record.start().unwrap();
        record
    }

    #[test]
    fn test_log_outcome_accepts_both_terminal_states() {
        let mut done = running_record();
        done.complete("https://cdn.example.com/a.mp4").unwrap();
        let logger = JobLogger::new(&done.id, done.mode());
        logger.log_outcome(&done, None, Duration::from_millis(12));

        let mut failed = running_record();
        let cause = ExecutionError::Panicked("index out of bounds".into());
        failed.fail(cause.public_message()).unwrap();
        let logger = JobLogger::new(&failed.id, failed.mode());
        logger.log_outcome(&failed, Some(&cause), Duration::from_millis(3));
        logger.log_finalize_error(&"record vanished");
    }

    #[test]
    fn test_span_is_named_after_jobs() {
        let logger = JobLogger::new(&JobId::new(), JobMode::Pdf);
        let span = logger.span();
        if let Some(meta) = span.metadata() {
            assert_eq!(meta.name(), "job");
        }
    }
}
