//! Job subsystem metrics.
//!
//! Recorded through the `metrics` facade; the host process decides whether
//! and how to export them.

use metrics::{counter, gauge, histogram};

use vgen_models::{JobMode, JobStatus};

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_SUBMITTED_TOTAL: &str = "vgen_jobs_submitted_total";
    pub const JOBS_REJECTED_TOTAL: &str = "vgen_jobs_rejected_total";
    pub const JOBS_FINISHED_TOTAL: &str = "vgen_jobs_finished_total";
    pub const JOB_DURATION_SECONDS: &str = "vgen_job_duration_seconds";
    pub const JOBS_IN_FLIGHT: &str = "vgen_jobs_in_flight";
    pub const NOTIFICATIONS_TOTAL: &str = "vgen_notifications_total";
    pub const JOBS_PURGED_TOTAL: &str = "vgen_jobs_purged_total";
}

/// Record an accepted submission.
pub fn record_submitted(mode: JobMode) {
    let labels = [("mode", mode.as_str().to_string())];
    counter!(names::JOBS_SUBMITTED_TOTAL, &labels).increment(1);
}

/// Record a refused submission.
pub fn record_rejected(mode: JobMode, reason: &'static str) {
    let labels = [
        ("mode", mode.as_str().to_string()),
        ("reason", reason.to_string()),
    ];
    counter!(names::JOBS_REJECTED_TOTAL, &labels).increment(1);
}

/// Record a job reaching a terminal state.
pub fn record_finished(mode: JobMode, status: JobStatus, duration_secs: f64) {
    let labels = [
        ("mode", mode.as_str().to_string()),
        ("status", status.as_str().to_string()),
    ];
    counter!(names::JOBS_FINISHED_TOTAL, &labels).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Track execution units entering and leaving the pool.
pub fn job_started() {
    gauge!(names::JOBS_IN_FLIGHT).increment(1.0);
}

pub fn job_ended() {
    gauge!(names::JOBS_IN_FLIGHT).decrement(1.0);
}

/// Record a notification attempt.
pub fn record_notification(delivered: bool) {
    let outcome = if delivered { "delivered" } else { "failed" };
    let labels = [("outcome", outcome.to_string())];
    counter!(names::NOTIFICATIONS_TOTAL, &labels).increment(1);
}

/// Record records removed by the retention sweeper.
pub fn record_purged(count: usize) {
    counter!(names::JOBS_PURGED_TOTAL).increment(count as u64);
}
