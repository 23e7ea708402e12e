//! Shared data models for the video generation job subsystem.
//!
//! This crate provides Serde-serializable types for:
//! - Job records and their lifecycle
//! - Submission requests per input mode
//! - The public job view returned to callers

pub mod job;
pub mod job_status;
pub mod request;
pub mod view;

// Re-export common types
pub use job::{JobId, JobMode, JobPayload, JobRecord, TransitionError};
pub use job_status::JobStatus;
pub use request::{
    JobRequest, SubmitAudioJob, SubmitPdfJob, SubmitReceipt, SubmitTextJob, AUDIO_DEFAULT_LABEL,
    DEFAULT_LABEL_CHARS,
};
pub use view::JobView;
