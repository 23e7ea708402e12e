//! Submission request types.
//!
//! Each mode has its own request shape; all of them convert into a
//! [`JobRequest`], which owns validation and label defaulting.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{JobId, JobPayload, JobStatus};

/// Maximum characters taken from the payload for a default label.
pub const DEFAULT_LABEL_CHARS: usize = 40;

/// Label used for audio jobs submitted without one.
pub const AUDIO_DEFAULT_LABEL: &str = "Audio Generation";

/// Generate a video from raw text.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SubmitTextJob {
    #[serde(default)]
    pub text: String,
    #[serde(default, alias = "user_email", skip_serializing_if = "Option::is_none")]
    pub notify_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Generate a video from a PDF document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SubmitPdfJob {
    #[serde(default)]
    pub pdf_url: String,
    #[serde(default, alias = "user_email", skip_serializing_if = "Option::is_none")]
    pub notify_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Generate a video from an audio source or a ready transcript.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SubmitAudioJob {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(default, alias = "user_email", skip_serializing_if = "Option::is_none")]
    pub notify_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Mode-independent submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub payload: JobPayload,
    pub notify_address: Option<String>,
    pub label: Option<String>,
}

impl JobRequest {
    /// Check that the mode's required input is present.
    pub fn validate(&self) -> Result<(), String> {
        match &self.payload {
            JobPayload::Text { text } => {
                if is_blank(text) {
                    return Err("'text' is required".to_string());
                }
            }
            JobPayload::Pdf { pdf_url } => {
                if is_blank(pdf_url) {
                    return Err("'pdf_url' is required".to_string());
                }
            }
            JobPayload::Audio {
                audio_url,
                transcript,
            } => {
                if non_blank(audio_url.as_deref()).is_none()
                    && non_blank(transcript.as_deref()).is_none()
                {
                    return Err("Provide 'audio_url' or 'transcript'".to_string());
                }
            }
        }

        Ok(())
    }

    /// Supplied label, or one derived from the payload.
    pub fn resolved_label(&self) -> String {
        if let Some(label) = non_blank(self.label.as_deref()) {
            return label.to_string();
        }

        match &self.payload {
            JobPayload::Text { text } => truncate_chars(text, DEFAULT_LABEL_CHARS),
            JobPayload::Pdf { pdf_url } => truncate_chars(pdf_url, DEFAULT_LABEL_CHARS),
            JobPayload::Audio { .. } => AUDIO_DEFAULT_LABEL.to_string(),
        }
    }

    /// Notification address with blank values treated as absent.
    pub fn notify_address(&self) -> Option<String> {
        non_blank(self.notify_address.as_deref()).map(str::to_string)
    }
}

impl From<SubmitTextJob> for JobRequest {
    fn from(req: SubmitTextJob) -> Self {
        Self {
            payload: JobPayload::Text { text: req.text },
            notify_address: req.notify_address,
            label: req.label,
        }
    }
}

impl From<SubmitPdfJob> for JobRequest {
    fn from(req: SubmitPdfJob) -> Self {
        Self {
            payload: JobPayload::Pdf {
                pdf_url: req.pdf_url,
            },
            notify_address: req.notify_address,
            label: req.label,
        }
    }
}

impl From<SubmitAudioJob> for JobRequest {
    fn from(req: SubmitAudioJob) -> Self {
        Self {
            payload: JobPayload::Audio {
                audio_url: req.audio_url,
                transcript: req.transcript,
            },
            notify_address: req.notify_address,
            label: req.label,
        }
    }
}

/// Answer to an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SubmitReceipt {
    pub job_id: JobId,
    pub status: JobStatus,
}

/// Take at most `max` characters, respecting char boundaries.
pub fn truncate_chars(input: &str, max: usize) -> String {
    input.chars().take(max).collect()
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
