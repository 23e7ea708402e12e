//! External capabilities the execution units depend on.
//!
//! Implementations are injected at construction time and own their
//! credentials and endpoints; the job subsystem never reads them from the
//! environment.

use std::sync::Arc;

use async_trait::async_trait;

use crate::notifier::Notifier;

/// Renders a video from script text and returns where it was published.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate_from_text(&self, text: &str) -> anyhow::Result<String>;
}

/// Downloads a PDF and returns its text.
#[async_trait]
pub trait PdfTextExtractor: Send + Sync {
    async fn extract(&self, pdf_url: &str) -> anyhow::Result<String>;
}

/// Downloads an audio file and returns its transcript.
#[async_trait]
pub trait AudioTranscriber: Send + Sync {
    async fn transcribe(&self, audio_url: &str) -> anyhow::Result<String>;
}

/// Bundle of collaborators shared by all execution units.
#[derive(Clone)]
pub struct JobServices {
    pub generator: Arc<dyn ContentGenerator>,
    pub pdf_extractor: Arc<dyn PdfTextExtractor>,
    pub audio_transcriber: Arc<dyn AudioTranscriber>,
    pub notifier: Arc<dyn Notifier>,
}

impl JobServices {
    pub fn new(
        generator: Arc<dyn ContentGenerator>,
        pdf_extractor: Arc<dyn PdfTextExtractor>,
        audio_transcriber: Arc<dyn AudioTranscriber>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            generator,
            pdf_extractor,
            audio_transcriber,
            notifier,
        }
    }
}

impl std::fmt::Debug for JobServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobServices").finish_non_exhaustive()
    }
}
