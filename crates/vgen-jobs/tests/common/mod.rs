//! In-memory collaborators and polling helpers for dispatcher tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use tokio::sync::{mpsc, Semaphore};

use vgen_jobs::{
    AudioTranscriber, ContentGenerator, Dispatcher, JobServices, Notification, Notifier,
    PdfTextExtractor,
};
use vgen_models::{JobId, JobStatus, JobView};

pub const VIDEO_URL: &str = "https://cdn.example.com/videos/out.mp4";

/// How the fake generator answers.
#[derive(Debug, Clone)]
pub enum Behavior {
    Succeed,
    Fail(&'static str),
    Panic,
    /// Panic only for this exact script, succeed otherwise
    PanicOn(&'static str),
    /// Fail scripts starting with this prefix, succeed otherwise
    FailOn(&'static str),
    EmptyUrl,
}

/// Content generator with scripted answers and concurrency tracking.
pub struct FakeGenerator {
    behavior: Behavior,
    delay: Option<Duration>,
    jitter_ms: Option<u64>,
    gate: Option<Arc<Semaphore>>,
    scripts: Mutex<Vec<String>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeGenerator {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            delay: None,
            jitter_ms: None,
            gate: None,
            scripts: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(Behavior::Succeed)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Vary the delay per call between 0 and `max_ms` milliseconds.
    pub fn with_jitter(mut self, max_ms: u64) -> Self {
        self.jitter_ms = Some(max_ms);
        self
    }

    /// Every call consumes one permit of `gate` before answering.
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn scripts(&self) -> Vec<String> {
        self.scripts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.scripts.lock().unwrap().len()
    }

    /// Highest number of calls observed running at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ContentGenerator for FakeGenerator {
    async fn generate_from_text(&self, text: &str) -> anyhow::Result<String> {
        let call = {
            let mut scripts = self.scripts.lock().unwrap();
            scripts.push(text.to_string());
            scripts.len() as u64
        };
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = ActiveGuard(&self.active);
        self.peak.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(max_ms) = self.jitter_ms {
            let ms = call.wrapping_mul(2_654_435_761) % (max_ms + 1);
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }

        match &self.behavior {
            Behavior::Succeed => Ok(VIDEO_URL.to_string()),
            Behavior::Fail(msg) => Err(anyhow!(*msg)),
            Behavior::Panic => panic!("renderer crashed"),
            Behavior::PanicOn(script) if text == *script => panic!("renderer crashed on {text}"),
            Behavior::PanicOn(_) => Ok(VIDEO_URL.to_string()),
            Behavior::FailOn(prefix) if text.starts_with(*prefix) => {
                Err(anyhow!("render rejected: {text}"))
            }
            Behavior::FailOn(_) => Ok(VIDEO_URL.to_string()),
            Behavior::EmptyUrl => Ok("  ".to_string()),
        }
    }
}

/// PDF extractor returning a fixed answer.
pub struct FakePdfExtractor {
    answer: Result<String, &'static str>,
    calls: AtomicUsize,
}

impl FakePdfExtractor {
    pub fn returning(text: &str) -> Self {
        Self {
            answer: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(msg: &'static str) -> Self {
        Self {
            answer: Err(msg),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PdfTextExtractor for FakePdfExtractor {
    async fn extract(&self, _pdf_url: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone().map_err(|msg| anyhow!(msg))
    }
}

/// Audio transcriber returning a fixed answer.
pub struct FakeTranscriber {
    answer: Result<String, &'static str>,
    urls: Mutex<Vec<String>>,
}

impl FakeTranscriber {
    pub fn returning(text: &str) -> Self {
        Self {
            answer: Ok(text.to_string()),
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(msg: &'static str) -> Self {
        Self {
            answer: Err(msg),
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioTranscriber for FakeTranscriber {
    async fn transcribe(&self, audio_url: &str) -> anyhow::Result<String> {
        self.urls.lock().unwrap().push(audio_url.to_string());
        self.answer.clone().map_err(|msg| anyhow!(msg))
    }
}

/// Notifier that forwards every notification to a channel.
pub struct RecordingNotifier {
    sent: mpsc::UnboundedSender<Notification>,
    fail: bool,
    delay: Option<Duration>,
}

impl RecordingNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sent, rx) = mpsc::unbounded_channel();
        (
            Self {
                sent,
                fail: false,
                delay: None,
            },
            rx,
        )
    }

    /// Records the notification, then reports a delivery failure.
    pub fn failing() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (mut notifier, rx) = Self::new();
        notifier.fail = true;
        (notifier, rx)
    }

    /// Records each notification only after `delay` has passed.
    pub fn slow(delay: Duration) -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (mut notifier, rx) = Self::new();
        notifier.delay = Some(delay);
        (notifier, rx)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let _ = self.sent.send(notification.clone());
        if self.fail {
            return Err(anyhow!("SMTP connection refused"));
        }
        Ok(())
    }
}

/// Collaborators for one test, with handles kept for assertions.
pub struct Harness {
    pub generator: Arc<FakeGenerator>,
    pub pdf: Arc<FakePdfExtractor>,
    pub audio: Arc<FakeTranscriber>,
    pub notifications: mpsc::UnboundedReceiver<Notification>,
    pub services: JobServices,
}

impl Harness {
    pub fn new(generator: FakeGenerator) -> Self {
        Self::with_parts(
            generator,
            FakePdfExtractor::returning("Text extracted from the PDF"),
            FakeTranscriber::returning("Words spoken in the audio"),
            RecordingNotifier::new(),
        )
    }

    pub fn with_parts(
        generator: FakeGenerator,
        pdf: FakePdfExtractor,
        audio: FakeTranscriber,
        (notifier, notifications): (RecordingNotifier, mpsc::UnboundedReceiver<Notification>),
    ) -> Self {
        let generator = Arc::new(generator);
        let pdf = Arc::new(pdf);
        let audio = Arc::new(audio);
        let services = JobServices::new(
            generator.clone(),
            pdf.clone(),
            audio.clone(),
            Arc::new(notifier),
        );

        Self {
            generator,
            pdf,
            audio,
            notifications,
            services,
        }
    }

    /// Wait for the next notification, failing the test after a few seconds.
    pub async fn next_notification(&mut self) -> Notification {
        tokio::time::timeout(Duration::from_secs(5), self.notifications.recv())
            .await
            .expect("Timed out waiting for notification")
            .expect("Notifier dropped")
    }

    /// Assert no further notification arrives within a short window.
    pub async fn assert_no_notification(&mut self) {
        let next = tokio::time::timeout(Duration::from_millis(100), self.notifications.recv()).await;
        assert!(!matches!(next, Ok(Some(_))), "unexpected notification");
    }
}

/// Poll until the job reaches `status`.
pub async fn wait_for_status(dispatcher: &Dispatcher, job_id: &JobId, status: JobStatus) -> JobView {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let view = dispatcher.get_job(job_id).expect("Job should exist");
        if view.status == status {
            return view;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {} stuck in {} waiting for {}",
            job_id,
            view.status,
            status
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Poll until the job is completed or failed.
pub async fn wait_for_terminal(dispatcher: &Dispatcher, job_id: &JobId) -> JobView {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let view = dispatcher.get_job(job_id).expect("Job should exist");
        if view.is_terminal() {
            return view;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {} never finished (status {})",
            job_id,
            view.status
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
