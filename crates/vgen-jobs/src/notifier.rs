//! Best-effort outcome notifications.
//!
//! Notifications are sent from their own task after a job is finalized. The
//! finalization path never awaits them and their failures are only logged.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use vgen_models::request::truncate_chars;
use vgen_models::{JobId, JobRecord, JobStatus};

use crate::metrics;

/// Maximum label characters placed in a subject line.
const SUBJECT_LABEL_CHARS: usize = 50;

/// Outcome message for one finished job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub job_id: JobId,
    pub address: String,
    pub label: String,
    pub status: JobStatus,
    /// Set when the job completed
    pub result_url: Option<String>,
    /// Set when the job failed
    pub error: Option<String>,
}

impl Notification {
    /// Build the notification for a terminal record that asked for one.
    pub fn for_record(record: &JobRecord) -> Option<Self> {
        if !record.is_terminal() {
            return None;
        }
        let address = record.notify_address.clone()?;

        Some(Self {
            job_id: record.id.clone(),
            address,
            label: record.label.clone(),
            status: record.status,
            result_url: record.result_url.clone(),
            error: record.error.clone(),
        })
    }

    pub fn subject(&self) -> String {
        let prefix = match self.status {
            JobStatus::Completed => "Your Video is Ready",
            _ => "Your Video Could Not Be Generated",
        };
        let label = self.label.trim();
        if label.is_empty() {
            prefix.to_string()
        } else {
            format!("{}: {}", prefix, truncate_chars(label, SUBJECT_LABEL_CHARS))
        }
    }

    pub fn body(&self) -> String {
        match (&self.result_url, &self.error) {
            (Some(url), _) => format!(
                "Your generated video is ready.\n\nURL:\n{}\n\nYou can open it now inside the app as well.",
                url
            ),
            (None, Some(error)) => format!(
                "We could not generate your video.\n\nReason: {}\n\nPlease try again.",
                error
            ),
            (None, None) => "Your video request has finished processing.".to_string(),
        }
    }
}

/// Delivers outcome messages to users.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// Notifier that only records the outcome in the logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        info!(
            job_id = %notification.job_id,
            status = %notification.status,
            "{}", notification.subject()
        );
        Ok(())
    }
}

/// Send a notification from a detached task.
pub(crate) fn spawn_notification(
    notifier: Arc<dyn Notifier>,
    notification: Notification,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let job_id = notification.job_id.clone();
        let outcome = AssertUnwindSafe(notifier.notify(&notification))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(())) => {
                debug!(job_id = %job_id, "Notification delivered");
                metrics::record_notification(true);
            }
            Ok(Err(e)) => {
                warn!(job_id = %job_id, "Notification failed: {:#}", e);
                metrics::record_notification(false);
            }
            Err(_) => {
                warn!(job_id = %job_id, "Notifier panicked");
                metrics::record_notification(false);
            }
        }
    })
}

/// Notification tasks that have not been awaited yet.
///
/// Spawning never waits; shutdown drains whatever is still in flight.
#[derive(Debug, Default)]
pub(crate) struct NotificationTasks {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl NotificationTasks {
    /// Send a notification in the background and remember its task.
    pub(crate) fn spawn(&self, notifier: Arc<dyn Notifier>, notification: Notification) {
        let handle = spawn_notification(notifier, notification);
        let mut handles = self.handles();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    /// Wait for every tracked notification, including ones spawned meanwhile.
    pub(crate) async fn wait_all(&self) {
        loop {
            let next = self.handles().pop();
            let Some(handle) = next else {
                return;
            };
            if let Err(e) = handle.await {
                warn!("Notification task ended abnormally: {}", e);
            }
        }
    }

    pub(crate) fn pending(&self) -> usize {
        self.handles().iter().filter(|h| !h.is_finished()).count()
    }

    fn handles(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.handles.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
