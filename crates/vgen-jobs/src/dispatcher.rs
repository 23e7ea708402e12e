//! Job dispatcher.
//!
//! Submissions are admitted into a bounded channel. A single runner task
//! pulls job IDs off the channel and spawns one execution unit per job,
//! holding a semaphore permit for the unit's lifetime so at most
//! `max_concurrent_jobs` units run at once. A full channel rejects the
//! submission before any record exists.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, Mutex, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use vgen_models::{
    JobId, JobRequest, JobStatus, JobView, SubmitAudioJob, SubmitPdfJob, SubmitReceipt,
    SubmitTextJob,
};

use crate::collaborators::JobServices;
use crate::config::DispatcherConfig;
use crate::error::{JobsError, JobsResult};
use crate::execution::{execute_job, ExecutionContext};
use crate::metrics;
use crate::notifier::NotificationTasks;
use crate::retention::RetentionSweeper;
use crate::store::{JobCounts, JobStore};

/// Point-in-time view of the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatcherStats {
    pub jobs: JobCounts,
    /// Accepted jobs still waiting in the admission channel
    pub queue_depth: usize,
    pub queue_capacity: usize,
    pub max_concurrent_jobs: usize,
    pub shutting_down: bool,
}

/// Accepts jobs, schedules their execution and serves status reads.
pub struct Dispatcher {
    config: DispatcherConfig,
    store: Arc<JobStore>,
    sender: mpsc::Sender<JobId>,
    job_semaphore: Arc<Semaphore>,
    notifications: Arc<NotificationTasks>,
    shutdown: watch::Sender<bool>,
    runner: Mutex<Option<JoinHandle<()>>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl Dispatcher {
    /// Create a dispatcher and start its background tasks.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: DispatcherConfig, services: JobServices) -> Self {
        let config = DispatcherConfig {
            max_concurrent_jobs: config.max_concurrent_jobs.max(1),
            queue_capacity: config.queue_capacity.max(1),
            ..config
        };

        let store = Arc::new(JobStore::new());
        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let notifications = Arc::new(NotificationTasks::default());
        let (shutdown, _) = watch::channel(false);

        info!(
            "Starting job dispatcher with {} max concurrent jobs and queue capacity {}",
            config.max_concurrent_jobs, config.queue_capacity
        );

        let ctx = Arc::new(ExecutionContext {
            store: Arc::clone(&store),
            services,
            job_timeout: config.job_timeout,
            notifications: Arc::clone(&notifications),
        });
        let runner = tokio::spawn(Self::run(
            ctx,
            receiver,
            Arc::clone(&job_semaphore),
            shutdown.subscribe(),
        ));

        let sweeper = config.retention_ttl.map(|ttl| {
            let sweeper =
                RetentionSweeper::new(Arc::clone(&store), ttl, config.retention_sweep_interval);
            let shutdown_rx = shutdown.subscribe();
            tokio::spawn(async move { sweeper.run(shutdown_rx).await })
        });

        Self {
            config,
            store,
            sender,
            job_semaphore,
            notifications,
            shutdown,
            runner: Mutex::new(Some(runner)),
            sweeper: Mutex::new(sweeper),
        }
    }

    /// Create a dispatcher configured from the environment.
    pub fn from_env(services: JobServices) -> Self {
        Self::new(DispatcherConfig::from_env(), services)
    }

    /// Accept a job of any mode.
    ///
    /// Returns as soon as the job is recorded as queued; the work itself runs
    /// in the background.
    pub fn submit(&self, request: JobRequest) -> JobsResult<SubmitReceipt> {
        let mode = request.payload.mode();

        if let Err(msg) = request.validate() {
            metrics::record_rejected(mode, "validation");
            return Err(JobsError::validation(msg));
        }
        if self.is_shutting_down() {
            metrics::record_rejected(mode, "shutting_down");
            return Err(JobsError::ShuttingDown);
        }

        // Reserve the slot first so a full queue never leaves a record behind
        let permit = match self.sender.try_reserve() {
            Ok(permit) => permit,
            Err(TrySendError::Full(())) => {
                metrics::record_rejected(mode, "queue_full");
                warn!(mode = %mode, "Job queue is full, rejecting submission");
                return Err(JobsError::QueueFull {
                    capacity: self.config.queue_capacity,
                });
            }
            Err(TrySendError::Closed(())) => {
                metrics::record_rejected(mode, "shutting_down");
                return Err(JobsError::ShuttingDown);
            }
        };

        let label = request.resolved_label();
        let notify_address = request.notify_address();
        let job_id = self.store.create(request.payload, label, notify_address);
        permit.send(job_id.clone());

        metrics::record_submitted(mode);
        info!(job_id = %job_id, mode = %mode, "Job queued");

        Ok(SubmitReceipt {
            job_id,
            status: JobStatus::Queued,
        })
    }

    pub fn submit_text(&self, request: SubmitTextJob) -> JobsResult<SubmitReceipt> {
        self.submit(request.into())
    }

    pub fn submit_pdf(&self, request: SubmitPdfJob) -> JobsResult<SubmitReceipt> {
        self.submit(request.into())
    }

    pub fn submit_audio(&self, request: SubmitAudioJob) -> JobsResult<SubmitReceipt> {
        self.submit(request.into())
    }

    /// Current public state of a job.
    pub fn get_job(&self, job_id: &JobId) -> JobsResult<JobView> {
        self.store
            .get(job_id)
            .map(JobView::from)
            .ok_or_else(|| JobsError::not_found(job_id.as_str()))
    }

    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            jobs: self.store.counts(),
            queue_depth: self.sender.max_capacity() - self.sender.capacity(),
            queue_capacity: self.config.queue_capacity,
            max_concurrent_jobs: self.config.max_concurrent_jobs,
            shutting_down: self.is_shutting_down(),
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Stop accepting jobs and wait for accepted ones to finish.
    ///
    /// Jobs already admitted still run, and their notifications are delivered
    /// before this returns. Waiting is bounded by the configured shutdown
    /// timeout; work still running after it is left to finish on its own.
    pub async fn shutdown(&self) {
        if self.shutdown.send_replace(true) {
            debug!("Dispatcher shutdown already requested");
            return;
        }
        info!("Shutdown requested, draining accepted jobs");

        let runner = self.runner.lock().await.take();
        let sweeper = self.sweeper.lock().await.take();

        let drained = tokio::time::timeout(self.config.shutdown_timeout, async {
            if let Some(runner) = runner {
                if let Err(e) = runner.await {
                    warn!("Job runner ended abnormally: {}", e);
                }
            }
            self.wait_for_jobs().await;
            // Every unit has finalized, so no further notifications can start
            self.notifications.wait_all().await;
        })
        .await;

        if drained.is_err() {
            warn!(
                "Shutdown timed out after {:?} with {} jobs and {} notifications unfinished",
                self.config.shutdown_timeout,
                self.store.counts().active(),
                self.notifications.pending()
            );
        }

        if let Some(sweeper) = sweeper {
            let _ = sweeper.await;
        }

        info!("Job dispatcher stopped");
    }

    /// Wait until every execution unit has released its permit.
    async fn wait_for_jobs(&self) {
        let all = u32::try_from(self.config.max_concurrent_jobs).unwrap_or(u32::MAX);
        if let Ok(permits) = self.job_semaphore.acquire_many(all).await {
            drop(permits);
        }
    }

    /// Runner loop: one execution unit per admitted job.
    async fn run(
        ctx: Arc<ExecutionContext>,
        mut receiver: mpsc::Receiver<JobId>,
        job_semaphore: Arc<Semaphore>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        loop {
            // Take a slot before pulling a job so queued jobs stay in the channel
            let Ok(permit) = Arc::clone(&job_semaphore).acquire_owned().await else {
                break;
            };

            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                next = receiver.recv() => match next {
                    Some(job_id) => {
                        let ctx = Arc::clone(&ctx);
                        tokio::spawn(async move {
                            let _permit = permit;
                            execute_job(ctx, job_id).await;
                        });
                    }
                    None => break,
                },
            }
        }

        // Refuse new sends, then run whatever was already admitted
        receiver.close();
        let mut drained = 0usize;
        while let Some(job_id) = receiver.recv().await {
            let Ok(permit) = Arc::clone(&job_semaphore).acquire_owned().await else {
                break;
            };
            let ctx = Arc::clone(&ctx);
            tokio::spawn(async move {
                let _permit = permit;
                execute_job(ctx, job_id).await;
            });
            drained += 1;
        }

        debug!("Job runner stopped after draining {} queued jobs", drained);
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("jobs", &self.store.len())
            .finish_non_exhaustive()
    }
}
