//! In-process video generation jobs.
//!
//! This crate provides:
//! - A concurrent job store with atomic per-record transitions
//! - A dispatcher with bounded admission and a fixed-size execution pool
//! - Execution units that turn text, PDF or audio input into a video
//! - Best-effort outcome notifications
//! - Optional retention of finished jobs and graceful shutdown
//!
//! A host process installs the subscriber once, then builds the dispatcher
//! from its collaborators:
//!
//! ```no_run
//! # async fn host(services: vgen_jobs::JobServices) {
//! use vgen_jobs::{telemetry, Dispatcher};
//! use vgen_models::SubmitTextJob;
//!
//! telemetry::init_tracing().ok();
//!
//! let dispatcher = Dispatcher::from_env(services);
//! let receipt = dispatcher
//!     .submit_text(SubmitTextJob {
//!         text: "A short script".into(),
//!         ..Default::default()
//!     })
//!     .expect("accepted");
//! println!("queued {}", receipt.job_id);
//!
//! dispatcher.shutdown().await;
//! # }
//! ```

pub mod collaborators;
pub mod config;
pub mod dispatcher;
pub mod error;
mod execution;
pub mod logging;
pub mod metrics;
pub mod notifier;
pub mod retention;
pub mod sanitize;
pub mod store;
pub mod telemetry;

pub use collaborators::{AudioTranscriber, ContentGenerator, JobServices, PdfTextExtractor};
pub use config::DispatcherConfig;
pub use dispatcher::{Dispatcher, DispatcherStats};
pub use error::{ExecutionError, JobsError, JobsResult};
pub use logging::JobLogger;
pub use notifier::{LogNotifier, Notification, Notifier};
pub use retention::RetentionSweeper;
pub use store::{JobCounts, JobStore};
