//! The body of one execution unit.
//!
//! An execution unit owns exactly one job. It moves the record to `running`,
//! turns the payload into script text, invokes the generator and finalizes
//! the record. Collaborator errors, panics and timeouts all end in `failed`;
//! the unit never returns with its record still `running`.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tracing::{error, warn, Instrument};

use vgen_models::{JobId, JobPayload, JobRecord};

use crate::collaborators::JobServices;
use crate::error::ExecutionError;
use crate::logging::JobLogger;
use crate::metrics;
use crate::notifier::{Notification, NotificationTasks};
use crate::store::JobStore;

/// State shared by every execution unit.
pub(crate) struct ExecutionContext {
    pub store: Arc<JobStore>,
    pub services: JobServices,
    pub job_timeout: Option<Duration>,
    pub notifications: Arc<NotificationTasks>,
}

/// Run one job from `queued` to a terminal state.
///
/// Returns the finalized record, or `None` if the job could not be started.
pub(crate) async fn execute_job(ctx: Arc<ExecutionContext>, job_id: JobId) -> Option<JobRecord> {
    let job = match ctx
        .store
        .update(&job_id, |record| record.start().map(|_| record.clone()))
    {
        Some(Ok(record)) => record,
        Some(Err(e)) => {
            error!(job_id = %job_id, "Refusing to run job: {}", e);
            return None;
        }
        None => {
            warn!(job_id = %job_id, "Job disappeared before it started");
            return None;
        }
    };

    let logger = JobLogger::new(&job_id, job.mode());
    logger.log_start(&job.label);
    metrics::job_started();
    let clock = Instant::now();

    let outcome = run_pipeline(&ctx, &job, &logger)
        .instrument(logger.span())
        .await;

    let finalized = ctx.store.update(&job_id, |record| {
        let transition = match &outcome {
            Ok(url) => record.complete(url.clone()),
            Err(e) => record.fail(e.public_message()),
        };
        transition.map(|_| record.clone())
    });
    metrics::job_ended();

    let record = match finalized {
        Some(Ok(record)) => record,
        Some(Err(e)) => {
            logger.log_finalize_error(&e);
            return None;
        }
        None => {
            warn!(job_id = %job_id, "Job disappeared while running");
            return None;
        }
    };

    logger.log_outcome(&record, outcome.as_ref().err(), clock.elapsed());
    metrics::record_finished(record.mode(), record.status, clock.elapsed().as_secs_f64());

    if let Some(notification) = Notification::for_record(&record) {
        ctx.notifications.spawn(Arc::clone(&ctx.services.notifier), notification);
    }

    Some(record)
}

/// Produce the video, converting panics and deadline overruns into errors.
async fn run_pipeline(
    ctx: &ExecutionContext,
    job: &JobRecord,
    logger: &JobLogger,
) -> Result<String, ExecutionError> {
    let work = AssertUnwindSafe(produce_video(&ctx.services, &job.payload, logger)).catch_unwind();

    let caught = match ctx.job_timeout {
        Some(limit) => tokio::time::timeout(limit, work)
            .await
            .map_err(|_| ExecutionError::TimedOut(limit))?,
        None => work.await,
    };

    caught.unwrap_or_else(|panic| Err(ExecutionError::Panicked(panic_message(panic.as_ref()))))
}

async fn produce_video(
    services: &JobServices,
    payload: &JobPayload,
    logger: &JobLogger,
) -> Result<String, ExecutionError> {
    let script = resolve_script(services, payload, logger).await?;

    logger.log_progress(&format!(
        "generating video from {} characters of text",
        script.chars().count()
    ));
    let url = services
        .generator
        .generate_from_text(&script)
        .await
        .map_err(|e| ExecutionError::generation(format!("{:#}", e)))?;

    let url = url.trim();
    if url.is_empty() {
        return Err(ExecutionError::generation("generator returned an empty URL"));
    }
    Ok(url.to_string())
}

/// Turn the payload into the script text handed to the generator.
pub(crate) async fn resolve_script(
    services: &JobServices,
    payload: &JobPayload,
    logger: &JobLogger,
) -> Result<String, ExecutionError> {
    match payload {
        JobPayload::Text { text } => Ok(text.clone()),
        JobPayload::Pdf { pdf_url } => {
            logger.log_progress("extracting text from PDF");
            let text = services
                .pdf_extractor
                .extract(pdf_url)
                .await
                .map_err(|e| ExecutionError::extraction(format!("{:#}", e)))?;
            non_blank(text)
                .ok_or_else(|| ExecutionError::extraction("PDF contained no extractable text"))
        }
        JobPayload::Audio {
            audio_url,
            transcript,
        } => {
            if let Some(transcript) = transcript.as_deref().filter(|t| !t.trim().is_empty()) {
                return Ok(transcript.to_string());
            }
            let Some(audio_url) = audio_url.as_deref().filter(|u| !u.trim().is_empty()) else {
                return Err(ExecutionError::extraction(
                    "No audio source or transcript supplied",
                ));
            };

            logger.log_progress("transcribing audio");
            let text = services
                .audio_transcriber
                .transcribe(audio_url)
                .await
                .map_err(|e| ExecutionError::extraction(format!("{:#}", e)))?;
            non_blank(text)
                .ok_or_else(|| ExecutionError::extraction("Transcription produced empty text"))
        }
    }
}

fn non_blank(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
