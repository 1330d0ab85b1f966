use futures::future::join_all;
use log::{debug, error, info};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;

use crate::errors::ExtractionError;
use crate::file_utils::FileManager;
use crate::providers::ImageToTextConverter;
use super::{ExtractionJob, JobOutcome};

/// Concurrent extraction calls when nothing else is configured
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 5;

/// Runs extraction jobs on a bounded pool of tokio tasks
#[derive(Debug, Clone)]
pub struct ExtractionDispatcher {
    /// The OCR backend
    converter: Arc<dyn ImageToTextConverter>,

    /// Maximum number of concurrent converter calls
    concurrency_limit: usize,
}

impl ExtractionDispatcher {
    /// Create a new dispatcher; a limit of 0 is raised to 1
    pub fn new(converter: Arc<dyn ImageToTextConverter>, concurrency_limit: usize) -> Self {
        Self {
            converter,
            concurrency_limit: concurrency_limit.max(1),
        }
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Run every job to a terminal outcome.
    ///
    /// Outcomes are returned in job order. A failing job never stops the
    /// others; the call returns once all of them have finished.
    pub async fn dispatch(
        &self,
        jobs: &[ExtractionJob],
        progress_callback: impl Fn(usize, usize) + Clone + Send + Sync + 'static,
    ) -> Vec<JobOutcome> {
        let total_jobs = jobs.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency_limit));
        let completed_jobs = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = jobs
            .iter()
            .cloned()
            .map(|job| {
                let converter = self.converter.clone();
                let semaphore = semaphore.clone();
                let completed_jobs = completed_jobs.clone();
                let progress_callback = progress_callback.clone();

                tokio::spawn(async move {
                    let outcome = if job.is_complete() {
                        debug!("[SKIP] Artifact for '{}' already exists", job.source_name);
                        JobOutcome::Skipped
                    } else {
                        match semaphore.acquire_owned().await {
                            Ok(_permit) => match run_job(converter.as_ref(), &job).await {
                                Ok(()) => JobOutcome::Succeeded,
                                Err(e) => {
                                    error!("Failed to process {}: {}", job.source_name, e);
                                    JobOutcome::Failed(e.to_string())
                                }
                            },
                            Err(e) => JobOutcome::Failed(format!("Concurrency slot unavailable: {}", e)),
                        }
                    };

                    let current = completed_jobs.fetch_add(1, Ordering::SeqCst) + 1;
                    progress_callback(current, total_jobs);
                    outcome
                })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .zip(jobs)
            .map(|(joined, job)| match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Worker for {} did not finish: {}", job.source_name, e);
                    JobOutcome::Failed(format!("Worker task failed: {}", e))
                }
            })
            .collect()
    }
}

/// Read the image, extract its text and persist the artifact
async fn run_job(converter: &dyn ImageToTextConverter, job: &ExtractionJob) -> Result<(), ExtractionError> {
    info!("[+] Processing {}", job.source_name);

    let image = tokio::fs::read(&job.source_path).await.map_err(|source| ExtractionError::ImageRead {
        path: job.source_path.clone(),
        source,
    })?;

    let text = converter.convert(&job.source_name, image).await?;

    FileManager::write_atomically(&job.artifact_path, text.as_bytes())
        .await
        .map_err(|source| ExtractionError::ArtifactWrite {
            path: job.artifact_path.clone(),
            source,
        })?;

    debug!("[✓] Saved text for {} to {:?}", job.source_name, job.artifact_path);
    Ok(())
}
