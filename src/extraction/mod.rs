/*!
 * Text extraction phase.
 *
 * Every image in the input directory becomes an `ExtractionJob`. The
 * `ExtractionDispatcher` runs the jobs against an `ImageToTextConverter`
 * with bounded concurrency and writes one text artifact per image. An
 * existing artifact means the job is already done, which makes reruns resume
 * where a previous run stopped.
 */

use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::file_utils::FileManager;

pub use self::dispatcher::{ExtractionDispatcher, DEFAULT_CONCURRENCY_LIMIT};

pub mod dispatcher;

/// One image to extract text from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionJob {
    /// Image filename, e.g. `00_00_01_000__00_00_03_500.png`
    pub source_name: String,
    /// Full path of the image
    pub source_path: PathBuf,
    /// Where the extracted text goes
    pub artifact_path: PathBuf,
}

impl ExtractionJob {
    pub fn new(source_path: impl Into<PathBuf>, artifact_dir: impl AsRef<Path>) -> Self {
        let source_path = source_path.into();
        let source_name = source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let artifact_path = FileManager::artifact_path(&source_path, artifact_dir);

        Self { source_name, source_path, artifact_path }
    }

    /// Whether the artifact of this job already exists
    pub fn is_complete(&self) -> bool {
        self.artifact_path.exists()
    }
}

/// Terminal state of a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Artifact already present, nothing was sent to the converter
    Skipped,
    /// Text extracted and artifact written
    Succeeded,
    /// The job failed; no artifact was written
    Failed(String),
}

impl JobOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Counts over the outcomes of one dispatch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchSummary {
    pub skipped: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl DispatchSummary {
    pub fn from_outcomes(outcomes: &[JobOutcome], elapsed: Duration) -> Self {
        let mut summary = Self { elapsed, ..Self::default() };
        for outcome in outcomes {
            match outcome {
                JobOutcome::Skipped => summary.skipped += 1,
                JobOutcome::Succeeded => summary.succeeded += 1,
                JobOutcome::Failed(_) => summary.failed += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.skipped + self.succeeded + self.failed
    }
}

impl fmt::Display for DispatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} extracted, {} skipped, {} failed in {:.1?}",
            self.succeeded, self.skipped, self.failed, self.elapsed
        )
    }
}

/// Build one job per image in `images_dir`, sorted by filename.
///
/// Only files with an extension in `extensions` are considered. Fails if the
/// directory cannot be listed.
pub fn discover_jobs(
    images_dir: impl AsRef<Path>,
    artifact_dir: impl AsRef<Path>,
    extensions: &[String],
) -> Result<Vec<ExtractionJob>> {
    let images_dir = images_dir.as_ref();
    let images = FileManager::find_files(images_dir, extensions)
        .with_context(|| format!("Failed to list images in {:?}", images_dir))?;

    Ok(images
        .into_iter()
        .map(|path| ExtractionJob::new(path, artifact_dir.as_ref()))
        .collect())
}
