/*!
 * Integration tests for the concurrent extraction dispatcher
 */

use anyhow::Result;
use ocrsrt::extraction::{self, DispatchSummary, ExtractionDispatcher, ExtractionJob, JobOutcome};
use ocrsrt::providers::mock::MockConverter;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use crate::common;

fn image_jobs(images: &Path, texts: &Path, names: &[&str]) -> Result<Vec<ExtractionJob>> {
    for name in names {
        common::create_test_image(images, name)?;
    }
    extraction::discover_jobs(images, texts, &common::strings(&["png", "jpg"]))
}

#[tokio::test]
async fn test_dispatch_withFreshJobs_shouldWriteRawArtifacts() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let (images, texts) = common::create_pipeline_dirs(temp_dir.path())?;
    let jobs = image_jobs(&images, &texts, &["00_00_01_000__00_00_02_000.png", "00_00_03_000__00_00_04_000.jpg"])?;

    let converter = Arc::new(MockConverter::new().with_text("00_00_01_000__00_00_02_000.png", "Hola"));
    let dispatcher = ExtractionDispatcher::new(converter.clone(), 5);

    let outcomes = dispatcher.dispatch(&jobs, |_, _| {}).await;

    assert_eq!(outcomes, vec![JobOutcome::Succeeded, JobOutcome::Succeeded]);
    assert_eq!(converter.call_count(), 2);
    for job in &jobs {
        let content = std::fs::read_to_string(&job.artifact_path)?;
        assert_eq!(content, converter.raw_text_for(&job.source_name));
    }
    Ok(())
}

#[tokio::test]
async fn test_dispatch_withExistingArtifacts_shouldSkipWithoutCalls() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let (images, texts) = common::create_pipeline_dirs(temp_dir.path())?;
    let jobs = image_jobs(&images, &texts, &["00_00_01_000__00_00_02_000.png", "00_00_03_000__00_00_04_000.png"])?;
    common::create_test_file(&texts, "00_00_01_000__00_00_02_000.txt", "previous run")?;

    let converter = Arc::new(MockConverter::new());
    let dispatcher = ExtractionDispatcher::new(converter.clone(), 5);

    let outcomes = dispatcher.dispatch(&jobs, |_, _| {}).await;

    assert_eq!(outcomes, vec![JobOutcome::Skipped, JobOutcome::Succeeded]);
    assert_eq!(converter.seen(), vec!["00_00_03_000__00_00_04_000.png".to_string()]);
    assert_eq!(std::fs::read_to_string(&jobs[0].artifact_path)?, "previous run");

    // A rerun has nothing left to do
    let rerun = dispatcher.dispatch(&jobs, |_, _| {}).await;
    assert_eq!(rerun, vec![JobOutcome::Skipped, JobOutcome::Skipped]);
    assert_eq!(converter.call_count(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_dispatch_withDelayedConverter_shouldRespectConcurrencyLimit() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let (images, texts) = common::create_pipeline_dirs(temp_dir.path())?;
    let names: Vec<String> = (0..12)
        .map(|i| format!("00_00_{:02}_000__00_00_{:02}_500.png", i, i))
        .collect();
    let name_refs: Vec<&str> = names.iter().map(|n| n.as_str()).collect();
    let jobs = image_jobs(&images, &texts, &name_refs)?;

    let converter = Arc::new(MockConverter::new().with_delay(Duration::from_millis(30)));
    let dispatcher = ExtractionDispatcher::new(converter.clone(), 3);

    let outcomes = dispatcher.dispatch(&jobs, |_, _| {}).await;

    assert_eq!(outcomes.len(), 12);
    assert!(outcomes.iter().all(|o| *o == JobOutcome::Succeeded));
    assert!(converter.max_in_flight() <= 3, "max in flight was {}", converter.max_in_flight());
    assert!(converter.max_in_flight() >= 2);
    Ok(())
}

#[tokio::test]
async fn test_dispatch_withOneFailingJob_shouldNotAffectSiblings() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let (images, texts) = common::create_pipeline_dirs(temp_dir.path())?;
    let jobs = image_jobs(
        &images,
        &texts,
        &[
            "00_00_01_000__00_00_02_000.png",
            "00_00_03_000__00_00_04_000.png",
            "00_00_05_000__00_00_06_000.png",
        ],
    )?;

    let converter = Arc::new(MockConverter::new().failing_for("00_00_03_000__00_00_04_000.png"));
    let dispatcher = ExtractionDispatcher::new(converter.clone(), 1);

    let outcomes = dispatcher.dispatch(&jobs, |_, _| {}).await;

    assert_eq!(outcomes[0], JobOutcome::Succeeded);
    assert!(outcomes[1].is_failed());
    assert_eq!(outcomes[2], JobOutcome::Succeeded);
    assert!(!jobs[1].artifact_path.exists());
    assert!(!ocrsrt::file_utils::FileManager::staging_path(&jobs[1].artifact_path).exists());
    assert!(jobs[2].is_complete());

    let summary = DispatchSummary::from_outcomes(&outcomes, Duration::ZERO);
    assert_eq!((summary.succeeded, summary.failed, summary.skipped), (2, 1, 0));
    assert_eq!(summary.total(), 3);
    Ok(())
}

#[tokio::test]
async fn test_dispatch_withUnwritableArtifactDir_shouldFailJob() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let (images, _) = common::create_pipeline_dirs(temp_dir.path())?;
    let missing = temp_dir.path().join("does-not-exist");
    let jobs = image_jobs(&images, &missing, &["00_00_01_000__00_00_02_000.png"])?;

    let dispatcher = ExtractionDispatcher::new(Arc::new(MockConverter::new()), 2);
    let outcomes = dispatcher.dispatch(&jobs, |_, _| {}).await;

    assert!(matches!(&outcomes[0], JobOutcome::Failed(reason) if reason.contains("artifact")));
    Ok(())
}

#[tokio::test]
async fn test_dispatch_shouldReportProgressUpToTotal() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let (images, texts) = common::create_pipeline_dirs(temp_dir.path())?;
    let jobs = image_jobs(
        &images,
        &texts,
        &["00_00_01_000__00_00_02_000.png", "00_00_03_000__00_00_04_000.png"],
    )?;
    common::create_test_file(&texts, "00_00_01_000__00_00_02_000.txt", "done")?;

    let calls = Arc::new(AtomicUsize::new(0));
    let highest = Arc::new(AtomicUsize::new(0));
    let (calls_cb, highest_cb) = (calls.clone(), highest.clone());

    let dispatcher = ExtractionDispatcher::new(Arc::new(MockConverter::new()), 2);
    dispatcher
        .dispatch(&jobs, move |completed, total| {
            assert_eq!(total, 2);
            calls_cb.fetch_add(1, Ordering::SeqCst);
            highest_cb.fetch_max(completed, Ordering::SeqCst);
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(highest.load(Ordering::SeqCst), 2);
    Ok(())
}

#[test]
fn test_discover_jobs_shouldFilterAndSortImages() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let (images, texts) = common::create_pipeline_dirs(temp_dir.path())?;
    common::create_test_image(&images, "00_00_05_000__00_00_06_000.png")?;
    common::create_test_image(&images, "00_00_01_000__00_00_02_000.JPG")?;
    common::create_test_file(&images, "readme.md", "ignore me")?;

    let jobs = extraction::discover_jobs(&images, &texts, &common::strings(&["jpg", "png"]))?;

    let names: Vec<&str> = jobs.iter().map(|j| j.source_name.as_str()).collect();
    assert_eq!(names, vec!["00_00_01_000__00_00_02_000.JPG", "00_00_05_000__00_00_06_000.png"]);
    assert_eq!(jobs[0].artifact_path, texts.join("00_00_01_000__00_00_02_000.txt"));
    Ok(())
}

#[test]
fn test_dispatcher_withZeroLimit_shouldUseOne() {
    let dispatcher = ExtractionDispatcher::new(Arc::new(MockConverter::new()), 0);
    assert_eq!(dispatcher.concurrency_limit(), 1);
}
