/*!
 * Tests for the full application lifecycle
 */

use anyhow::Result;
use ocrsrt::app_config::Config;
use ocrsrt::app_controller::Controller;
use ocrsrt::correction::{BatchCorrector, CorrectionOptions};
use ocrsrt::providers::mock::{MockConverter, MockCorrector};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use crate::common;

fn config_for(root: &Path) -> Config {
    let mut config = Config::default();
    config.images_dir = root.join("images").to_string_lossy().to_string();
    config.texts_dir = root.join("texts").to_string_lossy().to_string();
    config.output_file = root.join("out").join("subtitle.srt").to_string_lossy().to_string();
    config
}

#[test]
fn test_with_config_withInvalidConfig_shouldFail() {
    let mut config = Config::default();
    config.extraction.concurrent_requests = 0;
    assert!(Controller::with_config(config).is_err());
}

#[test]
fn test_with_config_withDefaults_shouldSucceed() -> Result<()> {
    let controller = Controller::with_config(Config::default())?;
    assert_eq!(controller.config().output_file, "subtitle.srt");
    Ok(())
}

#[tokio::test]
async fn test_run_with_withMockBackends_shouldProduceSrt() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let (images, texts) = common::create_pipeline_dirs(temp_dir.path())?;
    common::create_test_image(&images, "00_00_01_000__00_00_03_500.png")?;
    common::create_test_image(&images, "00_00_04_000__00_00_06_000.png")?;
    common::create_test_image(&images, "notes.png")?;

    let converter = Arc::new(
        MockConverter::new()
            .with_text("00_00_01_000__00_00_03_500.png", "Hello")
            .with_text("00_00_04_000__00_00_06_000.png", "World"),
    );
    let controller = Controller::with_config(config_for(temp_dir.path()))?;

    let summary = controller.run_with(converter.clone(), None).await?;

    assert_eq!(converter.call_count(), 3);
    assert!(texts.join("00_00_01_000__00_00_03_500.txt").exists());
    assert_eq!(summary.blocks_written, 2);
    assert_eq!(summary.skipped_files, 1);
    assert_eq!(
        std::fs::read_to_string(&summary.output_path)?,
        "1\n00:00:01,000 --> 00:00:03,500\nHello\n\n2\n00:00:04,000 --> 00:00:06,000\nWorld\n\n"
    );
    Ok(())
}

#[tokio::test]
async fn test_run_with_withPartialFailure_shouldAssembleRemaining() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let (images, _) = common::create_pipeline_dirs(temp_dir.path())?;
    common::create_test_image(&images, "00_00_01_000__00_00_02_000.png")?;
    common::create_test_image(&images, "00_00_03_000__00_00_04_000.png")?;

    let converter = Arc::new(MockConverter::new().failing_for("00_00_01_000__00_00_02_000.png"));
    let controller = Controller::with_config(config_for(temp_dir.path()))?;

    let summary = controller.run_with(converter.clone(), None).await?;
    assert_eq!(summary.blocks_written, 1);

    // A second run only retries the failed image
    let retry = Arc::new(MockConverter::new());
    let summary = controller.run_with(retry.clone(), None).await?;
    assert_eq!(retry.seen(), vec!["00_00_01_000__00_00_02_000.png".to_string()]);
    assert_eq!(summary.blocks_written, 2);
    Ok(())
}

#[tokio::test]
async fn test_run_with_withCorrector_shouldCorrectAssembledTexts() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let (images, _) = common::create_pipeline_dirs(temp_dir.path())?;
    common::create_test_image(&images, "00_00_01_000__00_00_02_000.jpg")?;

    let options = CorrectionOptions { retry_delay: Duration::ZERO, ..CorrectionOptions::default() };
    let corrector = BatchCorrector::with_options(Arc::new(MockCorrector::working()), options);
    let controller = Controller::with_config(config_for(temp_dir.path()))?;

    let summary = controller.run_with(Arc::new(MockConverter::new()), Some(corrector)).await?;

    let srt = std::fs::read_to_string(&summary.output_path)?;
    assert!(srt.contains("[FIXED] Text of 00_00_01_000__00_00_02_000.jpg"));
    Ok(())
}

#[tokio::test]
async fn test_run_with_withMissingImagesDir_shouldCreateItAndFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = config_for(temp_dir.path());
    let images_dir = config.images_dir.clone();
    let controller = Controller::with_config(config)?;

    let converter = Arc::new(MockConverter::new());
    let result = controller.run_with(converter.clone(), None).await;

    assert!(result.is_err());
    assert!(Path::new(&images_dir).is_dir());
    assert_eq!(converter.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_run_assembly_only_shouldUseExistingArtifacts() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let (_, texts) = common::create_pipeline_dirs(temp_dir.path())?;
    common::create_test_file(&texts, "00_00_01_000__00_00_03_500.txt", "Hello")?;
    let controller = Controller::with_config(config_for(temp_dir.path()))?;

    let summary = controller.run_assembly_only(None).await?;

    assert_eq!(summary.blocks_written, 1);
    assert!(summary.output_path.ends_with("subtitle.srt"));
    Ok(())
}

#[test]
fn test_build_corrector_whenDisabled_shouldReturnNone() -> Result<()> {
    let controller = Controller::with_config(Config::default())?;
    assert!(controller.build_corrector().is_none());
    Ok(())
}

#[test]
fn test_build_corrector_withKey_shouldUseConfiguredOptions() -> Result<()> {
    let mut config = Config::default();
    config.correction.enabled = true;
    config.correction.api_key = "test-key".to_string();
    config.correction.batch_size = 25;
    let controller = Controller::with_config(config)?;

    let corrector = controller.build_corrector().expect("corrector should be built");
    assert_eq!(corrector.options().batch_size, 25);
    Ok(())
}
