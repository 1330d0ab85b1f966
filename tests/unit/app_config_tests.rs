/*!
 * Tests for app configuration functionality
 */

use anyhow::Result;
use ocrsrt::app_config::{Config, LogLevel};
use std::time::Duration;
use crate::common;

#[test]
fn test_default_config_shouldMatchPipelineDefaults() {
    let config = Config::default();

    assert_eq!(config.images_dir, "RGBImages");
    assert_eq!(config.texts_dir, "TXTImages");
    assert_eq!(config.output_file, "subtitle.srt");
    assert_eq!(config.extraction.concurrent_requests, 5);
    assert_eq!(config.extraction.image_extensions, common::strings(&["jpg", "jpeg", "png"]));
    assert!(!config.correction.enabled);
    assert_eq!(config.correction.batch_size, 100);
    assert_eq!(config.correction.retry_count, 3);
    assert_eq!(config.correction.retry_delay_ms, 2000);
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.validate().is_ok());
}

#[test]
fn test_default_prompt_shouldContainAllPlaceholders() {
    let prompt = Config::default().correction.prompt;
    assert!(prompt.contains("{language}"));
    assert!(prompt.contains("{count}"));
    assert!(prompt.contains("{lines}"));
}

#[test]
fn test_correction_options_shouldMirrorConfig() {
    let mut config = Config::default();
    config.correction.batch_size = 10;
    config.correction.retry_count = 5;
    config.correction.retry_delay_ms = 250;

    let options = config.correction.options();
    assert_eq!(options.batch_size, 10);
    assert_eq!(options.max_attempts, 5);
    assert_eq!(options.retry_delay, Duration::from_millis(250));
}

#[test]
fn test_deserialize_withPartialJson_shouldFillDefaults() -> Result<()> {
    let json = r#"{
        "images_dir": "frames",
        "extraction": { "concurrent_requests": 2 },
        "correction": { "enabled": true, "language": "English" },
        "log_level": "debug"
    }"#;

    let config: Config = serde_json::from_str(json)?;

    assert_eq!(config.images_dir, "frames");
    assert_eq!(config.texts_dir, "TXTImages");
    assert_eq!(config.extraction.concurrent_requests, 2);
    assert_eq!(config.extraction.drive_folder, "Temp_OCR_Rust");
    assert!(config.correction.enabled);
    assert_eq!(config.correction.language, "English");
    assert_eq!(config.correction.batch_size, 100);
    assert_eq!(config.log_level, LogLevel::Debug);
    Ok(())
}

#[test]
fn test_validate_withInvalidValues_shouldFail() {
    let mut config = Config::default();
    config.extraction.concurrent_requests = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.extraction.image_extensions.clear();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.correction.batch_size = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.correction.retry_count = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.correction.temperature = 2.5;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.correction.temperature = -0.1;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.output_file = "  ".to_string();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.texts_dir = String::new();
    assert!(config.validate().is_err());
}

#[test]
fn test_load_or_create_withMissingFile_shouldWriteDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let config = Config::load_or_create(&path)?;

    assert!(path.exists());
    assert_eq!(config.images_dir, "RGBImages");

    let reloaded = Config::load_or_create(&path)?;
    assert_eq!(reloaded.correction.prompt, config.correction.prompt);
    Ok(())
}

#[test]
fn test_save_thenLoad_shouldPreserveValues() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let mut config = Config::default();
    config.output_file = "movie.srt".to_string();
    config.correction.enabled = true;
    config.correction.model = "gemini-2.0-flash".to_string();
    config.save(&path)?;

    let loaded = Config::load_or_create(&path)?;
    assert_eq!(loaded.output_file, "movie.srt");
    assert!(loaded.correction.enabled);
    assert_eq!(loaded.correction.model, "gemini-2.0-flash");
    Ok(())
}

#[test]
fn test_load_or_create_withMalformedJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "conf.json", "{ not json")?;

    assert!(Config::load_or_create(&path).is_err());
    Ok(())
}

#[test]
fn test_resolve_api_key_withConfiguredKey_shouldPreferIt() {
    let mut config = Config::default();
    config.correction.api_key = "  configured-key  ".to_string();

    assert_eq!(config.correction.resolve_api_key().as_deref(), Some("configured-key"));
}

#[test]
fn test_log_level_shouldMapToFilter() {
    assert_eq!(LogLevel::Warn.to_level_filter(), log::LevelFilter::Warn);
    assert_eq!(LogLevel::Trace.to_level_filter(), log::LevelFilter::Trace);
}

#[test]
fn test_validate_withTemperatureAboveOne_shouldAccept() {
    let mut config = Config::default();
    config.correction.temperature = 1.5;
    assert!(config.validate().is_ok());

    config.correction.temperature = 2.0;
    assert!(config.validate().is_ok());
}
