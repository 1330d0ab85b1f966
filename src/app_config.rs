use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use crate::correction::CorrectionOptions;

/// Environment variable consulted when no Gemini API key is configured
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Directory holding the frame captures
    #[serde(default = "default_images_dir")]
    pub images_dir: String,

    /// Directory holding the extracted text artifacts
    #[serde(default = "default_texts_dir")]
    pub texts_dir: String,

    /// Path of the SRT file to write
    #[serde(default = "default_output_file")]
    pub output_file: String,

    /// Extraction (OCR) settings
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Correction settings
    #[serde(default)]
    pub correction: CorrectionConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Extraction service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExtractionConfig {
    /// Maximum number of concurrent OCR requests
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    /// Image extensions to pick up (case-insensitive, without dot)
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,

    /// Name of the scratch folder created in Drive
    #[serde(default = "default_drive_folder")]
    pub drive_folder: String,

    /// OAuth client secrets file
    #[serde(default = "default_credentials_file")]
    pub credentials_file: String,

    /// OAuth token file
    #[serde(default = "default_token_file")]
    pub token_file: String,

    /// Request timeout in seconds
    #[serde(default = "default_extraction_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            concurrent_requests: default_concurrent_requests(),
            image_extensions: default_image_extensions(),
            drive_folder: default_drive_folder(),
            credentials_file: default_credentials_file(),
            token_file: default_token_file(),
            timeout_secs: default_extraction_timeout_secs(),
        }
    }
}

/// Correction service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CorrectionConfig {
    /// Whether to run the correction pass
    #[serde(default)]
    pub enabled: bool,

    /// Model name (e.g., "gemini-1.5-flash-latest")
    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// API key; falls back to the GEMINI_API_KEY environment variable
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Service endpoint URL
    #[serde(default = "default_gemini_endpoint")]
    pub endpoint: String,

    /// Texts per correction request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Attempts per batch before keeping the originals
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Fixed delay between attempts in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Language the subtitles are written in
    #[serde(default = "default_language")]
    pub language: String,

    /// Prompt template
    /// Placeholders: {language}, {count}, {lines}
    #[serde(default = "default_prompt")]
    pub prompt: String,

    /// Temperature parameter for text generation (0.0 to 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds
    #[serde(default = "default_correction_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: default_gemini_model(),
            api_key: String::new(),
            endpoint: default_gemini_endpoint(),
            batch_size: default_batch_size(),
            retry_count: default_retry_count(),
            retry_delay_ms: default_retry_delay_ms(),
            language: default_language(),
            prompt: default_prompt(),
            temperature: default_temperature(),
            timeout_secs: default_correction_timeout_secs(),
        }
    }
}

impl CorrectionConfig {
    /// The configured API key, or the one from the environment
    pub fn resolve_api_key(&self) -> Option<String> {
        if !self.api_key.trim().is_empty() {
            return Some(self.api_key.trim().to_string());
        }
        std::env::var(GEMINI_API_KEY_ENV)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }

    /// Batch corrector options from this configuration
    pub fn options(&self) -> CorrectionOptions {
        CorrectionOptions {
            batch_size: self.batch_size,
            max_attempts: self.retry_count,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_images_dir() -> String {
    "RGBImages".to_string()
}

fn default_texts_dir() -> String {
    "TXTImages".to_string()
}

fn default_output_file() -> String {
    "subtitle.srt".to_string()
}

fn default_concurrent_requests() -> usize {
    crate::extraction::DEFAULT_CONCURRENCY_LIMIT
}

fn default_image_extensions() -> Vec<String> {
    vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()]
}

fn default_drive_folder() -> String {
    "Temp_OCR_Rust".to_string()
}

fn default_credentials_file() -> String {
    "credentials.json".to_string()
}

fn default_token_file() -> String {
    "token.json".to_string()
}

fn default_extraction_timeout_secs() -> u64 {
    120
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash-latest".to_string()
}

fn default_gemini_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_batch_size() -> usize {
    crate::correction::batch::DEFAULT_BATCH_SIZE
}

fn default_retry_count() -> u32 {
    crate::correction::batch::DEFAULT_MAX_ATTEMPTS
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_language() -> String {
    "Spanish".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_correction_timeout_secs() -> u64 {
    120
}

fn default_prompt() -> String {
    "You are an expert subtitle proofreader. The following lines are consecutive subtitles in {language} \
obtained through OCR. Fix spelling and OCR mistakes and make the wording sound natural, WITHOUT changing the meaning.

RULES:
1. Keep proper names and honorifics as they are.
2. Keep tone and dialogue consistent across all lines.
3. Answer as a list, keeping the format \"LINE <NUMBER>: <CORRECTED TEXT>\" for every line you received.
4. You MUST return exactly {count} lines. If a line needs no change, repeat it as is.
5. Do NOT add any other text.

Lines to correct:
{lines}".to_string()
}

impl Config {
    /// Load the configuration at `path`, writing a default one if missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {:?}", path))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            return Ok(config);
        }

        warn!("Config file not found at {:?}, creating default config.", path);
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config to file: {:?}", path))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.images_dir.trim().is_empty() || self.texts_dir.trim().is_empty() {
            return Err(anyhow!("Image and text directories must be set"));
        }
        if self.output_file.trim().is_empty() {
            return Err(anyhow!("Output file must be set"));
        }
        if self.extraction.concurrent_requests == 0 {
            return Err(anyhow!("extraction.concurrent_requests must be at least 1"));
        }
        if self.extraction.image_extensions.is_empty() {
            return Err(anyhow!("extraction.image_extensions must not be empty"));
        }
        if self.correction.batch_size == 0 {
            return Err(anyhow!("correction.batch_size must be at least 1"));
        }
        if self.correction.retry_count == 0 {
            return Err(anyhow!("correction.retry_count must be at least 1"));
        }
        if !(0.0..=2.0).contains(&self.correction.temperature) {
            return Err(anyhow!(
                "correction.temperature must be between 0.0 and 2.0, got {}",
                self.correction.temperature
            ));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            images_dir: default_images_dir(),
            texts_dir: default_texts_dir(),
            output_file: default_output_file(),
            extraction: ExtractionConfig::default(),
            correction: CorrectionConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
