use anyhow::{Result, Context, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::app_config::Config;
use crate::correction::BatchCorrector;
use crate::extraction::{self, DispatchSummary, ExtractionDispatcher, ExtractionJob};
use crate::file_utils::FileManager;
use crate::providers::ImageToTextConverter;
use crate::providers::credentials::{FileTokenStore, TokenProvider};
use crate::providers::gemini::Gemini;
use crate::providers::google_drive::DriveOcr;
use crate::subtitle_processor::{AssemblySummary, SubtitleAssembler};

// @module: Application controller for the OCR-to-SRT workflow

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run both phases with the production backends
    pub async fn run(&self) -> Result<AssemblySummary> {
        let jobs = self.prepare_jobs()?;

        if jobs.iter().any(|job| !job.is_complete()) {
            let converter = self.build_converter().await?;
            self.extract(&jobs, converter).await;
        } else if !jobs.is_empty() {
            info!("All {} images already have text files, skipping OCR", jobs.len());
        }

        let corrector = self.build_corrector();
        self.build_subtitles(corrector.as_ref()).await
    }

    /// Run both phases with the given backends
    pub async fn run_with(
        &self,
        converter: Arc<dyn ImageToTextConverter>,
        corrector: Option<BatchCorrector>,
    ) -> Result<AssemblySummary> {
        let jobs = self.prepare_jobs()?;
        self.extract(&jobs, converter).await;
        self.build_subtitles(corrector.as_ref()).await
    }

    /// Only rebuild the SRT from the existing text files
    pub async fn run_assembly_only(&self, corrector: Option<BatchCorrector>) -> Result<AssemblySummary> {
        self.build_subtitles(corrector.as_ref()).await
    }

    /// Check the directories and list the extraction jobs
    fn prepare_jobs(&self) -> Result<Vec<ExtractionJob>> {
        let images_dir = Path::new(&self.config.images_dir);
        if !FileManager::dir_exists(images_dir) {
            FileManager::ensure_dir(images_dir)?;
            return Err(anyhow!(
                "Folder {:?} created. Put your images there and run again.",
                images_dir
            ));
        }
        FileManager::ensure_dir(&self.config.texts_dir)?;

        let jobs = extraction::discover_jobs(
            images_dir,
            &self.config.texts_dir,
            &self.config.extraction.image_extensions,
        )?;
        if jobs.is_empty() {
            info!("No images found to process in {:?}", images_dir);
        }
        Ok(jobs)
    }

    /// Phase 1: extract text from every image
    async fn extract(&self, jobs: &[ExtractionJob], converter: Arc<dyn ImageToTextConverter>) -> Option<DispatchSummary> {
        if jobs.is_empty() {
            return None;
        }

        info!("===== STEP 1: TEXT EXTRACTION (OCR) =====");
        info!("Processing {} images", jobs.len());

        let dispatcher = ExtractionDispatcher::new(converter, self.config.extraction.concurrent_requests);
        let progress_bar = Self::progress_bar(jobs.len() as u64);
        let callback_bar = progress_bar.clone();

        let start_time = Instant::now();
        let outcomes = dispatcher
            .dispatch(jobs, move |completed, _total| callback_bar.set_position(completed as u64))
            .await;
        progress_bar.finish_and_clear();

        let summary = DispatchSummary::from_outcomes(&outcomes, start_time.elapsed());
        if summary.failed > 0 {
            warn!("OCR finished with failures: {}", summary);
        } else {
            info!("OCR finished: {}", summary);
        }
        Some(summary)
    }

    /// Phase 2: build the SRT file
    async fn build_subtitles(&self, corrector: Option<&BatchCorrector>) -> Result<AssemblySummary> {
        info!("===== STEP 2: SRT CREATION =====");

        let summary = SubtitleAssembler::assemble(
            &self.config.texts_dir,
            &self.config.output_file,
            corrector,
        )
        .await
        .context("Failed to create the SRT file")?;

        info!(
            "SRT file created: {:?} ({} blocks, {} files skipped)",
            summary.output_path, summary.blocks_written, summary.skipped_files
        );
        Ok(summary)
    }

    /// Authenticate and connect the Drive OCR backend
    async fn build_converter(&self) -> Result<Arc<dyn ImageToTextConverter>> {
        let extraction = &self.config.extraction;
        let tokens: Arc<dyn TokenProvider> = Arc::new(FileTokenStore::new(
            &extraction.token_file,
            &extraction.credentials_file,
        ));

        let drive = DriveOcr::connect(tokens, &extraction.drive_folder, extraction.timeout_secs)
            .await
            .context("Drive authentication failed")?;
        info!("Authenticated with Google Drive");

        Ok(Arc::new(drive))
    }

    /// Build the Gemini batch corrector if correction is enabled and a key is available
    pub fn build_corrector(&self) -> Option<BatchCorrector> {
        let correction = &self.config.correction;
        if !correction.enabled {
            info!("Correction disabled, subtitles will be written as extracted");
            return None;
        }

        let Some(api_key) = correction.resolve_api_key() else {
            warn!("No Gemini API key configured; continuing without correction");
            return None;
        };

        let gemini = Gemini::new(api_key, &correction.endpoint, &correction.model, correction.timeout_secs)
            .with_prompt(&correction.prompt, &correction.language)
            .temperature(correction.temperature);
        info!("Gemini correction enabled ({})", correction.model);

        Some(BatchCorrector::with_options(Arc::new(gemini), correction.options()))
    }

    fn progress_bar(total: u64) -> ProgressBar {
        let progress_bar = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} images ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        progress_bar.set_style(style);
        progress_bar
    }
}
