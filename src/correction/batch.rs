/*!
 * Batch correction processing.
 *
 * Texts are corrected in fixed-size batches, one batch at a time. Every
 * failure mode falls back to the uncorrected text so a misbehaving service
 * can never drop or shift a subtitle line.
 */

use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::providers::BatchTextCorrector;

/// Texts per batch when nothing else is configured
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Attempts per batch when nothing else is configured
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Pause between failed attempts when nothing else is configured
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Tuning of the correction pass
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionOptions {
    /// Number of texts sent per request
    pub batch_size: usize,
    /// Attempts per batch before falling back to the originals
    pub max_attempts: u32,
    /// Fixed delay between failed attempts
    pub retry_delay: Duration,
}

impl Default for CorrectionOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Result of a correction pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrectionReport {
    /// Final texts, same length and order as the input
    pub texts: Vec<String>,
    /// Batches whose originals were kept after exhausting all attempts
    pub failed_batches: usize,
    /// Batches discarded because the response had the wrong length
    pub discarded_batches: usize,
    /// Individual blank answers replaced by their original
    pub substituted_entries: usize,
    /// Human readable warnings, in the order they happened
    pub warnings: Vec<String>,
}

impl CorrectionReport {
    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Corrects subtitle texts through a `BatchTextCorrector`
#[derive(Debug, Clone)]
pub struct BatchCorrector {
    /// The correction backend
    corrector: Arc<dyn BatchTextCorrector>,

    /// Batch size and retry policy
    options: CorrectionOptions,
}

impl BatchCorrector {
    /// Create a new batch corrector with the default options
    pub fn new(corrector: Arc<dyn BatchTextCorrector>) -> Self {
        Self::with_options(corrector, CorrectionOptions::default())
    }

    /// Create a new batch corrector; zero batch size or attempts are raised to 1
    pub fn with_options(corrector: Arc<dyn BatchTextCorrector>, options: CorrectionOptions) -> Self {
        Self {
            corrector,
            options: CorrectionOptions {
                batch_size: options.batch_size.max(1),
                max_attempts: options.max_attempts.max(1),
                retry_delay: options.retry_delay,
            },
        }
    }

    pub fn options(&self) -> &CorrectionOptions {
        &self.options
    }

    /// Correct all texts and return only the final strings
    pub async fn correct_texts(&self, texts: &[String]) -> Vec<String> {
        self.correct(texts).await.texts
    }

    /// Correct all texts, batch by batch
    pub async fn correct(&self, texts: &[String]) -> CorrectionReport {
        let mut report = CorrectionReport {
            texts: Vec::with_capacity(texts.len()),
            ..CorrectionReport::default()
        };

        let total_batches = texts.len().div_ceil(self.options.batch_size);
        for (batch_index, batch) in texts.chunks(self.options.batch_size).enumerate() {
            info!(
                "[AI] Sending batch {} of {} ({} texts) for correction",
                batch_index + 1,
                total_batches,
                batch.len()
            );
            let corrected = self.correct_one_batch(batch_index, batch, &mut report).await;
            report.texts.extend(corrected);
        }

        report
    }

    /// Correct a single batch with retry, integrity check and element fallback
    async fn correct_one_batch(
        &self,
        batch_index: usize,
        batch: &[String],
        report: &mut CorrectionReport,
    ) -> Vec<String> {
        let max_attempts = self.options.max_attempts;

        for attempt in 1..=max_attempts {
            match self.corrector.correct_batch(batch).await {
                Ok(corrected) => {
                    if corrected.len() != batch.len() {
                        report.discarded_batches += 1;
                        report.warn(format!(
                            "Batch {}: service returned {} texts but {} were sent; keeping the originals",
                            batch_index + 1,
                            corrected.len(),
                            batch.len()
                        ));
                        return batch.to_vec();
                    }

                    info!("[✓] Batch {} corrected", batch_index + 1);
                    return self.fill_blanks(batch_index, batch, corrected, report);
                }
                Err(e) => {
                    warn!(
                        "Batch {}: correction attempt {} of {} failed: {}",
                        batch_index + 1,
                        attempt,
                        max_attempts,
                        e
                    );
                    if attempt < max_attempts {
                        tokio::time::sleep(self.options.retry_delay).await;
                    }
                }
            }
        }

        report.failed_batches += 1;
        report.warn(format!(
            "Batch {}: all {} correction attempts failed; keeping the originals",
            batch_index + 1,
            max_attempts
        ));
        batch.to_vec()
    }

    /// Replace blank answers with the original text at the same position
    fn fill_blanks(
        &self,
        batch_index: usize,
        batch: &[String],
        mut corrected: Vec<String>,
        report: &mut CorrectionReport,
    ) -> Vec<String> {
        for (position, (text, original)) in corrected.iter_mut().zip(batch).enumerate() {
            if !text.trim().is_empty() {
                continue;
            }
            if !original.trim().is_empty() {
                report.substituted_entries += 1;
                report.warn(format!(
                    "Batch {}: no correction for entry {}; keeping the original",
                    batch_index + 1,
                    position
                ));
            }
            *text = original.clone();
        }
        corrected
    }
}
