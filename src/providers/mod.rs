/*!
 * External collaborators used by the pipeline.
 *
 * The pipeline only sees two narrow capabilities:
 * - `ImageToTextConverter`: image bytes in, extracted text out (OCR)
 * - `BatchTextCorrector`: an ordered batch of lines in, corrected lines out
 *
 * Production backends:
 * - `google_drive`: OCR through Drive's "convert to Google Doc" import
 * - `gemini`: batch correction through the Gemini API
 *
 * `credentials` holds the OAuth token provider the Drive backend authenticates
 * with, and `mock` holds deterministic doubles for tests.
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// Converts one image into raw text
///
/// Implementations must be safe to call concurrently; the extraction
/// dispatcher keeps several calls in flight at once.
#[async_trait]
pub trait ImageToTextConverter: Send + Sync + Debug {
    /// Extract the text of an image
    ///
    /// # Arguments
    /// * `source_name` - Filename of the image, used for naming remote objects and logs
    /// * `image` - Raw image bytes
    ///
    /// # Returns
    /// * `Result<String, ProviderError>` - The extracted text or an error
    async fn convert(&self, source_name: &str, image: Vec<u8>) -> Result<String, ProviderError>;
}

/// Corrects an ordered batch of subtitle lines
#[async_trait]
pub trait BatchTextCorrector: Send + Sync + Debug {
    /// Correct a batch of texts
    ///
    /// A well-behaved implementation returns exactly one string per input,
    /// in the same order. Callers must not rely on it.
    async fn correct_batch(&self, texts: &[String]) -> Result<Vec<String>, ProviderError>;
}

pub mod credentials;
pub mod gemini;
pub mod google_drive;
pub mod mock;
