/*!
 * Optional correction pass over the extracted subtitle texts.
 *
 * - `batch`: chunking, retry and fallback around a `BatchTextCorrector`
 * - `markers`: the `LINE <n>: <text>` protocol spoken with the service
 */

pub use self::batch::{BatchCorrector, CorrectionOptions, CorrectionReport};

pub mod batch;
pub mod markers;
