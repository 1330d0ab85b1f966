/*!
 * # ocrsrt - subtitles from frame captures
 *
 * Turns a folder of time-coded frame captures into an SRT subtitle file.
 *
 * A run has two phases. Extraction sends every capture without a text
 * artifact to an `ImageToTextConverter`, a few at a time, and stores the raw
 * text next to the others; the artifacts double as the resume point of the
 * next run. Assembly reads the artifacts back in filename order, recovers the
 * timing from each name, strips the OCR boilerplate, optionally runs the
 * texts through a `BatchCorrector` and writes the SRT file.
 *
 * Modules:
 * - `timecode`: `<start>__<end>` filenames and SRT timestamps
 * - `extraction`: jobs, the bounded dispatcher and its outcomes
 * - `correction`: batch correction and the `LINE <n>:` protocol
 * - `subtitle_processor`: cleaning, blocks and the assembler
 * - `providers`: Drive OCR, Gemini, OAuth tokens and test doubles
 * - `app_config` / `app_controller`: `conf.json` and the two-phase run
 * - `file_utils`, `errors`: shared plumbing
 */

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod app_config;
pub mod app_controller;
pub mod correction;
pub mod errors;
pub mod extraction;
pub mod file_utils;
pub mod providers;
pub mod subtitle_processor;
pub mod timecode;

// Re-exports
pub use app_config::Config;
pub use correction::{BatchCorrector, CorrectionOptions, CorrectionReport};
pub use errors::{ExtractionError, ProviderError, SubtitleError};
pub use extraction::{ExtractionDispatcher, ExtractionJob, JobOutcome};
pub use providers::{BatchTextCorrector, ImageToTextConverter};
pub use subtitle_processor::{SubtitleAssembler, SubtitleBlock, SubtitleCollection, clean_ocr_text};
pub use timecode::{Timecode, parse_filename};
