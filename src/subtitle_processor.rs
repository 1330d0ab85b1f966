use anyhow::{Result, Context, anyhow};
use log::{info, warn, debug};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::correction::BatchCorrector;
use crate::file_utils::{FileManager, ARTIFACT_EXTENSION};
use crate::timecode::{self, Timecode};

// @module: Subtitle assembly and SRT output

/// Text used when an artifact exists but cannot be read
pub const READ_ERROR_PLACEHOLDER: &str = "[READ ERROR]";

/// Text written for blocks that end up empty
pub const EMPTY_TEXT_PLACEHOLDER: &str = "...";

/// Number of boilerplate lines the OCR export puts before the text
const HEADER_LINES: usize = 2;

/// Strip the title boilerplate of an OCR export.
///
/// Exports of three lines or more lose their first two lines; shorter ones
/// are only trimmed.
pub fn clean_ocr_text(raw_text: &str) -> String {
    let raw_text = raw_text.strip_prefix('\u{feff}').unwrap_or(raw_text);
    let lines: Vec<&str> = raw_text.split('\n').collect();

    if lines.len() <= HEADER_LINES {
        return raw_text.trim().to_string();
    }

    lines[HEADER_LINES..]
        .iter()
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

// @struct: Single subtitle block
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleBlock {
    // @field: 1-based, contiguous sequence number
    pub sequence: usize,

    // @field: Start time
    pub start: Timecode,

    // @field: End time
    pub end: Timecode,

    // @field: Subtitle text
    pub text: String,
}

impl SubtitleBlock {
    pub fn new(sequence: usize, start: Timecode, end: Timecode, text: String) -> Self {
        SubtitleBlock { sequence, start, end, text }
    }

    /// The `start --> end` line of this block
    pub fn timing_line(&self) -> String {
        timecode::timing_line(&self.start, &self.end)
    }
}

impl fmt::Display for SubtitleBlock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = if self.text.is_empty() { EMPTY_TEXT_PLACEHOLDER } else { &self.text };
        writeln!(f, "{}", self.sequence)?;
        writeln!(f, "{}", self.timing_line())?;
        writeln!(f, "{}", text)?;
        writeln!(f)
    }
}

/// Ordered collection of subtitle blocks
#[derive(Debug, Default)]
pub struct SubtitleCollection {
    /// List of subtitle blocks
    pub blocks: Vec<SubtitleBlock>,
}

impl SubtitleCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a block with the next sequence number
    pub fn push(&mut self, start: Timecode, end: Timecode, text: String) {
        let sequence = self.blocks.len() + 1;
        self.blocks.push(SubtitleBlock::new(sequence, start, end, text));
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Texts of all blocks, in order
    pub fn texts(&self) -> Vec<String> {
        self.blocks.iter().map(|b| b.text.clone()).collect()
    }

    /// Replace block texts positionally
    pub fn replace_texts(&mut self, texts: Vec<String>) -> Result<()> {
        if texts.len() != self.blocks.len() {
            return Err(anyhow!(
                "Got {} texts for {} subtitle blocks",
                texts.len(),
                self.blocks.len()
            ));
        }
        for (block, text) in self.blocks.iter_mut().zip(texts) {
            block.text = text;
        }
        Ok(())
    }

    /// Render the whole collection as SRT
    pub fn to_srt_string(&self) -> String {
        self.blocks.iter().map(|b| b.to_string()).collect()
    }

    /// Write subtitles to an SRT file
    pub fn write_to_srt<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                FileManager::ensure_dir(parent)?;
            }
        }

        let file = File::create(path)
            .with_context(|| format!("Failed to create subtitle file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);

        for block in &self.blocks {
            write!(writer, "{}", block)
                .with_context(|| format!("Failed to write subtitle file: {}", path.display()))?;
        }
        writer.flush()
            .with_context(|| format!("Failed to write subtitle file: {}", path.display()))?;

        Ok(())
    }
}

/// What an assembly run produced
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblySummary {
    /// Blocks written to the output
    pub blocks_written: usize,
    /// Artifacts skipped because their filename did not parse
    pub skipped_files: usize,
    /// Artifacts that could not be read and got the placeholder text
    pub unreadable_files: usize,
    /// Warnings recorded by the correction pass
    pub correction_warnings: Vec<String>,
    pub output_path: PathBuf,
}

/// Builds the final SRT file from the text artifacts
pub struct SubtitleAssembler;

impl SubtitleAssembler {
    /// Read every artifact of `text_folder` in filename order and write the
    /// resulting subtitles to `output_path`.
    ///
    /// Listing the folder and writing the output are the only fatal steps;
    /// malformed names are skipped and unreadable artifacts get a placeholder.
    pub async fn assemble(
        text_folder: impl AsRef<Path>,
        output_path: impl AsRef<Path>,
        corrector: Option<&BatchCorrector>,
    ) -> Result<AssemblySummary> {
        let text_folder = text_folder.as_ref();
        let output_path = output_path.as_ref();

        let artifacts = FileManager::find_files(text_folder, &[ARTIFACT_EXTENSION.to_string()])
            .with_context(|| format!("Failed to read text folder {:?}", text_folder))?;
        if artifacts.is_empty() {
            return Err(anyhow!("No .{} files found in {:?}", ARTIFACT_EXTENSION, text_folder));
        }
        info!("Found {} text files", artifacts.len());

        let mut collection = SubtitleCollection::new();
        let mut skipped_files = 0;
        let mut unreadable_files = 0;

        for path in &artifacts {
            let filename = path.file_name().unwrap_or_default().to_string_lossy();

            let (start, end) = match timecode::parse_filename(&filename) {
                Ok(times) => times,
                Err(e) => {
                    warn!("Skipping file: {}", e);
                    skipped_files += 1;
                    continue;
                }
            };
            if end.is_before(&start) {
                debug!("{} ends before it starts", filename);
            }

            let raw_text = match tokio::fs::read_to_string(path).await {
                Ok(content) => content,
                Err(e) => {
                    warn!("Could not read {:?}: {}. Using placeholder text.", path, e);
                    unreadable_files += 1;
                    READ_ERROR_PLACEHOLDER.to_string()
                }
            };

            collection.push(start, end, clean_ocr_text(&raw_text));
        }

        let mut correction_warnings = Vec::new();
        if let Some(corrector) = corrector {
            if !collection.is_empty() {
                let report = corrector.correct(&collection.texts()).await;
                correction_warnings = report.warnings;
                collection.replace_texts(report.texts)?;
            }
        }

        info!("Writing subtitle file: {:?}", output_path);
        collection.write_to_srt(output_path)?;

        Ok(AssemblySummary {
            blocks_written: collection.len(),
            skipped_files,
            unreadable_files,
            correction_warnings,
            output_path: output_path.to_path_buf(),
        })
    }
}
