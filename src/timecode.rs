/*!
 * Timecodes encoded in frame-capture filenames.
 *
 * Frame captures are named `<start>__<end>.<ext>` where each side is
 * `hours_minutes_seconds_milliseconds`, e.g. `00_01_02_500__00_01_04_000.png`.
 * The text artifacts derived from them keep the same stem, so the same parser
 * recovers the timing of a subtitle block from its artifact name.
 */

use std::fmt;
use std::path::Path;

use crate::errors::SubtitleError;

/// Separator between the start and end timecodes of a filename
pub const TIMECODE_SEPARATOR: &str = "__";

/// Separator between the segments of one timecode
const SEGMENT_SEPARATOR: char = '_';

/// Arrow separating start and end on an SRT timing line
pub const SRT_ARROW: &str = " --> ";

/// A point in time parsed from a filename
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timecode {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub milliseconds: u32,
}

impl Timecode {
    pub fn new(hours: u32, minutes: u32, seconds: u32, milliseconds: u32) -> Self {
        Self { hours, minutes, seconds, milliseconds }
    }

    /// Render as an SRT timestamp (`HH:MM:SS,mmm`)
    pub fn format(&self) -> String {
        format!(
            "{:02}:{:02}:{:02},{:03}",
            self.hours, self.minutes, self.seconds, self.milliseconds
        )
    }

    /// Total milliseconds. Segments are not range checked, so `00_75_00_000`
    /// is 75 minutes.
    pub fn to_millis(&self) -> u64 {
        u64::from(self.hours) * 3_600_000
            + u64::from(self.minutes) * 60_000
            + u64::from(self.seconds) * 1_000
            + u64::from(self.milliseconds)
    }

    /// Whether this instant comes strictly before `other`, by total duration
    pub fn is_before(&self, other: &Timecode) -> bool {
        self.to_millis() < other.to_millis()
    }

    /// Parse one `HH_MM_SS_mmm` token
    fn parse_token(filename: &str, token: &str) -> Result<Self, SubtitleError> {
        let segments: Vec<&str> = token.split(SEGMENT_SEPARATOR).collect();
        Self::from_segments(filename, token, &segments)
    }

    fn from_segments(filename: &str, token: &str, segments: &[&str]) -> Result<Self, SubtitleError> {
        if segments.len() != 4 {
            return Err(invalid(
                filename,
                format!("timecode '{}' has {} segments, expected 4", token, segments.len()),
            ));
        }

        let mut values = [0u32; 4];
        for (value, segment) in values.iter_mut().zip(segments) {
            if segment.is_empty() || !segment.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid(
                    filename,
                    format!("timecode '{}' has non-numeric segment '{}'", token, segment),
                ));
            }
            *value = segment.parse().map_err(|e| {
                invalid(filename, format!("timecode '{}' segment '{}': {}", token, segment, e))
            })?;
        }

        Ok(Self::new(values[0], values[1], values[2], values[3]))
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

fn invalid(filename: &str, reason: String) -> SubtitleError {
    SubtitleError::InvalidFilenameFormat {
        filename: filename.to_string(),
        reason,
    }
}

/// Parse the start and end timecodes out of a capture or artifact filename.
///
/// Only the double-underscore separator is accepted. When the end token
/// carries a trailing qualifier (a fifth segment, as produced by some frame
/// extractors for duplicate timings) that last segment is dropped once
/// before parsing.
pub fn parse_filename(filename: &str) -> Result<(Timecode, Timecode), SubtitleError> {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let tokens: Vec<&str> = stem.split(TIMECODE_SEPARATOR).collect();
    if tokens.len() != 2 {
        return Err(invalid(
            filename,
            format!("expected exactly one '{}' separator", TIMECODE_SEPARATOR),
        ));
    }

    let start = Timecode::parse_token(filename, tokens[0])?;

    let mut end_segments: Vec<&str> = tokens[1].split(SEGMENT_SEPARATOR).collect();
    if end_segments.len() > 4 {
        end_segments.pop();
    }
    let end = Timecode::from_segments(filename, tokens[1], &end_segments)?;

    Ok((start, end))
}

/// The timing line of an SRT block
pub fn timing_line(start: &Timecode, end: &Timecode) -> String {
    format!("{}{}{}", start.format(), SRT_ARROW, end.format())
}
