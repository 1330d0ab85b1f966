/*!
 * Line-index marker protocol for batch correction.
 *
 * Every text of a batch is sent as `LINE <n>: <text>` (n is the 0-based
 * position in the batch) and the service is asked to answer with the same
 * markers. Decoding maps the answer back onto batch positions.
 */

use once_cell::sync::Lazy;
use regex::Regex;

/// Marker keyword
pub const LINE_MARKER: &str = "LINE";

// @const: Marker line regex; also accepts the accented form older prompts used
static MARKER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:LINE|L[IÍ]NEA)\s+(\d+)\s*:\s?(.*)$").unwrap()
});

/// Render a batch with one marker per text
pub fn encode_batch(texts: &[String]) -> String {
    let mut encoded = String::new();
    for (index, text) in texts.iter().enumerate() {
        encoded.push_str(&format!("{} {}: {}\n", LINE_MARKER, index, text));
    }
    encoded
}

/// Fill the prompt template.
///
/// Placeholders: `{language}`, `{count}`, `{lines}`. If the template has no
/// `{lines}` placeholder the encoded batch is appended at the end.
pub fn build_prompt(template: &str, language: &str, texts: &[String]) -> String {
    let lines = encode_batch(texts);
    let prompt = template
        .replace("{language}", language)
        .replace("{count}", &texts.len().to_string());

    if prompt.contains("{lines}") {
        prompt.replace("{lines}", &lines)
    } else {
        format!("{}\n\n{}", prompt.trim_end(), lines)
    }
}

/// Parse a marked response back into the order of `batch`.
///
/// Lines without a marker continue the previous entry, but only up to the
/// number of lines the submitted text at that index had; anything past that
/// (closing remarks, notes) is dropped, as are code fences and text before
/// the first marker. When the number of marked entries equals the batch
/// length, each entry lands at its marker index and positions no marker
/// claimed stay blank. Otherwise the marked entries are returned in response
/// order, so the length tells the caller the response is misaligned.
pub fn decode_response(raw: &str, batch: &[String]) -> Vec<String> {
    let expected = batch.len();
    let mut entries: Vec<(usize, String)> = Vec::new();

    for line in raw.lines() {
        if let Some(caps) = MARKER_REGEX.captures(line) {
            // Absurdly large indexes are kept as out of range
            let index = caps[1].parse::<usize>().unwrap_or(usize::MAX);
            entries.push((index, caps[2].trim().to_string()));
            continue;
        }

        let line = line.trim();
        if line.is_empty() || line.starts_with(CODE_FENCE) {
            continue;
        }
        if let Some((index, text)) = entries.last_mut() {
            if line_count(text) < submitted_line_count(batch, *index) {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(line);
            }
        }
    }

    if entries.len() != expected {
        return entries.into_iter().map(|(_, text)| text).collect();
    }

    let mut slots = vec![String::new(); expected];
    let mut claimed = vec![false; expected];
    for (index, text) in entries {
        if index < expected && !claimed[index] {
            claimed[index] = true;
            slots[index] = text;
        }
    }
    slots
}

/// Markdown fence models like to wrap lists in
const CODE_FENCE: &str = "```";

fn line_count(text: &str) -> usize {
    text.lines().filter(|line| !line.trim().is_empty()).count()
}

/// Lines the text at `index` was sent with; unknown indexes get one
fn submitted_line_count(batch: &[String], index: usize) -> usize {
    batch.get(index).map(|text| line_count(text)).unwrap_or(0).max(1)
}
