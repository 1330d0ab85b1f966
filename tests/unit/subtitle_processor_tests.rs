/*!
 * Tests for text cleaning and SRT rendering
 */

use anyhow::Result;
use ocrsrt::subtitle_processor::{clean_ocr_text, SubtitleBlock, SubtitleCollection};
use ocrsrt::timecode::Timecode;
use crate::common;

#[test]
fn test_clean_ocr_text_withSingleLine_shouldReturnTrimmed() {
    assert_eq!(clean_ocr_text("  Hello  "), "Hello");
}

#[test]
fn test_clean_ocr_text_withTwoLines_shouldKeepBoth() {
    assert_eq!(clean_ocr_text("Title\nHello"), "Title\nHello");
    assert_eq!(clean_ocr_text(" Title\nHello "), "Title\nHello");
}

#[test]
fn test_clean_ocr_text_withTrailingNewline_shouldCountItAsLine() {
    assert_eq!(clean_ocr_text("Title\nHello\n"), "");
}

#[test]
fn test_clean_ocr_text_withHeaderLines_shouldDropFirstTwo() {
    let raw = "________________\n\nHello there\nGeneral Kenobi\n";
    assert_eq!(clean_ocr_text(raw), "Hello there\nGeneral Kenobi");
}

#[test]
fn test_clean_ocr_text_withThreeLines_shouldKeepOnlyThird() {
    assert_eq!(clean_ocr_text("one\ntwo\nthree"), "three");
}

#[test]
fn test_clean_ocr_text_withOnlyHeader_shouldReturnEmpty() {
    assert_eq!(clean_ocr_text("header\n\n\n"), "");
}

#[test]
fn test_clean_ocr_text_withEmptyInput_shouldReturnEmpty() {
    assert_eq!(clean_ocr_text(""), "");
}

#[test]
fn test_subtitle_block_display_shouldRenderSrtEntry() {
    let block = SubtitleBlock::new(
        1,
        Timecode::new(0, 0, 1, 0),
        Timecode::new(0, 0, 3, 500),
        "Hello".to_string(),
    );
    assert_eq!(block.to_string(), "1\n00:00:01,000 --> 00:00:03,500\nHello\n\n");
}

#[test]
fn test_subtitle_block_display_withMultilineText_shouldKeepLines() {
    let block = SubtitleBlock::new(
        2,
        Timecode::new(0, 0, 4, 0),
        Timecode::new(0, 0, 6, 0),
        "Line one\nLine two".to_string(),
    );
    assert_eq!(block.to_string(), "2\n00:00:04,000 --> 00:00:06,000\nLine one\nLine two\n\n");
}

#[test]
fn test_collection_to_srt_string_shouldConcatenateBlocks() {
    let mut collection = SubtitleCollection::new();
    collection.push(Timecode::new(0, 0, 1, 0), Timecode::new(0, 0, 2, 0), "A".to_string());
    collection.push(Timecode::new(0, 0, 3, 0), Timecode::new(0, 0, 4, 0), String::new());

    let expected = "1\n00:00:01,000 --> 00:00:02,000\nA\n\n2\n00:00:03,000 --> 00:00:04,000\n...\n\n";
    assert_eq!(collection.to_srt_string(), expected);
}

#[test]
fn test_collection_write_to_srt_withMissingParent_shouldCreateIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let output = temp_dir.path().join("nested").join("out.srt");

    let mut collection = SubtitleCollection::new();
    collection.push(Timecode::new(0, 0, 1, 0), Timecode::new(0, 0, 2, 0), "A".to_string());
    collection.write_to_srt(&output)?;

    assert_eq!(std::fs::read_to_string(&output)?, collection.to_srt_string());
    Ok(())
}

#[test]
fn test_collection_write_to_srt_withDirectoryAsOutput_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;

    let mut collection = SubtitleCollection::new();
    collection.push(Timecode::new(0, 0, 1, 0), Timecode::new(0, 0, 2, 0), "A".to_string());

    assert!(collection.write_to_srt(temp_dir.path()).is_err());
    Ok(())
}
