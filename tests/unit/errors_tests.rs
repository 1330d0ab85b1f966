/*!
 * Tests for error display and conversions
 */

use ocrsrt::errors::{ExtractionError, ProviderError, SubtitleError};
use std::path::PathBuf;

#[test]
fn test_from_status_shouldMapKnownStatuses() {
    assert!(matches!(ProviderError::from_status(401, "no"), ProviderError::AuthenticationError(_)));
    assert!(matches!(ProviderError::from_status(403, "no"), ProviderError::AuthenticationError(_)));
    assert!(matches!(ProviderError::from_status(429, "slow"), ProviderError::RateLimitExceeded(_)));
    assert!(matches!(
        ProviderError::from_status(500, "boom"),
        ProviderError::ApiError { status_code: 500, .. }
    ));
}

#[test]
fn test_provider_error_display_shouldIncludeDetails() {
    let error = ProviderError::from_status(503, "unavailable");
    assert_eq!(error.to_string(), "API responded with error: 503 - unavailable");
}

#[test]
fn test_subtitle_error_display_shouldNameFilename() {
    let error = SubtitleError::InvalidFilenameFormat {
        filename: "garbage.txt".to_string(),
        reason: "missing separator".to_string(),
    };
    let message = error.to_string();
    assert!(message.contains("garbage.txt"));
    assert!(message.contains("missing separator"));
}

#[test]
fn test_extraction_error_fromProvider_shouldWrap() {
    let error: ExtractionError = ProviderError::ConnectionError("reset".to_string()).into();
    assert!(matches!(error, ExtractionError::Provider(_)));
    assert!(error.to_string().contains("reset"));
}

#[test]
fn test_extraction_error_imageRead_shouldIncludePath() {
    let error = ExtractionError::ImageRead {
        path: PathBuf::from("RGBImages/a.png"),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
    };
    assert!(error.to_string().contains("a.png"));
}
