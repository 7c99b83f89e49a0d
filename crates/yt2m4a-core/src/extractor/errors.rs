//! Classification of yt-dlp failures
//!
//! yt-dlp reports problems as human-readable text on stderr, so the metadata path
//! classifies them by substring. Matching is case-sensitive and tied to yt-dlp's
//! current wording.

use crate::core::error::AppError;

/// Longest stderr excerpt carried inside an error
const STDERR_EXCERPT_CHARS: usize = 500;

/// yt-dlp failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorErrorType {
    /// Private, removed, or otherwise unavailable video
    PrivateOrUnavailable,
    /// Age-gated video
    AgeRestricted,
    /// Anything else
    Unknown,
}

/// Determines the failure category from yt-dlp's stderr.
///
/// - `"Private video"` or `"unavailable"` → `PrivateOrUnavailable`
/// - `"age"` → `AgeRestricted`
/// - otherwise `Unknown`
pub fn analyze_extractor_error(stderr: &str) -> ExtractorErrorType {
    if stderr.contains("Private video") || stderr.contains("unavailable") {
        return ExtractorErrorType::PrivateOrUnavailable;
    }

    if stderr.contains("age") {
        return ExtractorErrorType::AgeRestricted;
    }

    ExtractorErrorType::Unknown
}

/// Converts a failed yt-dlp run into the matching `AppError`.
pub fn classify_failure(stderr: &str) -> AppError {
    let excerpt = stderr_excerpt(stderr);
    match analyze_extractor_error(stderr) {
        ExtractorErrorType::PrivateOrUnavailable => AppError::ContentUnavailable(excerpt),
        ExtractorErrorType::AgeRestricted => AppError::AgeRestricted(excerpt),
        ExtractorErrorType::Unknown => AppError::ExtractionFailure(excerpt),
    }
}

/// First few hundred characters of stderr, trimmed, safe on char boundaries.
pub fn stderr_excerpt(stderr: &str) -> String {
    let trimmed = stderr.trim();
    match trimmed.char_indices().nth(STDERR_EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
