//! Metadata lookup through `yt-dlp --dump-json`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::config::ExtractorConfig;
use crate::core::error::{AppError, AppResult};
use crate::core::validation::{sanitize_title, ValidatedUrl};
use crate::extractor::errors::{classify_failure, stderr_excerpt};
use crate::extractor::{build_args, run_extractor, ExtractorMode};

const UNKNOWN: &str = "Unknown";

/// Normalized video metadata returned to the client.
///
/// Serialized as `{ title, author, duration, thumbnail, videoId }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    /// Sanitized, filesystem-safe title
    pub title: String,
    pub author: String,
    /// Whole seconds. yt-dlp may report fractional durations; they are rounded
    /// to the nearest second, and a missing or non-positive value becomes 0.
    #[serde(rename = "duration")]
    pub duration_seconds: u64,
    #[serde(rename = "thumbnail")]
    pub thumbnail_url: Option<String>,
    pub video_id: String,
}

/// The subset of yt-dlp's info dict we read. Everything is optional.
#[derive(Debug, Default, Deserialize)]
struct RawVideoInfo {
    title: Option<String>,
    uploader: Option<String>,
    channel: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
    id: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl From<RawVideoInfo> for VideoMetadata {
    fn from(info: RawVideoInfo) -> Self {
        let title = non_empty(info.title).unwrap_or_else(|| UNKNOWN.to_string());
        let duration_seconds = match info.duration {
            Some(secs) if secs.is_finite() && secs > 0.0 => secs.round() as u64,
            _ => 0,
        };

        Self {
            title: sanitize_title(&title),
            author: non_empty(info.uploader)
                .or_else(|| non_empty(info.channel))
                .unwrap_or_else(|| UNKNOWN.to_string()),
            duration_seconds,
            thumbnail_url: non_empty(info.thumbnail),
            video_id: info.id.unwrap_or_default(),
        }
    }
}

/// Parses the stdout of `yt-dlp --dump-json`.
///
/// # Errors
/// * `ExtractionFailure` - stdout is not a JSON object
pub fn parse_metadata(stdout: &[u8]) -> AppResult<VideoMetadata> {
    let info: RawVideoInfo = serde_json::from_slice(stdout).map_err(|e| {
        log::error!("Failed to parse yt-dlp JSON output: {}", e);
        AppError::ExtractionFailure(format!("invalid yt-dlp JSON output: {e}"))
    })?;
    Ok(info.into())
}

/// Fetches video metadata and titles via short-lived yt-dlp calls.
#[derive(Debug, Clone)]
pub struct MetadataFetcher {
    config: Arc<ExtractorConfig>,
}

impl MetadataFetcher {
    pub fn new(config: Arc<ExtractorConfig>) -> Self {
        Self { config }
    }

    /// Full metadata lookup (one `--dump-json` subprocess, metadata timeout applies).
    ///
    /// # Errors
    /// * `ContentUnavailable` / `AgeRestricted` - classified from stderr
    /// * `ExtractionTimeout` - yt-dlp did not finish in time
    /// * `ExtractionFailure` - anything else, including malformed JSON
    pub async fn fetch(&self, url: &ValidatedUrl) -> AppResult<VideoMetadata> {
        log::debug!("Fetching metadata for URL: {}", url);

        let args = build_args(&self.config, ExtractorMode::DumpJson, url.canonical());
        let output = run_extractor(&self.config, &args).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let err = classify_failure(&stderr);
            log::error!(
                "yt-dlp metadata failed for {} (exit code {:?}, {}): {}",
                url,
                output.status.code(),
                err.kind(),
                stderr_excerpt(&stderr)
            );
            return Err(err);
        }

        parse_metadata(&output.stdout)
    }

    /// Title-only probe (`--print %(title)s`), used to name the download.
    ///
    /// Returns the raw, unsanitized first line of output. Failures are not
    /// classified: every non-zero exit is an `ExtractionFailure`.
    pub async fn probe_title(&self, url: &ValidatedUrl) -> AppResult<String> {
        let args = build_args(&self.config, ExtractorMode::PrintTitle, url.canonical());
        let output = run_extractor(&self.config, &args).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::error!(
                "yt-dlp title probe failed for {} (exit code {:?}): {}",
                url,
                output.status.code(),
                stderr_excerpt(&stderr)
            );
            return Err(AppError::ExtractionFailure(stderr_excerpt(&stderr)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
    }
}
