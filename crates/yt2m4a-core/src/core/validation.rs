//! URL validation and title sanitization
//!
//! Provides the request-entry checks:
//! - YouTube URL validation against a fixed whitelist of link shapes
//! - Canonicalization to a single-video URL (playlist and tracking params dropped)
//! - Title sanitization for download filenames

use std::borrow::Cow;
use std::fmt;

use lazy_regex::regex_is_match;
use url::Url;

use crate::core::error::{AppError, AppResult};

/// Characters that are illegal in filenames on at least one common filesystem.
const FORBIDDEN_TITLE_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Checks a candidate string against the accepted YouTube link shapes.
///
/// Accepted (scheme and `www.` optional, paths case-sensitive):
/// - `youtube.com/watch?v=<id>`
/// - `youtu.be/<id>`
/// - `youtube.com/shorts/<id>`
/// - `music.youtube.com/watch?v=<id>`
///
/// # Examples
/// ```
/// use yt2m4a_core::validate;
///
/// assert!(validate("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
/// assert!(validate("youtu.be/dQw4w9WgXcQ"));
/// assert!(!validate("https://vimeo.com/12345"));
/// ```
pub fn validate(candidate: &str) -> bool {
    let candidate = candidate.trim();

    regex_is_match!(r"^(https?://)?(www\.)?youtube\.com/watch\?v=[A-Za-z0-9_-]+", candidate)
        || regex_is_match!(r"^(https?://)?(www\.)?youtu\.be/[A-Za-z0-9_-]+", candidate)
        || regex_is_match!(r"^(https?://)?(www\.)?youtube\.com/shorts/[A-Za-z0-9_-]+", candidate)
        || regex_is_match!(r"^(https?://)?music\.youtube\.com/watch\?v=[A-Za-z0-9_-]+", candidate)
}

/// Reduces a YouTube link to its single-video form.
///
/// - a `v` query parameter wins: `https://www.youtube.com/watch?v=<id>`
/// - `youtu.be` links keep only their path: `https://youtu.be/<id>`
/// - shorts keep only the id segment: `https://www.youtube.com/shorts/<id>`
///
/// Anything else, including unparseable input, is returned unchanged so that
/// yt-dlp gets to report the problem.
///
/// # Examples
/// ```
/// use yt2m4a_core::canonicalize;
///
/// assert_eq!(
///     canonicalize("https://youtube.com/watch?v=abc123&list=XYZ&index=3"),
///     "https://www.youtube.com/watch?v=abc123"
/// );
/// assert_eq!(canonicalize("https://youtu.be/abc123?si=track"), "https://youtu.be/abc123");
/// ```
pub fn canonicalize(candidate: &str) -> String {
    let with_scheme: Cow<'_, str> = if candidate.contains("://") {
        Cow::Borrowed(candidate)
    } else {
        Cow::Owned(format!("https://{candidate}"))
    };

    let Ok(parsed) = Url::parse(&with_scheme) else {
        return candidate.to_string();
    };

    if let Some((_, video_id)) = parsed.query_pairs().find(|(key, _)| key == "v") {
        // `v` arrives percent-decoded; only the id characters may reach the output.
        let video_id = leading_video_id(&video_id);
        if !video_id.is_empty() {
            return format!("https://www.youtube.com/watch?v={video_id}");
        }
    }

    if matches!(parsed.host_str(), Some("youtu.be" | "www.youtu.be")) {
        return format!("https://youtu.be{}", parsed.path());
    }

    if let Some((_, rest)) = parsed.path().split_once("/shorts/") {
        let short_id = rest.split('/').next().unwrap_or_default();
        return format!("https://www.youtube.com/shorts/{short_id}");
    }

    candidate.to_string()
}

/// The leading `[A-Za-z0-9_-]` run of a decoded `v` value.
fn leading_video_id(value: &str) -> &str {
    let end = value
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(value.len());
    &value[..end]
}

/// Strips filesystem-unsafe characters and collapses whitespace.
///
/// # Examples
/// ```
/// use yt2m4a_core::sanitize_title;
///
/// assert_eq!(sanitize_title(r#"My "Video": Title?"#), "My Video Title");
/// assert_eq!(sanitize_title("  AC/DC  -  Thunderstruck "), "ACDC - Thunderstruck");
/// ```
pub fn sanitize_title(title: &str) -> String {
    let stripped: String = title.chars().filter(|c| !FORBIDDEN_TITLE_CHARS.contains(c)).collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A link that passed [`validate`], together with its canonical form.
///
/// Request-scoped; built once by the handler and handed to the fetcher or relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUrl {
    raw: String,
    canonical: String,
}

impl ValidatedUrl {
    /// Validates and canonicalizes user input.
    ///
    /// # Errors
    /// * `InvalidInput("URL is required")` - blank input
    /// * `InvalidInput("Invalid YouTube URL")` - not an accepted link shape
    pub fn parse(candidate: &str) -> AppResult<Self> {
        let raw = candidate.trim();
        if raw.is_empty() {
            return Err(AppError::InvalidInput("URL is required".to_string()));
        }
        if !validate(raw) {
            return Err(AppError::InvalidInput("Invalid YouTube URL".to_string()));
        }

        Ok(Self {
            raw: raw.to_string(),
            canonical: canonicalize(raw),
        })
    }

    /// The trimmed user input
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The single-video URL handed to yt-dlp
    pub fn canonical(&self) -> &str {
        &self.canonical
    }
}

impl fmt::Display for ValidatedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}
