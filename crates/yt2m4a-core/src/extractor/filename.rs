//! Download filename and `Content-Disposition` construction.

use crate::core::validation::sanitize_title;

/// Used when the title probe yields nothing printable
pub const FALLBACK_TITLE: &str = "audio";

/// Extension of the relayed file (container preferred by the format selector)
pub const AUDIO_EXTENSION: &str = "m4a";

/// `<sanitized title>.m4a`, or `audio.m4a` when the title sanitizes to nothing.
pub fn download_filename(raw_title: &str) -> String {
    let title = sanitize_title(raw_title);
    let title = if title.is_empty() { FALLBACK_TITLE } else { title.as_str() };
    format!("{title}.{AUDIO_EXTENSION}")
}

/// Percent-encodes a filename for both the plain and the RFC 5987 parameter.
///
/// Everything outside `A-Z a-z 0-9 - _ . ~` is encoded, which also covers
/// `'`, `(` and `)`.
pub fn encode_filename(filename: &str) -> String {
    urlencoding::encode(filename).into_owned()
}

/// `attachment; filename="<enc>"; filename*=UTF-8''<enc>`
pub fn content_disposition(filename: &str) -> String {
    let encoded = encode_filename(filename);
    format!("attachment; filename=\"{encoded}\"; filename*=UTF-8''{encoded}")
}
