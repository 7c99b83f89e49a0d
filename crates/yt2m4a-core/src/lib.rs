//! yt2m4a core - turns a YouTube link into a streamed M4A download
//!
//! This library holds everything below the HTTP layer: URL validation,
//! yt-dlp metadata lookup, and the stdout-to-body audio relay.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, process helpers, URL validation
//! - `extractor`: yt-dlp invocation (metadata fetcher, audio stream relay)

pub mod core;
pub mod extractor;

// Re-export commonly used types for convenience
pub use core::config::{Config, ExtractorConfig, WebConfig};
pub use core::error::{AppError, AppResult};
pub use core::validation::{canonicalize, sanitize_title, validate, ValidatedUrl};
pub use extractor::metadata::{MetadataFetcher, VideoMetadata};
pub use extractor::relay::{AudioDownload, AudioRelay, RelayOutcome, RelayPhase, RelayStream};
