use std::time::Duration;
use thiserror::Error;

/// Centralized error types for the application
///
/// Every failure in the request pipeline is converted to this enum. HTTP handlers map it
/// to a status code with [`AppError::status_code`] and a client-safe text with
/// [`AppError::client_message`]; the `Display` output is for logs only and may contain
/// extractor diagnostics.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or malformed URL
    #[error("{0}")]
    InvalidInput(String),

    /// Private or removed video (carries the extractor's stderr excerpt)
    #[error("Video is private or unavailable: {0}")]
    ContentUnavailable(String),

    /// Age-gated video (carries the extractor's stderr excerpt)
    #[error("Video is age-restricted: {0}")]
    AgeRestricted(String),

    /// Metadata or title probe exceeded its hard timeout
    #[error("yt-dlp timed out after {0:?}")]
    ExtractionTimeout(Duration),

    /// Non-zero exit, spawn failure, or unparseable output
    #[error("Extraction failed: {0}")]
    ExtractionFailure(String),

    /// The client went away mid-stream; logged, never reported
    #[error("Stream terminated by client")]
    StreamTerminated,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid startup configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::InvalidInput(_) | AppError::ContentUnavailable(_) | AppError::AgeRestricted(_) => 400,
            AppError::ExtractionTimeout(_)
            | AppError::ExtractionFailure(_)
            | AppError::StreamTerminated
            | AppError::Io(_)
            | AppError::Config(_) => 500,
        }
    }

    /// Text that may be shown to the client. Unclassified failures get `fallback`
    /// so extractor diagnostics never leak.
    pub fn client_message(&self, fallback: &str) -> String {
        match self {
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::ContentUnavailable(_) => "This video is private or unavailable".to_string(),
            AppError::AgeRestricted(_) => "This video is age-restricted".to_string(),
            _ => fallback.to_string(),
        }
    }

    /// Short category for log lines
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "invalid_input",
            AppError::ContentUnavailable(_) => "content_unavailable",
            AppError::AgeRestricted(_) => "age_restricted",
            AppError::ExtractionTimeout(_) => "extraction_timeout",
            AppError::ExtractionFailure(_) => "extraction_failure",
            AppError::StreamTerminated => "stream_terminated",
            AppError::Io(_) => "io",
            AppError::Config(_) => "config",
        }
    }
}
