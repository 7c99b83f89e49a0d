use std::env;
use std::time::Duration;

use crate::core::error::{AppError, AppResult};

/// Extractor (yt-dlp) configuration constants
pub mod ytdlp {
    use super::Duration;

    /// Binary used when YTDLP_PATH is not set, resolved via PATH
    pub const DEFAULT_BIN: &str = "yt-dlp";

    /// Value for `--extractor-args youtube:player_client=...`
    pub const DEFAULT_PLAYER_CLIENT: &str = "default";

    /// Hard timeout for the metadata dump and the title probe (in seconds)
    pub const METADATA_TIMEOUT_SECS: u64 = 30;

    /// How long a cancelled relay process gets between SIGTERM and SIGKILL (in seconds)
    pub const TERMINATE_GRACE_SECS: u64 = 5;

    /// Metadata timeout duration
    pub fn metadata_timeout() -> Duration {
        Duration::from_secs(METADATA_TIMEOUT_SECS)
    }

    /// Terminate grace duration
    pub fn terminate_grace() -> Duration {
        Duration::from_secs(TERMINATE_GRACE_SECS)
    }
}

/// HTTP server configuration constants
pub mod server {
    use super::Duration;

    pub const DEFAULT_HOST: &str = "0.0.0.0";

    pub const DEFAULT_PORT: u16 = 3000;

    /// Upper bound for producing a response (in seconds).
    /// Streaming bodies are not cut by this; long videos still need headroom.
    pub const REQUEST_TIMEOUT_SECS: u64 = 300;

    /// Request timeout duration
    pub fn request_timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

/// Settings for every yt-dlp invocation.
///
/// Read once at startup and shared (`Arc`) by the metadata fetcher and the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorConfig {
    /// Path or bare command name of the yt-dlp executable
    pub bin: String,
    /// YouTube player client passed through `--extractor-args`
    pub player_client: String,
    /// Timeout for `--dump-json` and `--print` calls
    pub metadata_timeout: Duration,
    /// SIGTERM → SIGKILL grace period for cancelled streams
    pub terminate_grace: Duration,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            bin: ytdlp::DEFAULT_BIN.to_string(),
            player_client: ytdlp::DEFAULT_PLAYER_CLIENT.to_string(),
            metadata_timeout: ytdlp::metadata_timeout(),
            terminate_grace: ytdlp::terminate_grace(),
        }
    }
}

impl ExtractorConfig {
    /// Default settings with a specific executable.
    pub fn with_bin(bin: impl Into<String>) -> Self {
        Self {
            bin: bin.into(),
            ..Self::default()
        }
    }
}

/// Bind address and request limits for the web server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout: Duration,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: server::DEFAULT_HOST.to_string(),
            port: server::DEFAULT_PORT,
            request_timeout: server::request_timeout(),
        }
    }
}

impl WebConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Process-wide configuration, built from the environment.
///
/// | Variable | Default |
/// |---|---|
/// | `YTDLP_PATH` | `yt-dlp` |
/// | `YTDLP_PLAYER_CLIENT` | `default` |
/// | `METADATA_TIMEOUT_SECS` | `30` |
/// | `WEB_HOST` | `0.0.0.0` |
/// | `WEB_PORT` | `3000` |
/// | `REQUEST_TIMEOUT_SECS` | `300` |
/// | `LOG_FILE_PATH` | unset |
///
/// Empty values count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub extractor: ExtractorConfig,
    pub web: WebConfig,
    pub log_file_path: Option<String>,
}

impl Config {
    /// Reads the process environment.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let extractor = ExtractorConfig {
            bin: get("YTDLP_PATH").unwrap_or_else(|| ytdlp::DEFAULT_BIN.to_string()),
            player_client: get("YTDLP_PLAYER_CLIENT").unwrap_or_else(|| ytdlp::DEFAULT_PLAYER_CLIENT.to_string()),
            metadata_timeout: parse_secs("METADATA_TIMEOUT_SECS", get("METADATA_TIMEOUT_SECS"), ytdlp::METADATA_TIMEOUT_SECS)?,
            terminate_grace: ytdlp::terminate_grace(),
        };

        let port = match get("WEB_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| AppError::Config(format!("WEB_PORT={raw}: {e}")))?,
            None => server::DEFAULT_PORT,
        };

        let web = WebConfig {
            host: get("WEB_HOST").unwrap_or_else(|| server::DEFAULT_HOST.to_string()),
            port,
            request_timeout: parse_secs("REQUEST_TIMEOUT_SECS", get("REQUEST_TIMEOUT_SECS"), server::REQUEST_TIMEOUT_SECS)?,
        };

        Ok(Self {
            extractor,
            web,
            log_file_path: get("LOG_FILE_PATH"),
        })
    }
}

fn parse_secs(key: &str, raw: Option<String>, default: u64) -> AppResult<Duration> {
    let Some(raw) = raw else {
        return Ok(Duration::from_secs(default));
    };
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(AppError::Config(format!("{key} must be greater than zero"))),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(AppError::Config(format!("{key}={raw}: {e}"))),
    }
}
