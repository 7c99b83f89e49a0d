//! yt-dlp invocation layer.
//!
//! yt-dlp is run in three modes, all with `--no-playlist` and the configured
//! player client:
//! - [`ExtractorMode::DumpJson`]: one JSON document describing the video
//! - [`ExtractorMode::PrintTitle`]: just the `%(title)s` template
//! - [`ExtractorMode::StreamAudio`]: best audio (M4A preferred) written to stdout
//!
//! The first two are short-lived and bounded by the metadata timeout; the last one
//! is long-lived and owned by [`relay::AudioRelay`].

pub mod errors;
pub mod filename;
pub mod metadata;
pub mod relay;

use std::process::Output;

use tokio::process::Command;

use crate::core::config::ExtractorConfig;
use crate::core::error::{AppError, AppResult};
use crate::core::process::run_with_timeout;

/// Format selector: best audio-only stream in an M4A container, else best audio in any container.
pub const AUDIO_FORMAT: &str = "bestaudio[ext=m4a]/bestaudio";

/// Output template for the title probe
pub const TITLE_TEMPLATE: &str = "%(title)s";

/// Which yt-dlp invocation to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorMode {
    DumpJson,
    PrintTitle,
    StreamAudio,
}

/// Build the yt-dlp argument list for `mode`, ending with the target URL.
pub fn build_args(config: &ExtractorConfig, mode: ExtractorMode, url: &str) -> Vec<String> {
    let mut args = vec!["--no-playlist".to_string()];

    if mode == ExtractorMode::StreamAudio {
        args.push("-f".to_string());
        args.push(AUDIO_FORMAT.to_string());
    }

    args.push("--extractor-args".to_string());
    args.push(format!("youtube:player_client={}", config.player_client));

    match mode {
        ExtractorMode::DumpJson => args.push("--dump-json".to_string()),
        ExtractorMode::PrintTitle => {
            args.push("--print".to_string());
            args.push(TITLE_TEMPLATE.to_string());
        }
        ExtractorMode::StreamAudio => {
            // "-" makes yt-dlp write the media bytes to stdout instead of a file
            args.push("-o".to_string());
            args.push("-".to_string());
        }
    }

    args.push(url.to_string());
    args
}

/// Runs a short-lived yt-dlp call under the metadata timeout.
///
/// Spawn failures become `ExtractionFailure` so the caller sees one error family
/// for "yt-dlp did not give us an answer".
pub(crate) async fn run_extractor(config: &ExtractorConfig, args: &[String]) -> AppResult<Output> {
    log::debug!("yt-dlp command: {} {}", config.bin, args.join(" "));

    let mut cmd = Command::new(&config.bin);
    cmd.args(args);

    run_with_timeout(&mut cmd, config.metadata_timeout)
        .await
        .map_err(|e| match e {
            AppError::Io(io) => {
                log::error!("Failed to execute {}: {}", config.bin, io);
                AppError::ExtractionFailure(format!("failed to execute {}: {}", config.bin, io))
            }
            AppError::ExtractionTimeout(after) => {
                log::error!("yt-dlp command timed out after {} seconds", after.as_secs());
                AppError::ExtractionTimeout(after)
            }
            other => other,
        })
}

/// Returns the output of `yt-dlp --version`.
pub async fn extractor_version(config: &ExtractorConfig) -> AppResult<String> {
    let output = run_extractor(config, &["--version".to_string()]).await?;

    let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if !output.status.success() || version.is_empty() {
        return Err(AppError::ExtractionFailure(format!(
            "{} --version produced no output",
            config.bin
        )));
    }

    Ok(version)
}
