//! Logging initialization and startup diagnostics
//!
//! This module provides:
//! - Logger initialization (console + optional file)
//! - Extractor configuration logging at startup

use anyhow::Result;
use simplelog::*;
use std::fs::File;

use crate::core::config::ExtractorConfig;

/// Initialize the global logger.
///
/// Always logs to the terminal; when `log_file_path` is set, the same records are
/// also written to that file.
///
/// # Returns
/// * `Err(anyhow::Error)` - the log file could not be created or a logger is already set
pub fn init_logger(level: LevelFilter, log_file_path: Option<&str>) -> Result<()> {
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];

    if let Some(path) = log_file_path {
        let log_file = File::create(path).map_err(|e| anyhow::anyhow!("Failed to create log file {}: {}", path, e))?;
        loggers.push(WriteLogger::new(level, Config::default(), log_file));
    }

    CombinedLogger::init(loggers).map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the extractor configuration at application startup.
///
/// Warns when the binary is a bare name that cannot be found on PATH; the server
/// still starts, and every request will then fail with an extraction error.
pub fn log_extractor_configuration(config: &ExtractorConfig) {
    log::info!("yt-dlp binary: {}", config.bin);
    log::info!("yt-dlp player client: {}", config.player_client);
    log::info!("Metadata timeout: {}s", config.metadata_timeout.as_secs());

    match resolve_on_path(&config.bin) {
        Some(path) => log::info!("yt-dlp resolved to {}", path.display()),
        None => log::warn!("yt-dlp binary '{}' was not found; downloads will fail", config.bin),
    }
}

/// Resolves a command the way a shell would: paths are checked as-is, bare names
/// are looked up in each PATH entry.
fn resolve_on_path(bin: &str) -> Option<std::path::PathBuf> {
    let candidate = std::path::Path::new(bin);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(bin))
        .find(|full| full.is_file())
}
