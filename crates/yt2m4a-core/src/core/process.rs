//! Process execution utilities with timeout support
//!
//! Short-lived yt-dlp calls (metadata dump, title probe) run through
//! [`run_with_timeout`] so a hung extractor cannot hold a request forever.

use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

use crate::core::error::AppError;

/// Run an async Command with a timeout.
///
/// The child is killed when the timeout fires (`kill_on_drop`), so no process
/// outlives the call. Returns `ExtractionTimeout` on timeout and `Io` when the
/// process cannot be started.
pub async fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<Output, AppError> {
    cmd.kill_on_drop(true);
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(AppError::Io(e)),
        Err(_) => Err(AppError::ExtractionTimeout(timeout)),
    }
}
