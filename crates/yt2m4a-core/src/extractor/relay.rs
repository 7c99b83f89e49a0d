//! Audio stream relay: yt-dlp stdout → HTTP response body.
//!
//! One request owns exactly one long-lived yt-dlp process. Its stdout is exposed as
//! a [`RelayStream`] that is read only when the consumer polls it, so the HTTP
//! layer's flow control reaches all the way back to the pipe. Three pieces run
//! side by side:
//!
//! - the body stream (stdout chunks in arrival order)
//! - a stderr task that logs non-routine diagnostic lines
//! - a supervisor task that owns the `Child`, waits for it, and terminates it when
//!   the body is dropped before EOF (client disconnect)
//!
//! Errors that happen after the first byte cannot reach the client; they show up as
//! a truncated file and in the logs.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures_util::Stream;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::oneshot;
use tokio_util::io::ReaderStream;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::core::config::ExtractorConfig;
use crate::core::error::{AppError, AppResult};
use crate::core::validation::ValidatedUrl;
use crate::extractor::filename::download_filename;
use crate::extractor::metadata::MetadataFetcher;
use crate::extractor::{build_args, ExtractorMode};

// ============================================================================
// Lifecycle
// ============================================================================

/// Phase of a single relay request.
///
/// `Idle → Validating → TitleProbe → Streaming → {Completed | Failed | Cancelled}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayPhase {
    Idle,
    Validating,
    TitleProbe,
    Streaming,
    Completed,
    Failed,
    Cancelled,
}

impl RelayPhase {
    /// Whether `self → next` is an edge of the lifecycle graph.
    pub fn can_advance_to(self, next: RelayPhase) -> bool {
        use RelayPhase::*;
        matches!(
            (self, next),
            (Idle, Validating)
                | (Validating, TitleProbe)
                | (Validating, Failed)
                | (TitleProbe, Streaming)
                | (TitleProbe, Failed)
                | (Streaming, Completed)
                | (Streaming, Failed)
                | (Streaming, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RelayPhase::Completed | RelayPhase::Failed | RelayPhase::Cancelled)
    }
}

impl fmt::Display for RelayPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelayPhase::Idle => "idle",
            RelayPhase::Validating => "validating",
            RelayPhase::TitleProbe => "title_probe",
            RelayPhase::Streaming => "streaming",
            RelayPhase::Completed => "completed",
            RelayPhase::Failed => "failed",
            RelayPhase::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Tracks and logs the phase of one relay request.
#[derive(Debug)]
struct RelayLifecycle {
    phase: RelayPhase,
    label: String,
}

impl RelayLifecycle {
    fn new(label: impl Into<String>) -> Self {
        Self {
            phase: RelayPhase::Idle,
            label: label.into(),
        }
    }

    fn phase(&self) -> RelayPhase {
        self.phase
    }

    fn advance(&mut self, next: RelayPhase) {
        if self.phase.can_advance_to(next) {
            log::debug!("relay {}: {} -> {}", self.label, self.phase, next);
            self.phase = next;
        } else {
            log::warn!("relay {}: ignoring transition {} -> {}", self.label, self.phase, next);
        }
    }
}

/// Terminal state of a relay, reported once the yt-dlp process is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// yt-dlp exited with status 0
    Completed,
    /// yt-dlp exited non-zero (`None`: killed by a signal or wait failed)
    Failed { exit_code: Option<i32> },
    /// The body was dropped before EOF and the process was terminated
    Cancelled,
}

impl From<RelayOutcome> for RelayPhase {
    fn from(outcome: RelayOutcome) -> Self {
        match outcome {
            RelayOutcome::Completed => RelayPhase::Completed,
            RelayOutcome::Failed { .. } => RelayPhase::Failed,
            RelayOutcome::Cancelled => RelayPhase::Cancelled,
        }
    }
}

// ============================================================================
// Body stream
// ============================================================================

/// yt-dlp stdout as a stream of byte chunks.
///
/// Dropping it before EOF cancels the relay, which terminates the process.
pub struct RelayStream {
    inner: ReaderStream<ChildStdout>,
    cancel_on_drop: Option<DropGuard>,
    failed: bool,
}

impl RelayStream {
    fn new(stdout: ChildStdout, cancel: CancellationToken) -> Self {
        Self {
            inner: ReaderStream::new(stdout),
            cancel_on_drop: Some(cancel.drop_guard()),
            failed: false,
        }
    }
}

impl fmt::Debug for RelayStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayStream")
            .field("armed", &self.cancel_on_drop.is_some())
            .field("failed", &self.failed)
            .finish()
    }
}

impl Stream for RelayStream {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_next(cx);

        match &polled {
            Poll::Ready(Some(Err(e))) => {
                log::error!("Failed to read yt-dlp stdout: {}", e);
                this.failed = true;
            }
            Poll::Ready(None) if !this.failed => {
                // Clean EOF: the process finishes on its own, nothing to cancel.
                if let Some(guard) = this.cancel_on_drop.take() {
                    let _ = guard.disarm();
                }
            }
            _ => {}
        }

        polled
    }
}

/// A started download: filename for the headers, the body, and the outcome.
#[derive(Debug)]
pub struct AudioDownload {
    /// `<sanitized title>.m4a`
    pub filename: String,
    /// stdout of the yt-dlp process
    pub body: RelayStream,
    /// Resolves once the process has exited or been terminated
    pub outcome: oneshot::Receiver<RelayOutcome>,
}

// ============================================================================
// Relay
// ============================================================================

/// Spawns yt-dlp in stream mode and hands its stdout to the caller.
#[derive(Debug, Clone)]
pub struct AudioRelay {
    config: Arc<ExtractorConfig>,
    fetcher: MetadataFetcher,
}

impl AudioRelay {
    pub fn new(config: Arc<ExtractorConfig>) -> Self {
        let fetcher = MetadataFetcher::new(Arc::clone(&config));
        Self { config, fetcher }
    }

    /// Runs the whole lifecycle for raw user input: validation, title probe, stream.
    ///
    /// Invalid input fails before any process is spawned.
    pub async fn open(&self, candidate: &str) -> AppResult<AudioDownload> {
        let mut lifecycle = RelayLifecycle::new(candidate.trim());
        lifecycle.advance(RelayPhase::Validating);

        match ValidatedUrl::parse(candidate) {
            Ok(url) => self.stream_with(&url, lifecycle).await,
            Err(e) => {
                lifecycle.advance(RelayPhase::Failed);
                Err(e)
            }
        }
    }

    /// Title probe, then spawn `yt-dlp -f bestaudio[ext=m4a]/bestaudio -o - <url>`.
    ///
    /// # Errors
    /// * `ExtractionFailure` / `ExtractionTimeout` - the title probe failed
    /// * `ExtractionFailure` - yt-dlp could not be spawned
    pub async fn stream(&self, url: &ValidatedUrl) -> AppResult<AudioDownload> {
        let mut lifecycle = RelayLifecycle::new(url.canonical());
        lifecycle.advance(RelayPhase::Validating);
        self.stream_with(url, lifecycle).await
    }

    async fn stream_with(&self, url: &ValidatedUrl, mut lifecycle: RelayLifecycle) -> AppResult<AudioDownload> {
        lifecycle.advance(RelayPhase::TitleProbe);

        let title = match self.fetcher.probe_title(url).await {
            Ok(title) => title,
            Err(e) => {
                lifecycle.advance(RelayPhase::Failed);
                return Err(e);
            }
        };
        let filename = download_filename(&title);

        let args = build_args(&self.config, ExtractorMode::StreamAudio, url.canonical());
        log::debug!("yt-dlp command: {} {}", self.config.bin, args.join(" "));

        let spawned = Command::new(&self.config.bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                log::error!("Failed to spawn {}: {}", self.config.bin, e);
                lifecycle.advance(RelayPhase::Failed);
                return Err(AppError::ExtractionFailure(format!(
                    "failed to spawn {}: {}",
                    self.config.bin, e
                )));
            }
        };

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            lifecycle.advance(RelayPhase::Failed);
            return Err(AppError::ExtractionFailure("yt-dlp pipes were not captured".to_string()));
        };

        lifecycle.advance(RelayPhase::Streaming);
        log::info!("Streaming audio for {} as {:?}", url, filename);

        let cancel = CancellationToken::new();
        let (outcome_tx, outcome_rx) = oneshot::channel();

        tokio::spawn(log_stderr(stderr));
        tokio::spawn(supervise(
            child,
            cancel.clone(),
            self.config.terminate_grace,
            lifecycle,
            outcome_tx,
        ));

        Ok(AudioDownload {
            filename,
            body: RelayStream::new(stdout, cancel),
            outcome: outcome_rx,
        })
    }
}

/// Whether a yt-dlp stderr line is worth logging.
///
/// `[download]` progress and `WARNING` lines are routine noise.
pub fn is_reportable_stderr_line(line: &str) -> bool {
    !line.trim().is_empty() && !line.contains("[download]") && !line.contains("WARNING")
}

/// Drains stderr until EOF, logging reportable lines.
///
/// The pipe must stay open for the life of the process: yt-dlp dies on a broken
/// stderr pipe, which would cut the download short. Lines are decoded lossily so
/// non-UTF-8 output cannot stop the drain.
async fn log_stderr(stderr: ChildStderr) {
    let mut reader = BufReader::new(stderr);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end();
                if is_reportable_stderr_line(line) {
                    log::error!("yt-dlp stderr: {}", line);
                }
            }
            Err(e) => {
                log::debug!("Stopped reading yt-dlp stderr: {}", e);
                break;
            }
        }
    }
}

/// Owns the child until it is gone, then reports the outcome.
async fn supervise(
    mut child: Child,
    cancel: CancellationToken,
    grace: Duration,
    mut lifecycle: RelayLifecycle,
    outcome_tx: oneshot::Sender<RelayOutcome>,
) {
    let outcome = tokio::select! {
        biased;
        status = child.wait() => outcome_from_status(status),
        _ = cancel.cancelled() => {
            log::info!("{}, terminating yt-dlp", AppError::StreamTerminated);
            terminate(&mut child, grace).await;
            RelayOutcome::Cancelled
        }
    };

    lifecycle.advance(outcome.into());
    debug_assert!(lifecycle.phase().is_terminal());

    // Nobody listening is fine: the HTTP handler does not wait for the outcome.
    let _ = outcome_tx.send(outcome);
}

fn outcome_from_status(status: io::Result<ExitStatus>) -> RelayOutcome {
    match status {
        Ok(status) if status.success() => RelayOutcome::Completed,
        Ok(status) => {
            if let Some(code) = status.code() {
                log::error!("yt-dlp exited with code {}", code);
            }
            RelayOutcome::Failed {
                exit_code: status.code(),
            }
        }
        Err(e) => {
            log::error!("Failed to wait for yt-dlp: {}", e);
            RelayOutcome::Failed { exit_code: None }
        }
    }
}

/// SIGTERM, then SIGKILL if the process outlives `grace`. Always reaps.
async fn terminate(child: &mut Child, grace: Duration) {
    if let Err(e) = send_terminate(child) {
        log::warn!("Failed to signal yt-dlp: {}", e);
    }

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(_) => {}
        Err(_) => {
            log::warn!("yt-dlp ignored SIGTERM for {}s, killing", grace.as_secs());
            if let Err(e) = child.kill().await {
                log::error!("Failed to kill yt-dlp: {}", e);
            }
        }
    }
}

#[cfg(unix)]
fn send_terminate(child: &mut Child) -> io::Result<()> {
    // No pid means the child was already reaped.
    let Some(pid) = child.id() else {
        return Ok(());
    };
    let pid = libc::pid_t::try_from(pid).map_err(io::Error::other)?;

    // SAFETY: kill(2) takes plain integers; the pid is our own unreaped child.
    #[allow(unsafe_code)]
    let rc = unsafe { libc::kill(pid, libc::SIGTERM) };

    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn send_terminate(child: &mut Child) -> io::Result<()> {
    child.start_kill()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_edges() {
        use RelayPhase::*;
        assert!(Idle.can_advance_to(Validating));
        assert!(Validating.can_advance_to(TitleProbe));
        assert!(Validating.can_advance_to(Failed));
        assert!(TitleProbe.can_advance_to(Failed));
        assert!(Streaming.can_advance_to(Cancelled));

        assert!(!Validating.can_advance_to(Cancelled));
        assert!(!TitleProbe.can_advance_to(Cancelled));
        assert!(!Idle.can_advance_to(Streaming));
        assert!(!Completed.can_advance_to(Failed));
    }

    #[test]
    fn test_lifecycle_ignores_illegal_transition() {
        let mut lifecycle = RelayLifecycle::new("test");
        lifecycle.advance(RelayPhase::Streaming);
        assert_eq!(lifecycle.phase(), RelayPhase::Idle);

        lifecycle.advance(RelayPhase::Validating);
        lifecycle.advance(RelayPhase::TitleProbe);
        lifecycle.advance(RelayPhase::Streaming);
        lifecycle.advance(RelayPhase::Cancelled);
        assert_eq!(lifecycle.phase(), RelayPhase::Cancelled);
        assert!(lifecycle.phase().is_terminal());
    }

    #[test]
    fn test_outcome_maps_to_terminal_phase() {
        assert_eq!(RelayPhase::from(RelayOutcome::Completed), RelayPhase::Completed);
        assert_eq!(RelayPhase::from(RelayOutcome::Failed { exit_code: Some(1) }), RelayPhase::Failed);
        assert_eq!(RelayPhase::from(RelayOutcome::Cancelled), RelayPhase::Cancelled);
    }

    #[test]
    fn test_stderr_filter() {
        assert!(!is_reportable_stderr_line("[download]  42.0% of 3.50MiB at 1.2MiB/s ETA 00:02"));
        assert!(!is_reportable_stderr_line("WARNING: [youtube] Falling back to generic n function search"));
        assert!(!is_reportable_stderr_line("   "));
        assert!(is_reportable_stderr_line("ERROR: [youtube] abc: Requested format is not available"));
        assert!(is_reportable_stderr_line("[youtube] abc: Downloading webpage"));
    }

    #[tokio::test]
    async fn test_open_rejects_invalid_url_without_spawning() {
        let relay = AudioRelay::new(Arc::new(ExtractorConfig::with_bin("/definitely/not/here/yt-dlp")));

        let err = relay.open("https://vimeo.com/1").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let err = relay.open("").await.unwrap_err();
        assert_eq!(err.to_string(), "URL is required");
    }

    #[tokio::test]
    async fn test_stream_fails_when_title_probe_cannot_run() {
        let relay = AudioRelay::new(Arc::new(ExtractorConfig::with_bin("/definitely/not/here/yt-dlp")));
        let url = ValidatedUrl::parse("https://youtu.be/abc123").unwrap();

        let err = relay.stream(&url).await.unwrap_err();
        assert!(matches!(err, AppError::ExtractionFailure(_)));
    }
}
