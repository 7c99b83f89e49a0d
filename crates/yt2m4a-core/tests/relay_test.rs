//! Audio relay against a fake yt-dlp: byte fidelity, naming, cancellation

#![cfg(unix)]

mod common;

use std::time::Duration;

use common::FakeExtractor;
use futures_util::StreamExt;
use pretty_assertions::assert_eq;
use yt2m4a_core::{AppError, AudioDownload, AudioRelay, RelayOutcome};

const URL: &str = "https://www.youtube.com/watch?v=abc123&list=PL1";

async fn collect_body(download: &mut AudioDownload) -> Vec<u8> {
    let mut body = Vec::new();
    while let Some(chunk) = download.body.next().await {
        body.extend_from_slice(&chunk.unwrap());
    }
    body
}

async fn outcome(download: AudioDownload) -> RelayOutcome {
    tokio::time::timeout(Duration::from_secs(10), download.outcome)
        .await
        .expect("relay outcome not reported in time")
        .expect("supervisor dropped the outcome sender")
}

// ============================================================================
// Streaming
// ============================================================================

#[tokio::test]
async fn test_body_is_byte_identical_to_stdout() {
    let fake = FakeExtractor::builder()
        .title("echo 'Song'")
        .stream("printf 'chunk-1;'; sleep 0.1; printf 'chunk-2;'; yes abcdefgh | head -c 300000")
        .build();
    let relay = AudioRelay::new(fake.config());

    let mut download = relay.open(URL).await.unwrap();
    let body = collect_body(&mut download).await;

    let mut expected = b"chunk-1;chunk-2;".to_vec();
    expected.extend("abcdefgh\n".repeat(300_000 / 9 + 1).bytes().take(300_000));
    assert_eq!(body.len(), expected.len());
    assert!(body == expected, "relayed bytes differ from yt-dlp stdout");

    assert_eq!(outcome(download).await, RelayOutcome::Completed);
    assert_eq!(fake.calls(), vec!["title", "stream"]);
}

#[tokio::test]
async fn test_filename_comes_from_sanitized_title() {
    let fake = FakeExtractor::builder()
        .title(r#"printf 'AC/DC: "Live"?\n'"#)
        .stream("printf data")
        .build();
    let relay = AudioRelay::new(fake.config());

    let mut download = relay.open(URL).await.unwrap();
    assert_eq!(download.filename, "ACDC Live.m4a");
    assert_eq!(collect_body(&mut download).await, b"data");
}

#[tokio::test]
async fn test_empty_title_falls_back_to_audio() {
    let fake = FakeExtractor::builder()
        .title("printf ''")
        .stream("printf data")
        .build();
    let relay = AudioRelay::new(fake.config());

    let download = relay.open(URL).await.unwrap();
    assert_eq!(download.filename, "audio.m4a");
}

#[tokio::test]
async fn test_nonzero_exit_before_output_yields_empty_body() {
    let fake = FakeExtractor::builder()
        .title("echo 'Song'")
        .stream("echo 'ERROR: Requested format is not available' >&2; exit 3")
        .build();
    let relay = AudioRelay::new(fake.config());

    let mut download = relay.open(URL).await.unwrap();
    assert!(collect_body(&mut download).await.is_empty());
    assert_eq!(outcome(download).await, RelayOutcome::Failed { exit_code: Some(3) });
}

#[tokio::test]
async fn test_non_utf8_stderr_does_not_interrupt_stream() {
    let fake = FakeExtractor::builder()
        .title("echo 'Song'")
        .stream(
            r#"printf 'ERROR \377\376 bad\n' >&2
i=0
while [ $i -lt 200 ]; do
  echo "[download] $i.0% of 3.50MiB" >&2
  i=$((i + 1))
done
printf 'AUDIO-BYTES'"#,
        )
        .build();
    let relay = AudioRelay::new(fake.config());

    let mut download = relay.open(URL).await.unwrap();

    assert_eq!(collect_body(&mut download).await, b"AUDIO-BYTES");
    assert_eq!(outcome(download).await, RelayOutcome::Completed);
}

// ============================================================================
// Failures before streaming
// ============================================================================

#[tokio::test]
async fn test_invalid_url_spawns_nothing() {
    let fake = FakeExtractor::builder().build();
    let relay = AudioRelay::new(fake.config());

    let err = relay.open("https://example.com/watch?v=abc").await.unwrap_err();

    assert_eq!(err.to_string(), "Invalid YouTube URL");
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn test_title_probe_failure_aborts_before_stream() {
    let fake = FakeExtractor::builder()
        .title("echo 'ERROR: Video unavailable' >&2; exit 1")
        .stream("printf data")
        .build();
    let relay = AudioRelay::new(fake.config());

    let err = relay.open(URL).await.unwrap_err();

    assert!(matches!(err, AppError::ExtractionFailure(_)));
    assert_eq!(fake.calls(), vec!["title"]);
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn test_dropping_body_terminates_process() {
    let fake = FakeExtractor::builder()
        .title("echo 'Song'")
        .stream(r#"echo $$ > "$here/pid"; printf first; exec sleep 30"#)
        .build();
    let relay = AudioRelay::new(fake.config());

    let AudioDownload { mut body, outcome: outcome_rx, .. } = relay.open(URL).await.unwrap();
    let first = body.next().await.unwrap().unwrap();
    assert_eq!(&first[..], b"first");

    drop(body);

    let outcome = tokio::time::timeout(Duration::from_secs(10), outcome_rx)
        .await
        .expect("relay outcome not reported in time")
        .unwrap();
    assert_eq!(outcome, RelayOutcome::Cancelled);

    #[cfg(target_os = "linux")]
    {
        let pid = std::fs::read_to_string(fake.dir().join("pid")).unwrap();
        let proc_entry = std::path::Path::new("/proc").join(pid.trim());
        assert!(!proc_entry.exists(), "yt-dlp process {} still alive", pid.trim());
    }
}
