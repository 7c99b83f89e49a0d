//! Fake yt-dlp executables for integration tests.
//!
//! Each fake is a small `sh` script in its own temp dir. It picks a branch from its
//! arguments (`--dump-json`, `--print`, `-o -`), appends the branch name to
//! `calls.log` next to itself, and runs the shell snippet given for that branch.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use yt2m4a_core::ExtractorConfig;

pub struct FakeExtractor {
    dir: TempDir,
    bin: PathBuf,
}

#[derive(Default)]
pub struct FakeExtractorBuilder {
    json: Option<String>,
    title: Option<String>,
    stream: Option<String>,
}

impl FakeExtractorBuilder {
    /// Shell snippet for `--dump-json`
    pub fn json(mut self, snippet: impl Into<String>) -> Self {
        self.json = Some(snippet.into());
        self
    }

    /// Shell snippet for `--print %(title)s`
    pub fn title(mut self, snippet: impl Into<String>) -> Self {
        self.title = Some(snippet.into());
        self
    }

    /// Shell snippet for `-o -`
    pub fn stream(mut self, snippet: impl Into<String>) -> Self {
        self.stream = Some(snippet.into());
        self
    }

    pub fn build(self) -> FakeExtractor {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("yt-dlp");
        let unset = "echo 'ERROR: unexpected mode' >&2; exit 2";

        let script = format!(
            r#"#!/bin/sh
here=$(dirname "$0")
mode=""
for arg in "$@"; do
  case "$arg" in
    --dump-json) mode=json ;;
    --print) mode=title ;;
    -o) mode=stream ;;
  esac
done
echo "$mode" >> "$here/calls.log"
case "$mode" in
  json)
{json}
    ;;
  title)
{title}
    ;;
  stream)
{stream}
    ;;
esac
"#,
            json = self.json.as_deref().unwrap_or(unset),
            title = self.title.as_deref().unwrap_or(unset),
            stream = self.stream.as_deref().unwrap_or(unset),
        );

        fs::write(&bin, script).unwrap();
        fs::set_permissions(&bin, fs::Permissions::from_mode(0o755)).unwrap();

        FakeExtractor { dir, bin }
    }
}

impl FakeExtractor {
    pub fn builder() -> FakeExtractorBuilder {
        FakeExtractorBuilder::default()
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn config(&self) -> Arc<ExtractorConfig> {
        Arc::new(ExtractorConfig {
            terminate_grace: Duration::from_secs(2),
            ..ExtractorConfig::with_bin(self.bin.to_string_lossy())
        })
    }

    pub fn config_with_timeout(&self, timeout: Duration) -> Arc<ExtractorConfig> {
        Arc::new(ExtractorConfig {
            metadata_timeout: timeout,
            ..(*self.config()).clone()
        })
    }

    /// Modes the fake was invoked in, in order.
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.dir.path().join("calls.log"))
            .map(|log| log.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}
