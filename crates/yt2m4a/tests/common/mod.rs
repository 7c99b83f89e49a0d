//! Fake yt-dlp for router tests.
//!
//! The script records each invocation's mode in `calls.log` and answers the
//! metadata dump, the title probe, and the stream with canned output.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::sync::Arc;

use tempfile::TempDir;
use yt2m4a_core::ExtractorConfig;

pub struct FakeExtractor {
    dir: TempDir,
    config: Arc<ExtractorConfig>,
}

impl FakeExtractor {
    /// `json`, `title`, and `stream` are shell snippets run for the matching mode.
    pub fn new(json: &str, title: &str, stream: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("yt-dlp");

        let script = format!(
            r#"#!/bin/sh
mode=""
for arg in "$@"; do
  case "$arg" in
    --dump-json) mode=json ;;
    --print) mode=title ;;
    -o) mode=stream ;;
  esac
done
echo "$mode" >> "$(dirname "$0")/calls.log"
case "$mode" in
  json) {json} ;;
  title) {title} ;;
  stream) {stream} ;;
esac
"#
        );
        fs::write(&bin, script).unwrap();
        fs::set_permissions(&bin, fs::Permissions::from_mode(0o755)).unwrap();

        let config = Arc::new(ExtractorConfig::with_bin(bin.to_string_lossy()));
        Self { dir, config }
    }

    pub fn config(&self) -> Arc<ExtractorConfig> {
        Arc::clone(&self.config)
    }

    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.dir.path().join("calls.log"))
            .map(|log| log.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}
